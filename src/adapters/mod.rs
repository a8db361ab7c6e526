//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                 |
//! |----------------|--------------|-----------------------------|
//! | `config_file`  | ConfigPort   | JSON / postcard file        |
//! | `log_sink`     | EventSink    | `log` facade                |
//! | `time`         | Clock        | System wall clock           |

pub mod config_file;
pub mod log_sink;
pub mod time;
