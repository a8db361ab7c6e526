//! Hydrocore: device-status and control-mode reconciliation for a
//! multi-unit hydroponics installation.
//!
//! Pure computation over values supplied by collaborators: threshold
//! severity, reporting liveness, schedule evaluation, timer/manual
//! arbitration, plus a realtime hub that scopes change notifications to
//! the units each client joined.  No network or disk I/O happens outside
//! [`adapters`].

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod hub;
pub mod schedule;
pub mod status;
pub mod wire;

pub mod adapters;

pub use error::{ConfigError, Error, HubError, Result, WireError};
