//! Wall-clock adapter.
//!
//! Implements [`Clock`] over `std::time::SystemTime`, viewed at a fixed
//! UTC offset.  A clock set before 1970 reads as the epoch itself.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::Clock;
use crate::config::EngineConfig;
use crate::schedule::LocalInstant;

/// System wall clock at a fixed local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    utc_offset_secs: i32,
}

impl SystemClock {
    pub fn new(utc_offset_secs: i32) -> Self {
        Self { utc_offset_secs }
    }

    /// Clock at the offset the engine is configured for.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.utc_offset_secs)
    }

    /// Seconds since the Unix epoch.
    pub fn epoch_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> LocalInstant {
        LocalInstant::new(self.epoch_secs(), self.utc_offset_secs)
    }
}
