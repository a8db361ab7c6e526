//! Device reporting freshness.
//!
//! A device is judged only by how long ago it last reported:
//!
//! ```text
//!  age ≤ fresh_secs            → Online
//!  fresh_secs < age ≤ stale    → Delayed
//!  age > stale_secs / never    → Offline
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessState {
    Online,
    Delayed,
    Offline,
}

impl LivenessState {
    /// Badge text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Delayed => "Delayed",
            Self::Offline => "Offline",
        }
    }
}

impl fmt::Display for LivenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The two age thresholds, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessWindows {
    /// Maximum age still considered online.
    pub fresh_secs: u64,
    /// Maximum age still considered delayed.
    pub stale_secs: u64,
}

impl Default for LivenessWindows {
    fn default() -> Self {
        Self {
            fresh_secs: 300, // 5 min
            stale_secs: 900, // 15 min
        }
    }
}

impl LivenessWindows {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fresh_secs > self.stale_secs {
            return Err(ConfigError::InvalidLivenessWindows {
                fresh_secs: self.fresh_secs,
                stale_secs: self.stale_secs,
            });
        }
        Ok(())
    }

    /// Classify a last-seen epoch second against `now`.
    ///
    /// Reports stamped in the future (clock skew) count as age zero.
    pub fn classify(&self, last_seen: Option<i64>, now: i64) -> LivenessState {
        let Some(last_seen) = last_seen else {
            return LivenessState::Offline;
        };
        let age = now.saturating_sub(last_seen).max(0) as u64;
        if age <= self.fresh_secs {
            LivenessState::Online
        } else if age <= self.stale_secs {
            LivenessState::Delayed
        } else {
            LivenessState::Offline
        }
    }

    /// Badge text; "No data" when the device has never reported.
    pub fn badge_text(&self, last_seen: Option<i64>, now: i64) -> &'static str {
        match last_seen {
            None => "No data",
            Some(_) => self.classify(last_seen, now).label(),
        }
    }
}

/// Classify with the default 300 s / 900 s windows.
pub fn classify(last_seen: Option<i64>, now: i64) -> LivenessState {
    LivenessWindows::default().classify(last_seen, now)
}

/// Human "last seen" text.
pub fn format_last_seen(last_seen: Option<i64>, now: i64) -> String {
    let Some(last_seen) = last_seen else {
        return "Never".to_string();
    };
    let mins = now.saturating_sub(last_seen).max(0) / 60;
    let hours = mins / 60;
    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{mins}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else {
        format!("{}d ago", hours / 24)
    }
}
