//! Unified error types for the reconciliation engine.
//!
//! Only genuinely invalid configuration travels upward as an `Err`.
//! Missing or non-numeric sensor data is resolved locally to
//! [`StatusView::Unknown`](crate::status::StatusView::Unknown) and never
//! shows up here, so one dead probe cannot take down a whole view.

use core::fmt;

use crate::hub::ClientId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A schedule, threshold table or engine setting is malformed.
    Config(ConfigError),
    /// The realtime hub refused an operation.
    Hub(HubError),
    /// An external record could not be decoded.
    Wire(WireError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Hub(e) => write!(f, "hub: {e}"),
            Self::Wire(e) => write!(f, "wire: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Malformed configuration.  Always surfaced to the caller, never clamped:
/// a silently clamped duty cycle would run a pump longer than configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Duty-cycle interval of zero seconds.
    ZeroInterval,
    /// Duty-cycle on-duration longer than its interval.
    DurationExceedsInterval {
        on_duration_secs: u32,
        interval_secs: u32,
    },
    /// A duty-cycle second count that is negative or does not fit `u32`.
    OutOfRange { field: &'static str, value: i64 },
    /// A time-of-day string that is not `HH:MM` / `HH:MM:SS` within a day.
    InvalidTimeOfDay(String),
    /// A tiered range violating `critical.min <= warning.min <= warning.max <= critical.max`.
    InvalidRange(&'static str),
    /// Liveness freshness window longer than the staleness window.
    InvalidLivenessWindows { fresh_secs: u64, stale_secs: u64 },
    /// Any other field failed range validation.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroInterval => write!(f, "duty-cycle interval must be > 0"),
            Self::DurationExceedsInterval {
                on_duration_secs,
                interval_secs,
            } => write!(
                f,
                "on-duration {on_duration_secs}s exceeds interval {interval_secs}s"
            ),
            Self::OutOfRange { field, value } => write!(f, "{field} {value} is out of range"),
            Self::InvalidTimeOfDay(raw) => write!(f, "invalid time of day {raw:?}"),
            Self::InvalidRange(metric) => write!(f, "inverted threshold range for {metric}"),
            Self::InvalidLivenessWindows {
                fresh_secs,
                stale_secs,
            } => write!(
                f,
                "freshness window {fresh_secs}s exceeds staleness window {stale_secs}s"
            ),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Hub errors
// ---------------------------------------------------------------------------

/// Subscription-side failures.  Publishing never returns these; the hub
/// logs and drops instead so one bad subscriber cannot stall the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// `join`/`leave` for a client that never connected (or already left).
    NotConnected(ClientId),
    /// The hub has been torn down.
    ShutDown,
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected(id) => write!(f, "client {id} is not connected"),
            Self::ShutDown => write!(f, "hub is shut down"),
        }
    }
}

impl std::error::Error for HubError {}

impl From<HubError> for Error {
    fn from(e: HubError) -> Self {
        Self::Hub(e)
    }
}

// ---------------------------------------------------------------------------
// Wire errors
// ---------------------------------------------------------------------------

/// A record from an external collaborator that does not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Not valid JSON, or not the expected shape.
    Malformed(String),
    /// A relay value other than a bool or `"ON"`/`"OFF"`.
    InvalidRelayValue(String),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed record: {msg}"),
            Self::InvalidRelayValue(raw) => write!(f, "invalid relay value {raw:?}"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Wire(WireError::Malformed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
