//! Status derivation: threshold severity, reporting liveness, and the
//! per-unit roll-up that views render.
//!
//! Everything here is a pure function of caller-supplied values.  No
//! locking, no clock reads, safe to call from any thread.

pub mod liveness;
pub mod severity;
pub mod unit;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use liveness::{LivenessState, LivenessWindows};
pub use severity::{Bounds, Severity, TieredRange};

/// Every metric the dashboard colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    // Reservoir
    Ph,
    Tds,
    Turbidity,
    WaterTemp,
    WaterLevel,
    // Per-level climate probes
    AirTemp,
    Humidity,
    // Room sensors
    Pressure,
    Iaq,
    Co2,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::Ph,
        Metric::Tds,
        Metric::Turbidity,
        Metric::WaterTemp,
        Metric::WaterLevel,
        Metric::AirTemp,
        Metric::Humidity,
        Metric::Pressure,
        Metric::Iaq,
        Metric::Co2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ph => "ph",
            Self::Tds => "tds",
            Self::Turbidity => "turbidity",
            Self::WaterTemp => "water_temp",
            Self::WaterLevel => "water_level",
            Self::AirTemp => "air_temp",
            Self::Humidity => "humidity",
            Self::Pressure => "pressure",
            Self::Iaq => "iaq",
            Self::Co2 => "co2",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a view colours a value with.
///
/// [`Severity`] plus `Unknown` for readings that are absent or not a
/// number.  `Unknown` is deliberately not part of `Severity`: it never
/// takes part in worst-of aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusView {
    Normal,
    Warning,
    Critical,
    Unknown,
}

impl StatusView {
    /// The underlying severity, if the reading was usable.
    pub fn severity(self) -> Option<Severity> {
        match self {
            Self::Normal => Some(Severity::Normal),
            Self::Warning => Some(Severity::Warning),
            Self::Critical => Some(Severity::Critical),
            Self::Unknown => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

impl From<Severity> for StatusView {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Normal => Self::Normal,
            Severity::Warning => Self::Warning,
            Severity::Critical => Self::Critical,
        }
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
