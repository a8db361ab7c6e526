//! Engine configuration parameters
//!
//! All tunable parameters for the reconciliation engine.
//! Values can be loaded from JSON or a compact binary blob via
//! [`adapters::config_file`](crate::adapters::config_file).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::schedule::PhaseAnchor;
use crate::status::{Bounds, LivenessWindows, Metric, TieredRange};

/// Largest UTC offset any real zone uses (UTC+14).
const MAX_UTC_OFFSET_SECS: i32 = 14 * 3600;

/// Core engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    // --- Liveness ---
    /// Online / delayed age thresholds
    pub liveness: LivenessWindows,

    // --- Severity ---
    /// Tiered thresholds per metric; metrics without an entry fail open
    pub thresholds: ThresholdTable,

    // --- Schedules ---
    /// Where duty-cycle phase is anchored
    pub duty_cycle_anchor: PhaseAnchor,
    /// Fixed offset (seconds east of UTC) used to derive local time of day
    pub utc_offset_secs: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            liveness: LivenessWindows::default(),
            thresholds: ThresholdTable::default(),
            duty_cycle_anchor: PhaseAnchor::UnixEpoch,
            utc_offset_secs: 0,
        }
    }
}

impl EngineConfig {
    /// Reject anything that would make the evaluators lie.  Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.liveness.validate()?;
        self.thresholds.validate()?;
        if self.utc_offset_secs.abs() > MAX_UTC_OFFSET_SECS {
            return Err(ConfigError::ValidationFailed(
                "utc_offset_secs must lie within +/-14h",
            ));
        }
        Ok(())
    }
}

/// Per-metric tiered ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable(BTreeMap<Metric, TieredRange>);

impl ThresholdTable {
    /// A table with no thresholds: everything classifies as normal.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, metric: Metric) -> Option<&TieredRange> {
        self.0.get(&metric)
    }

    pub fn insert(&mut self, metric: Metric, range: TieredRange) -> Option<TieredRange> {
        self.0.insert(metric, range)
    }

    pub fn remove(&mut self, metric: Metric) -> Option<TieredRange> {
        self.0.remove(&metric)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (metric, range) in &self.0 {
            range.validate(metric.name())?;
        }
        Ok(())
    }
}

impl Default for ThresholdTable {
    /// The ranges the unit and room cards ship with.
    fn default() -> Self {
        let tier = |wmin, wmax, cmin, cmax| TieredRange {
            warning: Bounds::new(wmin, wmax),
            critical: Bounds::new(cmin, cmax),
        };
        let mut t = BTreeMap::new();
        // Reservoir
        t.insert(Metric::Ph, tier(5.8, 7.2, 5.0, 8.0));
        t.insert(Metric::Tds, tier(700.0, 1300.0, 500.0, 1500.0));
        t.insert(Metric::Turbidity, tier(0.0, 15.0, 0.0, 25.0));
        t.insert(Metric::WaterTemp, tier(18.0, 26.0, 15.0, 30.0));
        t.insert(Metric::WaterLevel, tier(30.0, 100.0, 20.0, 100.0));
        // Climate probes
        t.insert(Metric::AirTemp, tier(20.0, 28.0, 15.0, 35.0));
        t.insert(Metric::Humidity, tier(50.0, 80.0, 30.0, 90.0));
        // Room
        t.insert(Metric::Pressure, tier(990.0, 1030.0, 980.0, 1040.0));
        t.insert(Metric::Iaq, tier(0.0, 200.0, 0.0, 300.0));
        t.insert(Metric::Co2, tier(300.0, 1200.0, 250.0, 1500.0));
        Self(t)
    }
}
