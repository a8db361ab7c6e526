//! Per-unit status roll-up.
//!
//! Turns a raw snapshot into one [`StatusView`] per metric plus an overall
//! status.  Overall is the worst *known* severity; readings that are
//! missing are listed separately instead of dragging the unit to
//! "unknown" (or, worse, to "normal").

use core::fmt;

use serde::{Deserialize, Serialize};

use super::severity::{classify_reading, worst};
use super::{Metric, StatusView};
use crate::config::ThresholdTable;
use crate::wire::{RoomSnapshot, SensorSnapshot};

/// A metric, optionally at a named probe location (`air_temp@L11`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    pub metric: Metric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl MetricKey {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            location: None,
        }
    }

    pub fn at(metric: Metric, location: impl Into<String>) -> Self {
        Self {
            metric,
            location: Some(location.into()),
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}@{loc}", self.metric),
            None => write!(f, "{}", self.metric),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatus {
    pub key: MetricKey,
    pub value: Option<f64>,
    pub status: StatusView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStatus {
    /// Every metric the snapshot should carry, in a stable order.
    pub metrics: Vec<MetricStatus>,
    /// Worst known severity; `Unknown` only when nothing is known.
    pub overall: StatusView,
    /// Metrics with no usable reading.
    pub missing: Vec<MetricKey>,
}

impl UnitStatus {
    fn from_readings(readings: Vec<(MetricKey, Option<f64>)>, table: &ThresholdTable) -> Self {
        let metrics: Vec<MetricStatus> = readings
            .into_iter()
            .map(|(key, value)| {
                let status = classify_reading(value, table.get(key.metric));
                MetricStatus { key, value, status }
            })
            .collect();
        let overall = worst(metrics.iter().filter_map(|m| m.status.severity()))
            .map_or(StatusView::Unknown, StatusView::from);
        let missing = metrics
            .iter()
            .filter(|m| m.status == StatusView::Unknown)
            .map(|m| m.key.clone())
            .collect();
        Self {
            metrics,
            overall,
            missing,
        }
    }

    pub fn status_of(&self, key: &MetricKey) -> Option<StatusView> {
        self.metrics.iter().find(|m| &m.key == key).map(|m| m.status)
    }
}

/// Classify every reservoir and climate metric of a hydroponic unit.
pub fn evaluate_unit(snapshot: &SensorSnapshot, table: &ThresholdTable) -> UnitStatus {
    let r = snapshot.reservoir.unwrap_or_default();
    let mut readings = vec![
        (MetricKey::new(Metric::Ph), r.ph),
        (MetricKey::new(Metric::Tds), r.tds),
        (MetricKey::new(Metric::Turbidity), r.turbidity),
        (MetricKey::new(Metric::WaterTemp), r.water_temp),
        (MetricKey::new(Metric::WaterLevel), r.water_level),
    ];
    for (location, probe) in &snapshot.climate {
        readings.push((MetricKey::at(Metric::AirTemp, location), probe.temp));
        readings.push((MetricKey::at(Metric::Humidity, location), probe.humidity));
    }
    UnitStatus::from_readings(readings, table)
}

/// Classify a room node's BME and CO2 readings.
pub fn evaluate_room(snapshot: &RoomSnapshot, table: &ThresholdTable) -> UnitStatus {
    let bme = snapshot.bme.unwrap_or_default();
    let readings = vec![
        (MetricKey::new(Metric::AirTemp), bme.temp),
        (MetricKey::new(Metric::Humidity), bme.humidity),
        (MetricKey::new(Metric::Pressure), bme.pressure),
        (MetricKey::new(Metric::Iaq), bme.iaq),
        (MetricKey::new(Metric::Co2), snapshot.co2),
    ];
    UnitStatus::from_readings(readings, table)
}

/// The single badge on a unit's dashboard card: worst of pH, TDS and
/// water level.  `Unknown` without a reservoir block.
pub fn summary_status(snapshot: &SensorSnapshot, table: &ThresholdTable) -> StatusView {
    let Some(r) = snapshot.reservoir else {
        return StatusView::Unknown;
    };
    let readings = vec![
        (MetricKey::new(Metric::Ph), r.ph),
        (MetricKey::new(Metric::Tds), r.tds),
        (MetricKey::new(Metric::WaterLevel), r.water_level),
    ];
    UnitStatus::from_readings(readings, table).overall
}
