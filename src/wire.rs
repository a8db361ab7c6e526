//! JSON records exchanged with the REST/storage collaborators.
//!
//! Shapes follow the backend exactly:
//!
//! ```text
//!  schedule  {"lights": {"on": "08:00", "off": "20:00"},
//!             "fans":   {"on": "06:00", "off": "22:00"},
//!             "pump_cycle": {"on_duration_sec": 300, "interval_sec": 3600},
//!             "_control_mode": "timer"}
//!  relays    {"unit_id": "HU-01", "timestamp": 1700000000,
//!             "relays": {"lights": "ON", "fans": "OFF", "pump": "OFF"}}
//!  sensors   {"unit_id": "HU-01", "timestamp": 1700000000,
//!             "reservoir": {"ph": 6.2, "tds": 950, ...},
//!             "climate": {"L11": {"temp": 24.1, "humidity": 70}, ...}}
//!  room      {"unit_id": "ROOM_BACK", "timestamp": ..., "bme": {...},
//!             "co2": 780, "ac": {"current_set_temp": 24, "mode": "COOL"}}
//!  ac        {"ac_schedule": {"00": 24, "01": 24, ...}}
//! ```
//!
//! Sensor values that are missing, `null` or not numbers decode as `None`,
//! and the same goes for timestamps and whole blocks, so a single dead
//! probe never fails the whole snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::control::{ActuatorId, ControlMode};
use crate::error::{ConfigError, Result, WireError};
use crate::hub::UnitId;
use crate::schedule::{DutyCycle, HourlySetpoints, PhaseAnchor, ScheduleSpec, TimeWindow};

// ═══════════════════════════════════════════════════════════════
//  Schedule record
// ═══════════════════════════════════════════════════════════════

/// A unit's stored schedule plus the unit-level control mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lights: Option<ScheduleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fans: Option<ScheduleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump_cycle: Option<ScheduleSpec>,
    #[serde(rename = "_control_mode", default)]
    pub control_mode: ControlMode,
}

impl ScheduleRecord {
    pub fn get(&self, actuator: ActuatorId) -> Option<&ScheduleSpec> {
        match actuator {
            ActuatorId::Lights => self.lights.as_ref(),
            ActuatorId::Fans => self.fans.as_ref(),
            ActuatorId::Pump => self.pump_cycle.as_ref(),
        }
    }

    pub fn set(&mut self, actuator: ActuatorId, spec: Option<ScheduleSpec>) {
        let slot = match actuator {
            ActuatorId::Lights => &mut self.lights,
            ActuatorId::Fans => &mut self.fans,
            ActuatorId::Pump => &mut self.pump_cycle,
        };
        *slot = spec;
    }

    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        ActuatorId::ALL
            .iter()
            .filter_map(|a| self.get(*a))
            .try_for_each(ScheduleSpec::validate)
    }

    /// Pin every duty cycle that does not name its anchor.
    pub fn with_default_anchor(mut self, anchor: PhaseAnchor) -> Self {
        for actuator in ActuatorId::ALL {
            let spec = self.get(actuator).map(|s| s.with_default_anchor(anchor));
            self.set(actuator, spec);
        }
        self
    }
}

/// A schedule record as sent, with duty-cycle numbers not yet range
/// checked.  Keeps a negative or oversized count a config error rather
/// than a shape mismatch.
#[derive(Deserialize)]
struct WireScheduleRecord {
    #[serde(default)]
    lights: Option<WireSpec>,
    #[serde(default)]
    fans: Option<WireSpec>,
    #[serde(default)]
    pump_cycle: Option<WireSpec>,
    #[serde(rename = "_control_mode", default)]
    control_mode: ControlMode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireSpec {
    Window(TimeWindow),
    Cycle(WireDutyCycle),
}

#[derive(Deserialize)]
struct WireDutyCycle {
    on_duration_sec: i64,
    interval_sec: i64,
    #[serde(default)]
    phase_anchor: Option<PhaseAnchor>,
}

fn seconds(field: &'static str, value: i64) -> core::result::Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::OutOfRange { field, value })
}

impl TryFrom<WireSpec> for ScheduleSpec {
    type Error = ConfigError;

    fn try_from(spec: WireSpec) -> core::result::Result<Self, ConfigError> {
        let raw = match spec {
            WireSpec::Window(w) => return Ok(Self::TimeWindow(w)),
            WireSpec::Cycle(raw) => raw,
        };
        let cycle = DutyCycle {
            on_duration_secs: seconds("on_duration_sec", raw.on_duration_sec)?,
            interval_secs: seconds("interval_sec", raw.interval_sec)?,
            phase_anchor: raw.phase_anchor,
        };
        cycle.validate()?;
        Ok(Self::DutyCycle(cycle))
    }
}

impl TryFrom<WireScheduleRecord> for ScheduleRecord {
    type Error = ConfigError;

    fn try_from(raw: WireScheduleRecord) -> core::result::Result<Self, ConfigError> {
        Ok(Self {
            lights: raw.lights.map(ScheduleSpec::try_from).transpose()?,
            fans: raw.fans.map(ScheduleSpec::try_from).transpose()?,
            pump_cycle: raw.pump_cycle.map(ScheduleSpec::try_from).transpose()?,
            control_mode: raw.control_mode,
        })
    }
}

/// Parse and validate a schedule record.
///
/// JSON that does not look like a record is [`WireError::Malformed`];
/// a record-shaped body with bad numbers is a [`ConfigError`].
pub fn decode_schedule_record(json: &str) -> Result<ScheduleRecord> {
    let raw: WireScheduleRecord = serde_json::from_str(json)?;
    Ok(ScheduleRecord::try_from(raw)?)
}

pub fn encode_schedule_record(record: &ScheduleRecord) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

// ═══════════════════════════════════════════════════════════════
//  Relays
// ═══════════════════════════════════════════════════════════════

/// Relay values travel as `"ON"` / `"OFF"`; plain booleans are accepted too.
mod on_off {
    use super::{Deserialize, Deserializer, Serializer, WireError};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    pub(super) fn parse(raw: &str) -> Result<bool, WireError> {
        if raw.eq_ignore_ascii_case("on") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("off") {
            Ok(false)
        } else {
            Err(WireError::InvalidRelayValue(raw.to_string()))
        }
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "ON" } else { "OFF" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(b),
            Raw::Text(s) => parse(&s).map_err(serde::de::Error::custom),
        }
    }

    pub mod option {
        use super::{Deserialize, Deserializer, Raw, Serializer, parse};

        pub fn serialize<S: Serializer>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
            match Option::<Raw>::deserialize(deserializer)? {
                None => Ok(None),
                Some(Raw::Bool(b)) => Ok(Some(b)),
                Some(Raw::Text(s)) => parse(&s).map(Some).map_err(serde::de::Error::custom),
            }
        }
    }
}

/// Physical relay positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStates {
    #[serde(with = "on_off", default)]
    pub lights: bool,
    #[serde(with = "on_off", default)]
    pub fans: bool,
    #[serde(with = "on_off", default)]
    pub pump: bool,
}

impl RelayStates {
    pub fn get(&self, actuator: ActuatorId) -> bool {
        match actuator {
            ActuatorId::Lights => self.lights,
            ActuatorId::Fans => self.fans,
            ActuatorId::Pump => self.pump,
        }
    }

    pub fn set(&mut self, actuator: ActuatorId, on: bool) {
        match actuator {
            ActuatorId::Lights => self.lights = on,
            ActuatorId::Fans => self.fans = on,
            ActuatorId::Pump => self.pump = on,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    pub relays: RelayStates,
}

/// Body of a relay command: only the named relays change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPatch {
    #[serde(with = "on_off::option", default, skip_serializing_if = "Option::is_none")]
    pub lights: Option<bool>,
    #[serde(with = "on_off::option", default, skip_serializing_if = "Option::is_none")]
    pub fans: Option<bool>,
    #[serde(with = "on_off::option", default, skip_serializing_if = "Option::is_none")]
    pub pump: Option<bool>,
}

impl RelayPatch {
    /// The commanded relays, in [`ActuatorId::ALL`] order.
    pub fn commands(&self) -> impl Iterator<Item = (ActuatorId, bool)> + '_ {
        ActuatorId::ALL.into_iter().filter_map(move |a| {
            let v = match a {
                ActuatorId::Lights => self.lights,
                ActuatorId::Fans => self.fans,
                ActuatorId::Pump => self.pump,
            };
            v.map(|on| (a, on))
        })
    }
}

pub fn decode_relay_snapshot(json: &str) -> Result<RelaySnapshot> {
    Ok(serde_json::from_str(json)?)
}

pub fn decode_relay_patch(json: &str) -> Result<RelayPatch> {
    Ok(serde_json::from_str(json)?)
}

// ═══════════════════════════════════════════════════════════════
//  Sensor snapshots
// ═══════════════════════════════════════════════════════════════

/// Decoders that turn junk into "no reading" instead of an error.
mod lenient {
    use std::collections::BTreeMap;

    use serde::de::IgnoredAny;

    use super::{ClimateReading, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Value(T),
        Other(IgnoredAny),
    }

    /// `None` for anything that is not a finite number.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Raw::<f64>::deserialize(deserializer)? {
            Raw::Value(v) if v.is_finite() => Some(v),
            _ => None,
        })
    }

    /// `None` for `null` or for anything that does not fit `T`.
    pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(match Raw::<T>::deserialize(deserializer)? {
            Raw::Value(v) => Some(v),
            Raw::Other(_) => None,
        })
    }

    /// A `null` or non-object block reads as no locations; a `null` or
    /// non-object entry keeps its location with no readings.
    pub fn climate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, ClimateReading>, D::Error> {
        Ok(match Raw::<BTreeMap<String, Raw<ClimateReading>>>::deserialize(deserializer)? {
            Raw::Value(entries) => entries
                .into_iter()
                .map(|(location, entry)| match entry {
                    Raw::Value(reading) => (location, reading),
                    Raw::Other(_) => (location, ClimateReading::default()),
                })
                .collect(),
            Raw::Other(_) => BTreeMap::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservoirReading {
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub ph: Option<f64>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub tds: Option<f64>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub turbidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub water_temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub water_level: Option<f64>,
}

/// One climate probe (DHT22), keyed by location such as `L11`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateReading {
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub humidity: Option<f64>,
}

/// Latest readings for a hydroponic unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    /// Epoch second of the reading; `None` if the unit never reported.
    #[serde(default, deserialize_with = "lenient::optional")]
    pub timestamp: Option<i64>,
    /// `None` when the backend has no reservoir block at all.
    #[serde(default, deserialize_with = "lenient::optional")]
    pub reservoir: Option<ReservoirReading>,
    #[serde(default, deserialize_with = "lenient::climate")]
    pub climate: BTreeMap<String, ClimateReading>,
}

/// BME680 environmental block on a room node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BmeReading {
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub pressure: Option<f64>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub iaq: Option<f64>,
}

/// Room air-conditioner state as last reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcState {
    #[serde(default, deserialize_with = "lenient::optional")]
    pub current_set_temp: Option<i32>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub mode: Option<String>,
}

/// Latest readings for a room node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub bme: Option<BmeReading>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub co2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub ac: Option<AcState>,
}

pub fn decode_sensor_snapshot(json: &str) -> Result<SensorSnapshot> {
    Ok(serde_json::from_str(json)?)
}

pub fn decode_room_snapshot(json: &str) -> Result<RoomSnapshot> {
    Ok(serde_json::from_str(json)?)
}

// ═══════════════════════════════════════════════════════════════
//  AC schedule
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcScheduleRecord {
    pub ac_schedule: HourlySetpoints,
}

pub fn decode_ac_schedule(json: &str) -> Result<AcScheduleRecord> {
    Ok(serde_json::from_str(json)?)
}
