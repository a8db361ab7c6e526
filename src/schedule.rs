//! Schedule evaluation.
//!
//! Answers one question: does an actuator's configured schedule say
//! "on" at a given instant?  Two schedule shapes exist:
//!
//! ```text
//!  TimeWindow  on 08:00 ─ off 20:00          (lights, fans)
//!  00:00      08:00                  20:00       24:00
//!    │  off    ├────────── on ─────────┤   off    │
//!
//!  TimeWindow  on 22:00 ─ off 06:00          (wraps past midnight)
//!    │ on ├──── off ─────────────────────┤   on   │
//!
//!  DutyCycle   on 300s every 3600s       (pump)
//!    ├─on─┤──────── off ────────├─on─┤──────── off ────────
//!    ↑ phase anchor            ↑ anchor + interval
//! ```
//!
//! Everything is a pure function of `(spec, now)`.  The duty-cycle phase
//! anchor is explicit ([`PhaseAnchor`]) so anyone holding the same record
//! can reproduce the pulse train exactly.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

pub const SECS_PER_DAY: u32 = 86_400;

// ═══════════════════════════════════════════════════════════════
//  Time values
// ═══════════════════════════════════════════════════════════════

/// Seconds since local midnight, `0..86_400`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);

    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Result<Self, ConfigError> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(ConfigError::InvalidTimeOfDay(format!(
                "{hour:02}:{minute:02}:{second:02}"
            )));
        }
        Ok(Self(hour * 3600 + minute * 60 + second))
    }

    /// Build from a raw second count; anything past 23:59:59 is rejected.
    pub fn from_secs(secs: u32) -> Result<Self, ConfigError> {
        if secs >= SECS_PER_DAY {
            return Err(ConfigError::InvalidTimeOfDay(format!("{secs}s")));
        }
        Ok(Self(secs))
    }

    pub fn secs_since_midnight(self) -> u32 {
        self.0
    }

    pub fn hour(self) -> u8 {
        (self.0 / 3600) as u8
    }
}

impl FromStr for TimeOfDay {
    type Err = ConfigError;

    /// Accepts `HH:MM` and `HH:MM:SS`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidTimeOfDay(raw.to_string());
        let mut parts = raw.trim().split(':');
        let mut field = |required: bool| -> Result<u32, ConfigError> {
            match parts.next() {
                Some(p) if !p.is_empty() && p.len() <= 2 && p.bytes().all(|b| b.is_ascii_digit()) => {
                    p.parse().map_err(|_| invalid())
                }
                None if !required => Ok(0),
                _ => Err(invalid()),
            }
        };
        let hour = field(true)?;
        let minute = field(true)?;
        let second = field(false)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Self::from_hms(hour, minute, second).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    /// `HH:MM`, or `HH:MM:SS` when seconds are non-zero.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = (self.0 / 3600, (self.0 / 60) % 60, self.0 % 60);
        if s == 0 {
            write!(f, "{h:02}:{m:02}")
        } else {
            write!(f, "{h:02}:{m:02}:{s:02}")
        }
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An absolute instant plus the fixed local offset it is viewed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalInstant {
    /// Seconds since the Unix epoch.
    pub epoch_secs: i64,
    /// Seconds east of UTC.
    pub utc_offset_secs: i32,
}

impl LocalInstant {
    pub const fn new(epoch_secs: i64, utc_offset_secs: i32) -> Self {
        Self {
            epoch_secs,
            utc_offset_secs,
        }
    }

    pub const fn utc(epoch_secs: i64) -> Self {
        Self::new(epoch_secs, 0)
    }

    pub fn time_of_day(self) -> TimeOfDay {
        let local = self.epoch_secs.saturating_add(i64::from(self.utc_offset_secs));
        TimeOfDay(local.rem_euclid(i64::from(SECS_PER_DAY)) as u32)
    }

    /// Epoch second of the most recent local midnight.
    pub fn start_of_local_day(self) -> i64 {
        self.epoch_secs
            .saturating_sub(i64::from(self.time_of_day().secs_since_midnight()))
    }

    /// Same offset, shifted by `secs`.
    pub fn plus_secs(self, secs: i64) -> Self {
        Self::new(self.epoch_secs.saturating_add(secs), self.utc_offset_secs)
    }

    /// Same instant, viewed at another offset.
    pub const fn at_offset(self, utc_offset_secs: i32) -> Self {
        Self::new(self.epoch_secs, utc_offset_secs)
    }

    pub fn at_epoch(self, epoch_secs: i64) -> Self {
        Self::new(epoch_secs, self.utc_offset_secs)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// Where duty-cycle phase zero sits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseAnchor {
    /// Phase = `epoch_secs mod interval`.  Independent of time zone and of
    /// when any process started.
    #[default]
    UnixEpoch,
    /// Phase restarts at every local midnight.
    LocalMidnight,
}

/// A daily on/off window.
///
/// `on < off` is a same-day window `[on, off)`.  `on >= off` wraps past
/// midnight; `on == off` is therefore "always on".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub on: TimeOfDay,
    pub off: TimeOfDay,
}

impl TimeWindow {
    pub fn new(on: TimeOfDay, off: TimeOfDay) -> Self {
        Self { on, off }
    }

    /// Whether `t` falls inside the window.  Inclusive at `on`, exclusive
    /// at `off`.
    pub fn contains(&self, t: TimeOfDay) -> bool {
        if self.on < self.off {
            // e.g. 08:00..20:00
            t >= self.on && t < self.off
        } else {
            // e.g. 22:00..06:00 (overnight, wraps around midnight)
            t >= self.on || t < self.off
        }
    }
}

/// A periodic pulse: on for `on_duration_secs` at the start of every
/// `interval_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DutyCycle {
    #[serde(rename = "on_duration_sec")]
    pub on_duration_secs: u32,
    #[serde(rename = "interval_sec")]
    pub interval_secs: u32,
    /// `None` when the record did not say; evaluates as
    /// [`PhaseAnchor::UnixEpoch`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_anchor: Option<PhaseAnchor>,
}

impl DutyCycle {
    pub fn new(on_duration_secs: u32, interval_secs: u32) -> Self {
        Self {
            on_duration_secs,
            interval_secs,
            phase_anchor: None,
        }
    }

    pub fn anchored(mut self, anchor: PhaseAnchor) -> Self {
        self.phase_anchor = Some(anchor);
        self
    }

    pub fn anchor(&self) -> PhaseAnchor {
        self.phase_anchor.unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.on_duration_secs > self.interval_secs {
            return Err(ConfigError::DurationExceedsInterval {
                on_duration_secs: self.on_duration_secs,
                interval_secs: self.interval_secs,
            });
        }
        Ok(())
    }

    /// Seconds into the current cycle.  Caller has validated.
    fn elapsed(&self, now: LocalInstant) -> u32 {
        let origin = match self.anchor() {
            PhaseAnchor::UnixEpoch => 0,
            PhaseAnchor::LocalMidnight => now.start_of_local_day(),
        };
        now.epoch_secs
            .saturating_sub(origin)
            .rem_euclid(i64::from(self.interval_secs)) as u32
    }

    /// On for the whole cycle, or never on at all.
    fn never_flips(&self) -> bool {
        if self.on_duration_secs == 0 || self.on_duration_secs == self.interval_secs {
            return true;
        }
        // A midnight reset arrives before the on-phase can ever end.
        self.anchor() == PhaseAnchor::LocalMidnight && self.on_duration_secs >= SECS_PER_DAY
    }
}

/// The schedule attached to one actuator.
///
/// Encoded untagged, so the wire shape alone selects the variant:
/// `{"on": "08:00", "off": "20:00"}` or
/// `{"on_duration_sec": 300, "interval_sec": 3600}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleSpec {
    TimeWindow(TimeWindow),
    DutyCycle(DutyCycle),
}

impl ScheduleSpec {
    pub fn window(on: TimeOfDay, off: TimeOfDay) -> Self {
        Self::TimeWindow(TimeWindow::new(on, off))
    }

    pub fn duty_cycle(on_duration_secs: u32, interval_secs: u32) -> Self {
        Self::DutyCycle(DutyCycle::new(on_duration_secs, interval_secs))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::TimeWindow(_) => Ok(()),
            Self::DutyCycle(c) => c.validate(),
        }
    }

    /// Fill an unspecified duty-cycle anchor; explicit anchors are kept.
    pub fn with_default_anchor(self, anchor: PhaseAnchor) -> Self {
        match self {
            Self::DutyCycle(mut c) if c.phase_anchor.is_none() => {
                c.phase_anchor = Some(anchor);
                Self::DutyCycle(c)
            }
            other => other,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Evaluation
// ═══════════════════════════════════════════════════════════════

/// Whether `spec` says "on" at `now`.
///
/// Fails only on a malformed duty cycle (zero interval, or duration
/// longer than interval).
pub fn is_on(spec: &ScheduleSpec, now: LocalInstant) -> Result<bool, ConfigError> {
    match spec {
        ScheduleSpec::TimeWindow(w) => Ok(w.contains(now.time_of_day())),
        ScheduleSpec::DutyCycle(c) => {
            c.validate()?;
            Ok(c.elapsed(now) < c.on_duration_secs)
        }
    }
}

/// Epoch second at which [`is_on`] next changes value, strictly after
/// `now`.  `None` for schedules that never change.  Pins to `i64::MAX`
/// rather than overflowing at the far end of the clock.
pub fn next_transition(spec: &ScheduleSpec, now: LocalInstant) -> Result<Option<i64>, ConfigError> {
    match spec {
        ScheduleSpec::TimeWindow(w) => {
            if w.on == w.off {
                return Ok(None);
            }
            let tod = i64::from(now.time_of_day().secs_since_midnight());
            let target = if w.contains(now.time_of_day()) { w.off } else { w.on };
            let delta = (i64::from(target.secs_since_midnight()) - tod)
                .rem_euclid(i64::from(SECS_PER_DAY));
            Ok(Some(now.epoch_secs.saturating_add(delta)))
        }
        ScheduleSpec::DutyCycle(c) => {
            c.validate()?;
            if c.never_flips() {
                return Ok(None);
            }
            let elapsed = c.elapsed(now);
            let on_now = elapsed < c.on_duration_secs;
            let delta = if on_now {
                c.on_duration_secs - elapsed
            } else {
                c.interval_secs - elapsed
            };
            let candidate = now.epoch_secs.saturating_add(i64::from(delta));
            if c.anchor() == PhaseAnchor::UnixEpoch {
                return Ok(Some(candidate));
            }
            // Midnight restarts the cycle in the on-phase.
            let midnight = now
                .start_of_local_day()
                .saturating_add(i64::from(SECS_PER_DAY));
            if candidate < midnight {
                Ok(Some(candidate))
            } else if on_now {
                Ok(Some(midnight.saturating_add(i64::from(c.on_duration_secs))))
            } else {
                Ok(Some(midnight))
            }
        }
    }
}

/// `on / interval * 100`, rounded to two decimals.
pub fn duty_cycle_percent(cycle: &DutyCycle) -> Result<f64, ConfigError> {
    cycle.validate()?;
    let ratio = f64::from(cycle.on_duration_secs) / f64::from(cycle.interval_secs);
    Ok((ratio * 100.0 * 100.0).round() / 100.0)
}

/// Compact duration text for cycle previews: `45s`, `5m 0s`, `2h 30m`.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Hourly setpoints (room AC)
// ═══════════════════════════════════════════════════════════════

/// A per-hour temperature setpoint table keyed `"00"`..`"23"`.
///
/// Hours without an entry have no setpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, i32>", into = "BTreeMap<String, i32>")]
pub struct HourlySetpoints([Option<i32>; 24]);

impl HourlySetpoints {
    /// Every hour set to `temp`.
    pub fn uniform(temp: i32) -> Self {
        Self([Some(temp); 24])
    }

    pub fn set(&mut self, hour: u8, temp: i32) -> Result<(), ConfigError> {
        let slot = self
            .0
            .get_mut(usize::from(hour))
            .ok_or(ConfigError::ValidationFailed("hour must be 0-23"))?;
        *slot = Some(temp);
        Ok(())
    }

    pub fn get(&self, hour: u8) -> Option<i32> {
        self.0.get(usize::from(hour)).copied().flatten()
    }

    /// Setpoint for the local hour containing `now`.
    pub fn setpoint_at(&self, now: LocalInstant) -> Option<i32> {
        self.get(now.time_of_day().hour())
    }
}

impl TryFrom<BTreeMap<String, i32>> for HourlySetpoints {
    type Error = ConfigError;

    fn try_from(map: BTreeMap<String, i32>) -> Result<Self, Self::Error> {
        let mut table = Self::default();
        for (key, temp) in map {
            let hour: u8 = key
                .parse()
                .map_err(|_| ConfigError::ValidationFailed("hour key must be \"00\"-\"23\""))?;
            table.set(hour, temp)?;
        }
        Ok(table)
    }
}

impl From<HourlySetpoints> for BTreeMap<String, i32> {
    fn from(table: HourlySetpoints) -> Self {
        table
            .0
            .iter()
            .enumerate()
            .filter_map(|(hour, temp)| temp.map(|t| (format!("{hour:02}"), t)))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
