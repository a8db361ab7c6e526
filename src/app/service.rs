//! Application service: the hexagonal core.
//!
//! [`ControlService`] owns the control store and the engine config, and
//! holds a handle to the realtime hub.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  AppCommand ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!                 │       ControlService        │
//!       Clock ──▶ │ ControlStore · EngineConfig │ ──▶ RealtimeHub
//!                 └────────────────────────────┘
//!                        │ ScheduleRecord (write-through)
//!                        ▼
//!                  storage collaborator
//! ```
//!
//! The service never persists anything itself: every mutating call
//! returns the record the storage collaborator should write.

use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::control::{ActuatorId, ControlMode, ControlModeResult, ControlStore};
use crate::error::Result;
use crate::hub::{RealtimeHub, UnitEvent, UnitId, UpdateKind};
use crate::schedule::{LocalInstant, ScheduleSpec, duty_cycle_percent, next_transition};
use crate::status::liveness::format_last_seen;
use crate::status::unit::{UnitStatus, evaluate_room, evaluate_unit, summary_status};
use crate::status::{LivenessState, StatusView};
use crate::wire::{AcScheduleRecord, RelayPatch, RoomSnapshot, ScheduleRecord, SensorSnapshot};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{Clock, ConfigPort, EventSink};

// ───────────────────────────────────────────────────────────────
// Views
// ───────────────────────────────────────────────────────────────

/// One actuator as a toggle renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActuatorView {
    pub actuator: ActuatorId,
    /// `None` when the schedule could not be evaluated (see warnings).
    pub control: Option<ControlModeResult>,
    pub schedule: Option<ScheduleSpec>,
    /// Next time the schedule itself flips.
    pub next_transition: Option<i64>,
    /// Only for duty-cycle schedules.
    pub duty_cycle_percent: Option<f64>,
}

/// Everything a unit card or detail page needs, derived in one place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitView {
    pub unit_id: UnitId,
    pub status: UnitStatus,
    /// Card badge: worst of pH, TDS and water level.
    pub summary: StatusView,
    pub liveness: LivenessState,
    pub liveness_text: &'static str,
    pub last_seen: String,
    /// `Manual` while any actuator is under an unexpired override.
    pub control_mode: ControlMode,
    pub actuators: Vec<ActuatorView>,
    /// Configuration problems surfaced instead of failing the view.
    pub warnings: Vec<String>,
}

/// A room node card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomView {
    pub unit_id: Option<UnitId>,
    pub status: UnitStatus,
    pub liveness: LivenessState,
    pub liveness_text: &'static str,
    pub last_seen: String,
    /// What the AC schedule asks for this hour.
    pub ac_setpoint: Option<i32>,
    /// What the AC last reported.
    pub ac_current_set_temp: Option<i32>,
}

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct ControlService {
    store: ControlStore,
    config: EngineConfig,
    hub: Arc<RealtimeHub>,
}

impl ControlService {
    /// Construct the service.  Rejects an invalid config outright.
    pub fn new(config: EngineConfig, hub: Arc<RealtimeHub>) -> Result<Self> {
        config.validate()?;
        info!(
            "ControlService started (liveness {}s/{}s, anchor {:?}, utc{:+}s)",
            config.liveness.fresh_secs,
            config.liveness.stale_secs,
            config.duty_cycle_anchor,
            config.utc_offset_secs
        );
        Ok(Self {
            store: ControlStore::new(),
            config,
            hub,
        })
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    ///
    /// Returns the schedule record to write through for unit commands,
    /// `None` for config updates.  A refused schedule or config leaves the
    /// previous one in place.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> Result<Option<ScheduleRecord>> {
        let now = self.local_now(clock);
        match cmd {
            AppCommand::SetRelay { unit, actuator, on } => {
                self.set_relay(&unit, actuator, on, now, sink)?;
                self.publish(&unit, now, UpdateKind::Relays);
                self.publish(&unit, now, UpdateKind::ControlMode);
                Ok(Some(self.store.to_record(&unit)))
            }
            AppCommand::SetRelays { unit, patch } => {
                self.set_relays(&unit, &patch, now, sink)?;
                Ok(Some(self.store.to_record(&unit)))
            }
            AppCommand::UpdateSchedule { unit, record } => {
                let record = record.with_default_anchor(self.config.duty_cycle_anchor);
                if let Err(error) = self.store.apply_record(&unit, &record) {
                    warn!("schedule for {unit} rejected: {error}");
                    sink.emit(&AppEvent::ScheduleRejected {
                        unit,
                        error: error.clone(),
                    });
                    return Err(error.into());
                }
                sink.emit(&AppEvent::ScheduleUpdated {
                    unit: unit.clone(),
                    mode: self.store.control_mode(&unit),
                });
                self.publish(&unit, now, UpdateKind::Schedule);
                self.publish(&unit, now, UpdateKind::ControlMode);
                Ok(Some(self.store.to_record(&unit)))
            }
            AppCommand::ClearOverride { unit, actuator } => {
                if self.store.clear_override(&unit, actuator).is_some() {
                    sink.emit(&AppEvent::OverrideCleared {
                        unit: unit.clone(),
                        actuator,
                    });
                    self.publish(&unit, now, UpdateKind::ControlMode);
                }
                Ok(Some(self.store.to_record(&unit)))
            }
            AppCommand::UpdateConfig(config) => {
                self.update_config(config, sink)?;
                Ok(None)
            }
        }
    }

    fn set_relay(
        &mut self,
        unit: &UnitId,
        actuator: ActuatorId,
        on: bool,
        now: LocalInstant,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match self.store.issue_override(unit, actuator, on, now) {
            Ok(state) => {
                sink.emit(&AppEvent::OverrideSet {
                    unit: unit.clone(),
                    actuator,
                    value: on,
                    reverts_at: state.reverts_at,
                });
                Ok(())
            }
            Err(error) => {
                sink.emit(&AppEvent::ConfigWarning {
                    unit: Some(unit.clone()),
                    actuator: Some(actuator),
                    error: error.clone(),
                });
                Err(error.into())
            }
        }
    }

    /// Apply a multi-relay patch.  Either every named relay is overridden
    /// or none is.
    fn set_relays(
        &mut self,
        unit: &UnitId,
        patch: &RelayPatch,
        now: LocalInstant,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let commands: Vec<_> = patch.commands().collect();
        if commands.is_empty() {
            return Ok(());
        }
        let issued = match self.store.issue_overrides(unit, &commands, now) {
            Ok(issued) => issued,
            Err((actuator, error)) => {
                sink.emit(&AppEvent::ConfigWarning {
                    unit: Some(unit.clone()),
                    actuator: Some(actuator),
                    error: error.clone(),
                });
                return Err(error.into());
            }
        };
        for (actuator, state) in issued {
            sink.emit(&AppEvent::OverrideSet {
                unit: unit.clone(),
                actuator,
                value: state.commanded_value,
                reverts_at: state.reverts_at,
            });
        }
        self.publish(unit, now, UpdateKind::Relays);
        self.publish(unit, now, UpdateKind::ControlMode);
        Ok(())
    }

    /// Replace the engine config.  Existing schedules keep the anchor they
    /// were stored with; only later records pick up a new default.
    pub fn update_config(&mut self, config: EngineConfig, sink: &mut impl EventSink) -> Result<()> {
        if let Err(error) = config.validate() {
            sink.emit(&AppEvent::ConfigWarning {
                unit: None,
                actuator: None,
                error: error.clone(),
            });
            return Err(error.into());
        }
        self.config = config;
        sink.emit(&AppEvent::ConfigUpdated);
        Ok(())
    }

    // ── Periodic work ─────────────────────────────────────────

    /// Reclaim every override whose schedule boundary has passed.
    ///
    /// Returns the updated record of every unit that changed, for the
    /// storage collaborator to write through.
    pub fn tick(&mut self, clock: &impl Clock, sink: &mut impl EventSink) -> Vec<(UnitId, ScheduleRecord)> {
        let now = self.local_now(clock);
        let mut touched = BTreeSet::new();
        for (unit, actuator, _) in self.store.reclaim_expired(now) {
            sink.emit(&AppEvent::OverrideReclaimed {
                unit: unit.clone(),
                actuator,
                at: now.epoch_secs,
            });
            touched.insert(unit);
        }
        touched
            .into_iter()
            .map(|unit| {
                self.publish(&unit, now, UpdateKind::ControlMode);
                let record = self.store.to_record(&unit);
                (unit, record)
            })
            .collect()
    }

    /// Signal subscribers that a unit's sensor data changed.
    pub fn notify_sensors(&self, unit: &UnitId, clock: &impl Clock) -> usize {
        self.publish(unit, self.local_now(clock), UpdateKind::Sensors)
    }

    /// The clock's instant viewed at the configured offset.  The config is
    /// the only authority on local time, so a reload moves every window.
    fn local_now(&self, clock: &impl Clock) -> LocalInstant {
        clock.now().at_offset(self.config.utc_offset_secs)
    }

    fn publish(&self, unit: &UnitId, now: LocalInstant, kind: UpdateKind) -> usize {
        let delivered = self
            .hub
            .publish(UnitEvent::new(unit.clone(), now.epoch_secs, kind));
        debug!("{} for {unit} reached {delivered} subscribers", kind.event_name());
        delivered
    }

    // ── Queries ───────────────────────────────────────────────

    /// Derive the full presentation state for a hydroponic unit.
    ///
    /// Never fails: an actuator whose schedule cannot be evaluated shows
    /// up with `control: None` and a warning.
    pub fn unit_view(&self, unit: &UnitId, sensors: Option<&SensorSnapshot>, clock: &impl Clock) -> UnitView {
        let now = self.local_now(clock);
        let empty = SensorSnapshot::default();
        let snapshot = sensors.unwrap_or(&empty);
        let last_seen = snapshot.timestamp;

        let mut warnings = Vec::new();
        let mut actuators = Vec::with_capacity(ActuatorId::COUNT);
        for actuator in ActuatorId::ALL {
            let schedule = self
                .store
                .unit(unit)
                .and_then(|c| c.schedule(actuator))
                .copied();
            let control = match self.store.evaluate(unit, actuator, now) {
                Ok(r) => Some(r),
                Err(e) => {
                    warnings.push(format!("{actuator}: {e}"));
                    None
                }
            };
            let next = schedule
                .as_ref()
                .and_then(|s| next_transition(s, now).ok().flatten());
            let percent = match &schedule {
                Some(ScheduleSpec::DutyCycle(c)) => duty_cycle_percent(c).ok(),
                _ => None,
            };
            actuators.push(ActuatorView {
                actuator,
                control,
                schedule,
                next_transition: next,
                duty_cycle_percent: percent,
            });
        }

        let control_mode = if actuators
            .iter()
            .any(|a| a.control.is_some_and(|c| c.mode == ControlMode::Manual))
        {
            ControlMode::Manual
        } else {
            ControlMode::Timer
        };

        UnitView {
            unit_id: unit.clone(),
            status: evaluate_unit(snapshot, &self.config.thresholds),
            summary: summary_status(snapshot, &self.config.thresholds),
            liveness: self.config.liveness.classify(last_seen, now.epoch_secs),
            liveness_text: self.config.liveness.badge_text(last_seen, now.epoch_secs),
            last_seen: format_last_seen(last_seen, now.epoch_secs),
            control_mode,
            actuators,
            warnings,
        }
    }

    /// Derive the presentation state for a room node.
    pub fn room_view(&self, room: &RoomSnapshot, ac: Option<&AcScheduleRecord>, clock: &impl Clock) -> RoomView {
        let now = self.local_now(clock);
        RoomView {
            unit_id: room.unit_id.clone(),
            status: evaluate_room(room, &self.config.thresholds),
            liveness: self.config.liveness.classify(room.timestamp, now.epoch_secs),
            liveness_text: self.config.liveness.badge_text(room.timestamp, now.epoch_secs),
            last_seen: format_last_seen(room.timestamp, now.epoch_secs),
            ac_setpoint: ac.and_then(|a| a.ac_schedule.setpoint_at(now)),
            ac_current_set_temp: room.ac.as_ref().and_then(|a| a.current_set_temp),
        }
    }

    pub fn control_mode(&self, unit: &UnitId) -> ControlMode {
        self.store.control_mode(unit)
    }

    pub fn store(&self) -> &ControlStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<RealtimeHub> {
        &self.hub
    }

    // ── Config persistence ────────────────────────────────────

    /// Pull config from storage.  Returns `true` if it was applied.
    pub fn reload_config(&mut self, port: &impl ConfigPort, sink: &mut impl EventSink) -> bool {
        match port.load() {
            Ok(config) => self.update_config(config, sink).is_ok(),
            Err(e) => {
                warn!("Config reload failed: {e:#}");
                false
            }
        }
    }

    /// Push the live config to storage.  Returns `true` if it was saved.
    pub fn save_config(&self, port: &impl ConfigPort) -> bool {
        match port.save(&self.config) {
            Ok(()) => {
                info!("Config saved");
                true
            }
            Err(e) => {
                warn!("Config save failed: {e:#}");
                false
            }
        }
    }
}
