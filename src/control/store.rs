//! The single authoritative record of schedules and overrides.
//!
//! One [`UnitControl`] per unit, one slot per actuator.  Every mutation
//! goes through [`ControlStore`]; nothing in the crate keeps override or
//! schedule state anywhere else.

use std::collections::BTreeMap;

use heapless::Vec as HVec;
use log::{debug, warn};

use crate::error::ConfigError;
use crate::hub::UnitId;
use crate::schedule::{LocalInstant, ScheduleSpec};
use crate::wire::ScheduleRecord;

use super::{ActuatorId, ControlMode, ControlModeResult, OverrideState, resolve};

/// Per-actuator results for one unit, in [`ActuatorId::ALL`] order.
pub type UnitEvaluation = HVec<(ActuatorId, ControlModeResult), { ActuatorId::COUNT }>;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ActuatorSlot {
    schedule: Option<ScheduleSpec>,
    override_state: Option<OverrideState>,
}

/// Schedules and standing overrides for one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitControl {
    slots: [ActuatorSlot; ActuatorId::COUNT],
}

impl UnitControl {
    pub fn schedule(&self, actuator: ActuatorId) -> Option<&ScheduleSpec> {
        self.slots[actuator.index()].schedule.as_ref()
    }

    pub fn override_state(&self, actuator: ActuatorId) -> Option<&OverrideState> {
        self.slots[actuator.index()].override_state.as_ref()
    }

    /// `Manual` while any actuator is overridden.
    pub fn control_mode(&self) -> ControlMode {
        if self.slots.iter().any(|s| s.override_state.is_some()) {
            ControlMode::Manual
        } else {
            ControlMode::Timer
        }
    }

    pub fn evaluate(&self, actuator: ActuatorId, now: LocalInstant) -> Result<ControlModeResult, ConfigError> {
        let slot = &self.slots[actuator.index()];
        resolve(slot.schedule.as_ref(), slot.override_state.as_ref(), now)
    }

    /// Evaluate every actuator.  Fails on the first malformed schedule.
    pub fn evaluate_all(&self, now: LocalInstant) -> Result<UnitEvaluation, ConfigError> {
        let mut out = UnitEvaluation::new();
        for actuator in ActuatorId::ALL {
            // Capacity equals ActuatorId::COUNT.
            let _ = out.push((actuator, self.evaluate(actuator, now)?));
        }
        Ok(out)
    }

    fn to_record(&self) -> ScheduleRecord {
        let mut record = ScheduleRecord {
            control_mode: self.control_mode(),
            ..ScheduleRecord::default()
        };
        for actuator in ActuatorId::ALL {
            record.set(actuator, self.schedule(actuator).copied());
        }
        record
    }
}

/// All units the engine knows about.
#[derive(Debug, Clone, Default)]
pub struct ControlStore {
    units: BTreeMap<UnitId, UnitControl>,
}

impl ControlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(&self, unit: &UnitId) -> Option<&UnitControl> {
        self.units.get(unit)
    }

    pub fn units(&self) -> impl Iterator<Item = (&UnitId, &UnitControl)> {
        self.units.iter()
    }

    fn unit_mut(&mut self, unit: &UnitId) -> &mut UnitControl {
        self.units.entry(unit.clone()).or_default()
    }

    /// Replace one actuator's schedule.  Any standing override on that
    /// actuator is dropped: a new schedule hands control back to the timer.
    pub fn set_schedule(
        &mut self,
        unit: &UnitId,
        actuator: ActuatorId,
        schedule: Option<ScheduleSpec>,
    ) -> Result<(), ConfigError> {
        if let Some(spec) = &schedule {
            spec.validate()?;
        }
        let slot = &mut self.unit_mut(unit).slots[actuator.index()];
        slot.schedule = schedule;
        if slot.override_state.take().is_some() {
            debug!("{unit}/{actuator}: override dropped by schedule change");
        }
        Ok(())
    }

    /// Install a full schedule record.  The whole unit returns to timer
    /// mode.  Nothing is changed if any entry is malformed.
    pub fn apply_record(&mut self, unit: &UnitId, record: &ScheduleRecord) -> Result<(), ConfigError> {
        record.validate()?;
        let control = self.unit_mut(unit);
        for actuator in ActuatorId::ALL {
            let slot = &mut control.slots[actuator.index()];
            slot.schedule = record.get(actuator).copied();
            slot.override_state = None;
        }
        Ok(())
    }

    /// Put an actuator under manual control.  Re-issuing replaces the
    /// previous override and restarts its reclaim window.
    pub fn issue_override(
        &mut self,
        unit: &UnitId,
        actuator: ActuatorId,
        value: bool,
        now: LocalInstant,
    ) -> Result<OverrideState, ConfigError> {
        let slot = &mut self.unit_mut(unit).slots[actuator.index()];
        let state = OverrideState::issue(slot.schedule.as_ref(), value, now)?;
        slot.override_state = Some(state);
        Ok(state)
    }

    /// Put several actuators under manual control at once.  Nothing is
    /// changed if any of them has a schedule that cannot be evaluated; the
    /// error names the first such actuator.
    pub fn issue_overrides(
        &mut self,
        unit: &UnitId,
        commands: &[(ActuatorId, bool)],
        now: LocalInstant,
    ) -> Result<HVec<(ActuatorId, OverrideState), { ActuatorId::COUNT }>, (ActuatorId, ConfigError)> {
        let mut issued = HVec::new();
        for &(actuator, value) in commands {
            let spec = self.unit(unit).and_then(|c| c.schedule(actuator));
            let state = OverrideState::issue(spec, value, now).map_err(|e| (actuator, e))?;
            // A repeated actuator keeps its last command.
            issued.retain(|(a, _)| *a != actuator);
            let _ = issued.push((actuator, state));
        }
        let control = self.unit_mut(unit);
        for (actuator, state) in &issued {
            control.slots[actuator.index()].override_state = Some(*state);
        }
        Ok(issued)
    }

    /// Drop an override.  Returns what was cleared, if anything.
    pub fn clear_override(&mut self, unit: &UnitId, actuator: ActuatorId) -> Option<OverrideState> {
        self.units
            .get_mut(unit)
            .and_then(|c| c.slots[actuator.index()].override_state.take())
    }

    /// Arbitrate one actuator.  Unknown units read as unscheduled, off.
    pub fn evaluate(
        &self,
        unit: &UnitId,
        actuator: ActuatorId,
        now: LocalInstant,
    ) -> Result<ControlModeResult, ConfigError> {
        match self.units.get(unit) {
            Some(control) => control.evaluate(actuator, now),
            None => resolve(None, None, now),
        }
    }

    /// Remove every override whose schedule boundary has passed.
    ///
    /// Returns the spent overrides.  A unit whose schedule fails to
    /// evaluate keeps its override and is logged.
    pub fn reclaim_expired(&mut self, now: LocalInstant) -> Vec<(UnitId, ActuatorId, OverrideState)> {
        let mut reclaimed = Vec::new();
        for (unit, control) in &mut self.units {
            for actuator in ActuatorId::ALL {
                let slot = &mut control.slots[actuator.index()];
                let Some(ov) = slot.override_state else {
                    continue;
                };
                match resolve(slot.schedule.as_ref(), Some(&ov), now) {
                    Ok(r) if r.reclaimed => {
                        slot.override_state = None;
                        reclaimed.push((unit.clone(), actuator, ov));
                    }
                    Ok(_) => {}
                    Err(e) => warn!("{unit}/{actuator}: cannot evaluate schedule: {e}"),
                }
            }
        }
        reclaimed
    }

    /// Unit-level `_control_mode`; unknown units are in timer mode.
    pub fn control_mode(&self, unit: &UnitId) -> ControlMode {
        self.units
            .get(unit)
            .map_or(ControlMode::Timer, UnitControl::control_mode)
    }

    /// The record a storage collaborator should persist for `unit`.
    pub fn to_record(&self, unit: &UnitId) -> ScheduleRecord {
        self.units
            .get(unit)
            .map_or_else(ScheduleRecord::default, UnitControl::to_record)
    }
}
