//! Timer/manual arbitration for a single actuator.
//!
//! A manual override lasts until the schedule's own on/off value next
//! changes.  The override remembers what the schedule said when it was
//! issued; as soon as evaluating the schedule gives a different answer,
//! or the recorded transition instant has passed, the override is spent.
//!
//! The second condition catches a boundary crossed twice between
//! evaluations (e.g. a short pump pulse that started and ended while
//! nobody was looking): the boolean is back where it was, but control
//! still returns to the timer.

use crate::error::ConfigError;
use crate::schedule::{LocalInstant, ScheduleSpec, is_on, next_transition};

use super::{ControlMode, ControlModeResult, OverrideState};

impl OverrideState {
    /// Record a manual command issued at `now`.
    ///
    /// With no schedule the actuator has no boundary to reclaim at, so the
    /// override stands until cleared.
    pub fn issue(
        spec: Option<&ScheduleSpec>,
        commanded_value: bool,
        now: LocalInstant,
    ) -> Result<Self, ConfigError> {
        let (schedule_value_at_set, reverts_at) = match spec {
            Some(spec) => (is_on(spec, now)?, next_transition(spec, now)?),
            None => (false, None),
        };
        Ok(Self {
            commanded_value,
            set_at: now.epoch_secs,
            schedule_value_at_set,
            reverts_at,
        })
    }
}

/// Decide what an actuator should do at `now`.
///
/// Pure: a spent override is reported through
/// [`ControlModeResult::reclaimed`], never mutated away here.  A missing
/// schedule means "off" under timer control.
pub fn resolve(
    spec: Option<&ScheduleSpec>,
    override_state: Option<&OverrideState>,
    now: LocalInstant,
) -> Result<ControlModeResult, ConfigError> {
    let scheduled = match spec {
        Some(spec) => is_on(spec, now)?,
        None => false,
    };
    let timer = |reclaimed| ControlModeResult {
        effective_command: scheduled,
        mode: ControlMode::Timer,
        reverts_at: None,
        reclaimed,
    };

    let Some(ov) = override_state else {
        return Ok(timer(false));
    };

    let boundary_crossed = spec.is_some()
        && (scheduled != ov.schedule_value_at_set
            || ov.reverts_at.is_some_and(|t| now.epoch_secs >= t));

    if boundary_crossed {
        Ok(timer(true))
    } else {
        Ok(ControlModeResult {
            effective_command: ov.commanded_value,
            mode: ControlMode::Manual,
            reverts_at: ov.reverts_at,
            reclaimed: false,
        })
    }
}
