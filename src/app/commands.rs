//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (dashboard
//! toggles, schedule editor, REST handlers) that the
//! [`ControlService`](super::service::ControlService) interprets and acts
//! upon.

use crate::config::EngineConfig;
use crate::control::ActuatorId;
use crate::hub::UnitId;
use crate::wire::{RelayPatch, ScheduleRecord};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Manually switch one relay; puts it under manual control.
    SetRelay {
        unit: UnitId,
        actuator: ActuatorId,
        on: bool,
    },

    /// A relay POST body: every named relay is overridden.
    SetRelays { unit: UnitId, patch: RelayPatch },

    /// Replace a unit's schedule; the unit returns to timer mode.
    UpdateSchedule { unit: UnitId, record: ScheduleRecord },

    /// Hand one actuator back to its schedule.
    ClearOverride { unit: UnitId, actuator: ActuatorId },

    /// Hot-reload engine configuration.
    UpdateConfig(EngineConfig),
}

impl AppCommand {
    /// The unit the command targets, if any.
    pub fn unit(&self) -> Option<&UnitId> {
        match self {
            Self::SetRelay { unit, .. }
            | Self::SetRelays { unit, .. }
            | Self::UpdateSchedule { unit, .. }
            | Self::ClearOverride { unit, .. } => Some(unit),
            Self::UpdateConfig(_) => None,
        }
    }
}
