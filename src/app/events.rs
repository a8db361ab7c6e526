//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  What happens
//! next is up to the adapter on the other side.

use crate::control::{ActuatorId, ControlMode};
use crate::error::ConfigError;
use crate::hub::UnitId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// An actuator went to manual control.
    OverrideSet {
        unit: UnitId,
        actuator: ActuatorId,
        value: bool,
        /// When the schedule will take control back, if ever.
        reverts_at: Option<i64>,
    },

    /// An override was explicitly removed.
    OverrideCleared { unit: UnitId, actuator: ActuatorId },

    /// The schedule crossed a boundary and took control back.
    OverrideReclaimed {
        unit: UnitId,
        actuator: ActuatorId,
        at: i64,
    },

    /// A new schedule was installed.
    ScheduleUpdated { unit: UnitId, mode: ControlMode },

    /// A schedule update was refused; the previous schedule stays.
    ScheduleRejected { unit: UnitId, error: ConfigError },

    /// Something could not be evaluated and is shown as a warning instead.
    ConfigWarning {
        unit: Option<UnitId>,
        actuator: Option<ActuatorId>,
        error: ConfigError,
    },

    /// Engine configuration replaced at runtime.
    ConfigUpdated,
}
