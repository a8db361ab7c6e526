//! Actuator control-mode arbitration.
//!
//! Each actuator sits in one of two modes:
//!
//! ```text
//!            issue override
//!   ┌───────┐ ───────────────▶ ┌────────┐
//!   │ Timer │                  │ Manual │
//!   └───────┘ ◀─────────────── └────────┘
//!        schedule boundary crossed
//!        (or explicit clear / new schedule)
//! ```
//!
//! [`resolver`] is the pure decision; [`store`] owns the per-unit state
//! the decision runs against.

pub mod resolver;
pub mod store;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use resolver::resolve;
pub use store::{ControlStore, UnitControl};

/// Switchable outputs on a grow unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorId {
    Lights,
    Fans,
    Pump,
}

impl ActuatorId {
    pub const COUNT: usize = 3;
    pub const ALL: [ActuatorId; Self::COUNT] = [Self::Lights, Self::Fans, Self::Pump];

    pub fn name(self) -> &'static str {
        match self {
            Self::Lights => "lights",
            Self::Fans => "fans",
            Self::Pump => "pump",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Lights => 0,
            Self::Fans => 1,
            Self::Pump => 2,
        }
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Who is authoritative for an actuator (or, unit-wide, for any of them).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// The schedule decides.
    #[default]
    Timer,
    /// A human override decides until the schedule reclaims control.
    Manual,
}

impl ControlMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Timer => "timer",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A standing manual command.  Absent override = `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideState {
    /// What the human asked for.
    pub commanded_value: bool,
    /// Epoch second the command was issued.
    pub set_at: i64,
    /// What the schedule said at `set_at`.
    pub schedule_value_at_set: bool,
    /// First schedule flip after `set_at`; `None` if the schedule never flips.
    pub reverts_at: Option<i64>,
}

/// Outcome of one arbitration.  Recomputed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlModeResult {
    /// Whether the actuator should be energised.
    pub effective_command: bool,
    pub mode: ControlMode,
    /// When manual control ends on its own.  Always `None` in timer mode.
    pub reverts_at: Option<i64>,
    /// The override passed in is spent; the caller must drop it.
    pub reclaimed: bool,
}
