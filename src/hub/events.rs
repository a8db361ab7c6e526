//! What the hub carries.
//!
//! Updates are invalidate-and-refetch signals: they say *which* unit
//! changed and *what kind* of data went stale, never the data itself.
//! Views re-read through the REST collaborator, so there is exactly one
//! path by which state reaches a view.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::UnitId;

/// Which slice of a unit's state went stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Sensors,
    Relays,
    Schedule,
    ControlMode,
}

impl UpdateKind {
    /// Event name on the socket.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Sensors => "sensor_update",
            Self::Relays => "relay_update",
            Self::Schedule => "schedule_update",
            Self::ControlMode => "control_mode_update",
        }
    }
}

/// A change notification for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEvent {
    pub unit_id: UnitId,
    /// Epoch second the change happened.
    pub timestamp: i64,
    pub kind: UpdateKind,
}

impl UnitEvent {
    pub fn new(unit_id: UnitId, timestamp: i64, kind: UpdateKind) -> Self {
        Self {
            unit_id,
            timestamp,
            kind,
        }
    }
}

/// Everything a subscriber can receive, in publish order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Delivery {
    /// Connection accepted (also sent on reconnect).
    Connected,
    /// Subscription to a unit acknowledged.
    Joined(UnitId),
    /// Unsubscription acknowledged.
    Left(UnitId),
    Update(UnitEvent),
}

impl Delivery {
    /// Event name on the socket.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Joined(_) => "joined",
            Self::Left(_) => "left",
            Self::Update(e) => e.kind.event_name(),
        }
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::Joined(unit) => write!(f, "joined {unit}"),
            Self::Left(unit) => write!(f, "left {unit}"),
            Self::Update(e) => write!(f, "{} {} @{}", e.kind.event_name(), e.unit_id, e.timestamp),
        }
    }
}
