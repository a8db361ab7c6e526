//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade, one line per event.  An audit-table or metrics
//! adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "ON" } else { "OFF" }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::OverrideSet {
                unit,
                actuator,
                value,
                reverts_at,
            } => match reverts_at {
                Some(t) => info!("OVERRIDE | {unit}/{actuator} -> {} until {t}", on_off(*value)),
                None => info!("OVERRIDE | {unit}/{actuator} -> {} (no reclaim)", on_off(*value)),
            },
            AppEvent::OverrideCleared { unit, actuator } => {
                info!("OVERRIDE | {unit}/{actuator} cleared");
            }
            AppEvent::OverrideReclaimed { unit, actuator, at } => {
                info!("RECLAIM | {unit}/{actuator} back to timer at {at}");
            }
            AppEvent::ScheduleUpdated { unit, mode } => {
                info!("SCHEDULE | {unit} updated, mode={mode}");
            }
            AppEvent::ScheduleRejected { unit, error } => {
                warn!("SCHEDULE | {unit} rejected: {error}");
            }
            AppEvent::ConfigWarning {
                unit,
                actuator,
                error,
            } => {
                let unit = unit.as_ref().map_or("-", |u| u.as_str());
                let actuator = actuator.map_or("-", |a| a.name());
                warn!("CONFIG | unit={unit} actuator={actuator} | {error}");
            }
            AppEvent::ConfigUpdated => {
                info!("CONFIG | engine config replaced");
            }
        }
    }
}
