//! Mock port adapters for integration tests.
//!
//! Records every emitted event and every config write so tests can
//! assert on the full history without a filesystem or wall clock.

use std::cell::{Cell, RefCell};

use hydrocore::app::events::AppEvent;
use hydrocore::app::ports::{Clock, ConfigPort, EventSink};
use hydrocore::config::EngineConfig;
use hydrocore::schedule::LocalInstant;

// ── ManualClock ───────────────────────────────────────────────

/// A clock that only moves when told to.
pub struct ManualClock {
    epoch: Cell<i64>,
    utc_offset_secs: i32,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new(epoch: i64, utc_offset_secs: i32) -> Self {
        Self {
            epoch: Cell::new(epoch),
            utc_offset_secs,
        }
    }

    pub fn advance(&self, secs: i64) {
        self.epoch.set(self.epoch.get() + secs);
    }

    pub fn set(&self, epoch: i64) {
        self.epoch.set(epoch);
    }

    pub fn epoch(&self) -> i64 {
        self.epoch.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> LocalInstant {
        LocalInstant::new(self.epoch.get(), self.utc_offset_secs)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reclaimed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::OverrideReclaimed { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MemoryConfig ──────────────────────────────────────────────

/// In-memory [`ConfigPort`].  `fail_writes` simulates a full disk.
#[derive(Default)]
pub struct MemoryConfig {
    pub stored: RefCell<Option<EngineConfig>>,
    pub fail_writes: Cell<bool>,
    pub writes: Cell<u32>,
}

#[allow(dead_code)]
impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(config: EngineConfig) -> Self {
        let port = Self::default();
        *port.stored.borrow_mut() = Some(config);
        port
    }
}

impl ConfigPort for MemoryConfig {
    fn load(&self) -> anyhow::Result<EngineConfig> {
        let config = self.stored.borrow().clone().unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    fn save(&self, config: &EngineConfig) -> anyhow::Result<()> {
        if self.fail_writes.get() {
            anyhow::bail!("storage full");
        }
        config.validate()?;
        *self.stored.borrow_mut() = Some(config.clone());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
