//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (clock, event sinks, config storage) implement these
//! traits.  The [`ControlService`](super::service::ControlService) consumes
//! them via generics, so the domain core never reads the wall clock or
//! touches a file directly.

use crate::config::EngineConfig;
use crate::schedule::LocalInstant;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: wall clock → domain)
// ───────────────────────────────────────────────────────────────

/// Source of "now".  Every evaluation takes its instant from here so tests
/// can pin time exactly.
///
/// Only the epoch second is authoritative.  The service views it at
/// [`EngineConfig::utc_offset_secs`], whatever offset the clock carries.
pub trait Clock {
    fn now(&self) -> LocalInstant;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, audit table,
/// metrics, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists engine configuration.
///
/// Implementations MUST validate before persisting and after loading.
/// Invalid values are rejected, never clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`EngineConfig::default()`] if nothing
    /// is stored yet.
    fn load(&self) -> anyhow::Result<EngineConfig>;

    /// Validate and persist configuration.
    fn save(&self, config: &EngineConfig) -> anyhow::Result<()>;
}
