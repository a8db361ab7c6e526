//! End-to-end control flows driven by a manual clock.
//!
//! Schedules are installed through the wire decoder, overrides through
//! relay commands, and reclaim through periodic ticks, exactly as a
//! backend loop would drive the service.

use std::sync::Arc;

use hydrocore::adapters::log_sink::LogEventSink;
use hydrocore::app::commands::AppCommand;
use hydrocore::app::events::AppEvent;
use hydrocore::app::ports::{Clock, ConfigPort};
use hydrocore::app::service::ControlService;
use hydrocore::config::EngineConfig;
use hydrocore::control::{ActuatorId, ControlMode};
use hydrocore::hub::{ClientId, Delivery, RealtimeHub, UnitId, UpdateKind};
use hydrocore::schedule::PhaseAnchor;
use hydrocore::wire::{decode_relay_patch, decode_schedule_record, encode_schedule_record};

use crate::mock_ports::{ManualClock, MemoryConfig, RecordingSink};

/// 2023-11-14T00:00:00Z, also a multiple of 900 s.
const DAY0: i64 = 1_699_920_000;

fn service(config: EngineConfig) -> ControlService {
    ControlService::new(config, Arc::new(RealtimeHub::new())).unwrap()
}

fn pump_only(json_cycle: &str) -> AppCommand {
    AppCommand::UpdateSchedule {
        unit: UnitId::from("HU-01"),
        record: decode_schedule_record(&format!(r#"{{"pump_cycle": {json_cycle}}}"#)).unwrap(),
    }
}

fn set_pump(on: bool) -> AppCommand {
    AppCommand::SetRelay {
        unit: UnitId::from("HU-01"),
        actuator: ActuatorId::Pump,
        on,
    }
}

// ── Duty-cycle reclaim ────────────────────────────────────────

#[test]
fn override_is_reclaimed_even_if_the_pulse_came_and_went_unseen() {
    let mut svc = service(EngineConfig::default());
    let clock = ManualClock::new(DAY0, 0);
    let mut sink = RecordingSink::new();
    svc.handle_command(pump_only(r#"{"on_duration_sec": 300, "interval_sec": 900}"#), &clock, &mut sink)
        .unwrap();

    // 400 s into the cycle the pump is resting; force it on.
    clock.set(DAY0 + 400);
    svc.handle_command(set_pump(true), &clock, &mut sink).unwrap();
    let unit = UnitId::from("HU-01");
    assert_eq!(svc.control_mode(&unit), ControlMode::Manual);

    // Nobody ticks through the next pulse.  At DAY0 + 1300 the schedule
    // reads "off" again, same as when the override was issued.
    clock.set(DAY0 + 1300);
    let written = svc.tick(&clock, &mut sink);
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].1.control_mode, ControlMode::Timer);
    assert_eq!(sink.reclaimed(), 1);

    let r = svc.store().evaluate(&unit, ActuatorId::Pump, clock.now()).unwrap();
    assert_eq!(r.mode, ControlMode::Timer);
    assert!(!r.effective_command);
}

#[test]
fn reissuing_an_override_restarts_its_window() {
    let mut svc = service(EngineConfig::default());
    let clock = ManualClock::new(DAY0, 0);
    let mut sink = RecordingSink::new();
    svc.handle_command(pump_only(r#"{"on_duration_sec": 300, "interval_sec": 900}"#), &clock, &mut sink)
        .unwrap();

    clock.set(DAY0 + 100);
    svc.handle_command(set_pump(false), &clock, &mut sink).unwrap();
    // First window ends at DAY0 + 300; re-issue inside the next pulse.
    clock.set(DAY0 + 950);
    svc.handle_command(set_pump(false), &clock, &mut sink).unwrap();

    assert!(matches!(
        sink.events.last(),
        Some(AppEvent::OverrideSet { reverts_at: Some(t), .. }) if *t == DAY0 + 1200
    ));
    clock.set(DAY0 + 1199);
    assert!(svc.tick(&clock, &mut sink).is_empty());
    clock.set(DAY0 + 1200);
    assert_eq!(svc.tick(&clock, &mut sink).len(), 1);
}

// ── Local-midnight anchoring ──────────────────────────────────

#[test]
fn local_midnight_anchor_restarts_the_cycle() {
    let config = EngineConfig {
        duty_cycle_anchor: PhaseAnchor::LocalMidnight,
        utc_offset_secs: 2 * 3600,
        ..EngineConfig::default()
    };
    let mut svc = service(config);
    let mut sink = RecordingSink::new();

    // 23:50 local.  The 7000 s cycle is 1800 s into an off phase that
    // would last past midnight.
    let local_midnight = DAY0 + 86_400 - 2 * 3600;
    let clock = ManualClock::new(local_midnight - 600, 2 * 3600);
    svc.handle_command(pump_only(r#"{"on_duration_sec": 300, "interval_sec": 7000}"#), &clock, &mut sink)
        .unwrap();
    svc.handle_command(set_pump(true), &clock, &mut sink).unwrap();

    assert!(matches!(
        sink.events.last(),
        Some(AppEvent::OverrideSet { reverts_at: Some(t), .. }) if *t == local_midnight
    ));

    clock.set(local_midnight - 1);
    assert!(svc.tick(&clock, &mut sink).is_empty());
    clock.set(local_midnight);
    assert_eq!(svc.tick(&clock, &mut sink).len(), 1);

    let unit = UnitId::from("HU-01");
    let r = svc.store().evaluate(&unit, ActuatorId::Pump, clock.now()).unwrap();
    assert!(r.effective_command, "a new local day starts with a pulse");
}

// ── Multiple units ────────────────────────────────────────────

#[test]
fn tick_reports_each_changed_unit_once() {
    let hub = Arc::new(RealtimeHub::new());
    let mut svc = ControlService::new(EngineConfig::default(), Arc::clone(&hub)).unwrap();
    let sub = hub.connect(ClientId::from("ops")).unwrap();
    let clock = ManualClock::new(DAY0 + 10 * 3600, 0);
    let mut sink = RecordingSink::new();

    let record = decode_schedule_record(
        r#"{"lights": {"on": "06:00", "off": "18:00"}, "fans": {"on": "06:00", "off": "18:00"}}"#,
    )
    .unwrap();
    for name in ["HU-01", "HU-02"] {
        let unit = UnitId::from(name);
        hub.join(sub.client_id(), &unit).unwrap();
        svc.handle_command(
            AppCommand::UpdateSchedule {
                unit: unit.clone(),
                record: record.clone(),
            },
            &clock,
            &mut sink,
        )
        .unwrap();
        let patch = decode_relay_patch(r#"{"lights": "OFF", "fans": "off"}"#).unwrap();
        svc.handle_command(AppCommand::SetRelays { unit, patch }, &clock, &mut sink)
            .unwrap();
    }
    sub.drain();

    clock.set(DAY0 + 18 * 3600);
    let written = svc.tick(&clock, &mut sink);
    let units: Vec<_> = written.iter().map(|(u, _)| u.as_str()).collect();
    assert_eq!(units, vec!["HU-01", "HU-02"]);
    assert_eq!(sink.reclaimed(), 4);

    let control_updates = sub
        .drain()
        .into_iter()
        .filter(|d| matches!(d, Delivery::Update(e) if e.kind == UpdateKind::ControlMode))
        .count();
    assert_eq!(control_updates, 2, "one control_mode_update per unit");
}

#[test]
fn written_record_survives_a_storage_roundtrip() {
    let mut svc = service(EngineConfig::default());
    let clock = ManualClock::new(DAY0 + 3600, 0);
    let mut sink = RecordingSink::new();
    svc.handle_command(pump_only(r#"{"on_duration_sec": 60, "interval_sec": 600}"#), &clock, &mut sink)
        .unwrap();
    let written = svc.handle_command(set_pump(true), &clock, &mut sink).unwrap().unwrap();

    let json = encode_schedule_record(&written).unwrap();
    assert!(json.contains(r#""_control_mode":"manual""#), "{json}");
    assert_eq!(decode_schedule_record(&json).unwrap(), written);
}

// ── Config persistence ────────────────────────────────────────

#[test]
fn reload_applies_valid_config_and_keeps_old_on_failure() {
    let mut svc = service(EngineConfig::default());
    let mut sink = RecordingSink::new();

    let wanted = EngineConfig {
        utc_offset_secs: -5 * 3600,
        ..EngineConfig::default()
    };
    assert!(svc.reload_config(&MemoryConfig::with(wanted.clone()), &mut sink));
    assert_eq!(svc.config(), &wanted);

    let mut broken = EngineConfig::default();
    broken.liveness.fresh_secs = broken.liveness.stale_secs + 1;
    assert!(!svc.reload_config(&MemoryConfig::with(broken), &mut sink));
    assert_eq!(svc.config(), &wanted);
}

#[test]
fn save_reports_storage_failure() {
    let svc = service(EngineConfig::default());
    let port = MemoryConfig::new();
    assert!(svc.save_config(&port));
    assert_eq!(port.writes.get(), 1);
    assert_eq!(port.load().unwrap(), EngineConfig::default());

    port.fail_writes.set(true);
    assert!(!svc.save_config(&port));
    assert_eq!(port.writes.get(), 1);
}

// ── Log sink ──────────────────────────────────────────────────

#[test]
fn log_sink_accepts_every_event() {
    let mut svc = service(EngineConfig::default());
    let clock = ManualClock::new(DAY0, 0);
    let mut sink = LogEventSink::new();
    svc.handle_command(pump_only(r#"{"on_duration_sec": 300, "interval_sec": 900}"#), &clock, &mut sink)
        .unwrap();
    svc.handle_command(set_pump(false), &clock, &mut sink).unwrap();
    clock.advance(900);
    assert_eq!(svc.tick(&clock, &mut sink).len(), 1);
}
