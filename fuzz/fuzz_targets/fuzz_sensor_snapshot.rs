//! Fuzz target: sensor and room snapshot decoding plus status roll-up.
//!
//! Whatever the backend sends, decoding either fails cleanly or yields a
//! snapshot the evaluators can classify without panicking.
//!
//! cargo fuzz run fuzz_sensor_snapshot

#![no_main]

use hydrocore::config::ThresholdTable;
use hydrocore::status::unit::{evaluate_room, evaluate_unit, summary_status};
use hydrocore::wire::{decode_room_snapshot, decode_sensor_snapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let table = ThresholdTable::default();

    if let Ok(snapshot) = decode_sensor_snapshot(raw) {
        let status = evaluate_unit(&snapshot, &table);
        assert!(status.metrics.iter().all(|m| m.value.is_none_or(f64::is_finite)));
        let _ = summary_status(&snapshot, &table);
    }
    if let Ok(room) = decode_room_snapshot(raw) {
        let _ = evaluate_room(&room, &table);
    }
});
