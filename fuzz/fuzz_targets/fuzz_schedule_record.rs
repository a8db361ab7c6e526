//! Fuzz target: `decode_schedule_record`
//!
//! Any record the decoder accepts must evaluate without error at any
//! instant and survive a re-encode unchanged.
//!
//! cargo fuzz run fuzz_schedule_record

#![no_main]

use hydrocore::control::ActuatorId;
use hydrocore::schedule::{LocalInstant, is_on, next_transition};
use hydrocore::wire::{decode_schedule_record, encode_schedule_record};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(record) = decode_schedule_record(raw) else {
        return;
    };

    let now = LocalInstant::new(1_700_000_000, 3600);
    for actuator in ActuatorId::ALL {
        if let Some(spec) = record.get(actuator) {
            assert!(is_on(spec, now).is_ok(), "accepted schedule failed to evaluate");
            assert!(next_transition(spec, now).is_ok());
        }
    }

    let json = encode_schedule_record(&record).expect("accepted record must encode");
    let again = decode_schedule_record(&json).expect("re-encoded record must decode");
    assert_eq!(again, record);
});
