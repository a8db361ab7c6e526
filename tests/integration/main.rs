//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  Everything runs on the host with a manual
//! clock; no wall-clock sleeps.

mod control_flow_tests;
mod hub_tests;
mod mock_ports;
