//! Application core: domain orchestration, zero I/O.
//!
//! This module contains the business rules for the grow units: command
//! handling, override reclaim, and view derivation.  All interaction with
//! the clock, logs and storage happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real collaborators.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
