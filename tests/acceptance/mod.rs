//! End-to-end scenarios for the event bridge.
//!
//! Every test builds a bridge through the public API with a recording
//! interpreter and a manual simulated sensor host, so results are
//! deterministic.

mod common;
mod config_test;
mod interrupt_test;
mod lifecycle_test;
mod sensor_test;
