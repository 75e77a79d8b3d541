//! Acceptance tests for the Forth event bridge.
//!
//! These tests drive a fully wired bridge the way a host adapter would:
//! - Periodic interrupt scenarios
//! - Sensor sample delivery scenarios
//! - Lifecycle and configuration file handling

mod acceptance;
