//! Common utilities for acceptance tests.

#![allow(dead_code)] // Not every scenario uses every helper

use bridge_common::{BridgeConfig, WordId};
use bridge_core::{Bridge, BridgeBuilder, Interpreter, SampleRecord, SimulatedSensorHost};
use std::time::Duration;

/// Interpreter that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingInterpreter {
    /// Words fired, in firing order.
    pub fired: Vec<WordId>,
    /// Sample batches, one per `on_samples_ready` call.
    pub batches: Vec<Vec<SampleRecord>>,
}

impl RecordingInterpreter {
    /// How many times `word` has fired.
    pub fn fire_count(&self, word: WordId) -> usize {
        self.fired.iter().filter(|w| **w == word).count()
    }

    /// All delivered records, flattened.
    pub fn records(&self) -> Vec<SampleRecord> {
        self.batches.iter().flatten().copied().collect()
    }
}

impl Interpreter for RecordingInterpreter {
    fn on_interrupt_fired(&mut self, word: WordId) {
        self.fired.push(word);
    }

    fn on_samples_ready(&mut self, records: &[SampleRecord]) {
        self.batches.push(records.to_vec());
    }
}

/// Bridge type used throughout the acceptance tests.
pub type TestBridge = Bridge<RecordingInterpreter, SimulatedSensorHost>;

/// Shorthand for milliseconds.
pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Initialized bridge with a 100 ms base period.
pub fn ready_bridge() -> TestBridge {
    let mut bridge = BridgeBuilder::new(RecordingInterpreter::default(), SimulatedSensorHost::manual())
        .base_period(ms(100))
        .build()
        .expect("bridge construction");
    bridge.init().expect("bridge init");
    bridge
}

/// Initialized bridge built from `config`.
pub fn bridge_from_config(config: BridgeConfig) -> TestBridge {
    let mut bridge = BridgeBuilder::new(RecordingInterpreter::default(), SimulatedSensorHost::manual())
        .config(config)
        .build()
        .expect("bridge construction");
    bridge.init().expect("bridge init");
    bridge
}
