//! Stand-in interpreter that logs what the bridge hands it.

use bridge_common::{SensorType, WordId};
use bridge_core::{Interpreter, SampleRecord};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Logs fired words and decoded samples instead of running Forth.
#[derive(Debug, Default)]
pub struct ConsoleInterpreter {
    fired: u64,
    samples: u64,
    latest: BTreeMap<SensorType, i32>,
}

impl ConsoleInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt words fired so far.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Sample records consumed so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Most recent magnitude seen per sensor.
    pub fn latest(&self) -> &BTreeMap<SensorType, i32> {
        &self.latest
    }
}

impl Interpreter for ConsoleInterpreter {
    fn on_interrupt_fired(&mut self, word: WordId) {
        self.fired += 1;
        info!(%word, total = self.fired, "Interrupt word fired");
    }

    fn on_samples_ready(&mut self, records: &[SampleRecord]) {
        for record in records {
            debug!(%record, raw = record.raw(), "Sample");
            self.latest.insert(record.sensor(), record.magnitude());
        }
        self.samples += records.len() as u64;
    }
}
