//! Bounded FIFO between sensor callback threads and the interpreter.
//!
//! # Threading Model
//!
//! - **Sensor callback threads** (any number, not owned by the bridge):
//!   push through a [`SampleSink`]. A push is lock-free and never waits.
//! - **Interpreter thread**: drains once per cycle with
//!   [`SampleQueue::drain_into`] or [`SampleQueue::drain_all`].
//!
//! The queue is bounded. When it is full the configured
//! [`OverflowPolicy`] decides which record is lost; with `DropOldest` the
//! interpreter always sees the most recent readings, which matters more
//! than completeness for a sensor stream.

use crate::sample::{SampleEncoder, SampleRecord};
use bridge_common::{BridgeError, BridgeResult, BridgeStats, OverflowPolicy, SampleConfig, SensorType};
use crossbeam_queue::ArrayQueue;
use std::sync::Arc;
use tracing::warn;

/// What happened to a pushed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended with room to spare.
    Queued,
    /// Appended after evicting the oldest queued record.
    DroppedOldest,
    /// Discarded because the queue was full.
    Rejected,
}

impl PushOutcome {
    /// Whether a record was lost by this push.
    #[must_use]
    pub fn lost_record(self) -> bool {
        !matches!(self, Self::Queued)
    }
}

/// Bounded multi-producer FIFO of sample records.
#[derive(Debug)]
pub struct SampleQueue {
    records: ArrayQueue<SampleRecord>,
    policy: OverflowPolicy,
}

impl SampleQueue {
    /// Create a queue holding at most `capacity` undrained records.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if `capacity` is zero.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> BridgeResult<Self> {
        if capacity == 0 {
            return Err(BridgeError::Config(
                "sample queue capacity must be non-zero".into(),
            ));
        }
        Ok(Self {
            records: ArrayQueue::new(capacity),
            policy,
        })
    }

    /// Create a queue from the `[samples]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the capacity is zero.
    pub fn from_config(config: &SampleConfig) -> BridgeResult<Self> {
        Self::new(config.capacity, config.overflow)
    }

    /// Append a record without blocking.
    pub fn push(&self, record: SampleRecord) -> PushOutcome {
        match self.policy {
            OverflowPolicy::DropOldest => match self.records.force_push(record) {
                None => PushOutcome::Queued,
                Some(_evicted) => PushOutcome::DroppedOldest,
            },
            OverflowPolicy::RejectNewest => match self.records.push(record) {
                Ok(()) => PushOutcome::Queued,
                Err(_rejected) => PushOutcome::Rejected,
            },
        }
    }

    /// Move queued records onto the end of `out`, oldest first.
    ///
    /// Takes at most the records present when the drain starts, so a
    /// producer pushing faster than the interpreter drains cannot keep the
    /// interpreter here forever. Returns the number of records moved.
    pub fn drain_into(&self, out: &mut Vec<SampleRecord>) -> usize {
        let available = self.records.len();
        out.reserve(available);
        let mut moved = 0;
        while moved < available {
            match self.records.pop() {
                Some(record) => {
                    out.push(record);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    /// Remove and return all queued records, oldest first.
    ///
    /// Returns an empty vector when nothing is queued.
    #[must_use]
    pub fn drain_all(&self) -> Vec<SampleRecord> {
        let mut out = Vec::new();
        self.drain_into(&mut out);
        out
    }

    /// Discard all queued records; returns how many were discarded.
    pub fn clear(&self) -> usize {
        let mut discarded = 0;
        while self.records.pop().is_some() {
            discarded += 1;
        }
        discarded
    }

    /// Records currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of undrained records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// Policy applied on overflow.
    #[must_use]
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

/// Producer handle handed to host sensor callbacks.
///
/// Cheap to clone; every clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct SampleSink {
    queue: Arc<SampleQueue>,
    encoder: SampleEncoder,
    stats: Arc<BridgeStats>,
}

impl SampleSink {
    /// Create a sink feeding `queue`.
    #[must_use]
    pub fn new(queue: Arc<SampleQueue>, encoder: SampleEncoder, stats: Arc<BridgeStats>) -> Self {
        Self {
            queue,
            encoder,
            stats,
        }
    }

    /// Encode a raw reading and push it.
    pub fn deliver(&self, sensor: SensorType, raw: f32) -> PushOutcome {
        self.push(self.encoder.encode(sensor, raw))
    }

    /// Push an already encoded record.
    pub fn push(&self, record: SampleRecord) -> PushOutcome {
        let outcome = self.queue.push(record);
        self.stats.record_push();
        if outcome.lost_record() {
            let dropped = self.stats.record_drop();
            if dropped == 1 || dropped % 1024 == 0 {
                warn!(
                    dropped,
                    capacity = self.queue.capacity(),
                    policy = %self.queue.policy(),
                    "Sample queue full, records lost"
                );
            }
        }
        outcome
    }

    /// Encoder used by [`deliver`](Self::deliver).
    #[must_use]
    pub fn encoder(&self) -> SampleEncoder {
        self.encoder
    }
}
