//! Bridge statistics shared between producer threads and the interpreter.
//!
//! Every counter is a relaxed atomic on its own cache line: the tick
//! source, each sensor callback and the interpreter thread update
//! disjoint counters without contending on a lock or on a shared line.

use crossbeam_utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free event counters for one bridge instance.
#[derive(Debug, Default)]
pub struct BridgeStats {
    ticks: CachePadded<AtomicU64>,
    deferred_ticks: CachePadded<AtomicU64>,
    interrupts_fired: CachePadded<AtomicU64>,
    samples_pushed: CachePadded<AtomicU64>,
    samples_dropped: CachePadded<AtomicU64>,
    samples_drained: CachePadded<AtomicU64>,
    cycles: CachePadded<AtomicU64>,
    last_cycle_ns: CachePadded<AtomicU64>,
}

impl BridgeStats {
    /// Create zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tick; `deferred` when the registry was busy.
    #[inline]
    pub fn record_tick(&self, deferred: bool) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if deferred {
            self.deferred_ticks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record interrupt words fired by one service pass.
    #[inline]
    pub fn record_fired(&self, count: usize) {
        self.interrupts_fired
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a sample offered to the queue, whether or not it was kept.
    ///
    /// Returns the total number of pushes so far.
    #[inline]
    pub fn record_push(&self) -> u64 {
        self.samples_pushed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a sample lost to the overflow policy.
    ///
    /// Returns the total number of drops so far.
    #[inline]
    pub fn record_drop(&self) -> u64 {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record queued samples discarded without reaching the interpreter.
    pub fn record_discarded(&self, count: usize) {
        self.samples_dropped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record samples removed by a drain.
    #[inline]
    pub fn record_drained(&self, count: usize) {
        self.samples_drained
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a completed interpreter cycle.
    pub fn record_cycle(&self, execution_time: Duration) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_ns.store(
            u64::try_from(execution_time.as_nanos()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }

    /// Total ticks received.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Total interrupt words fired.
    #[must_use]
    pub fn interrupts_fired(&self) -> u64 {
        self.interrupts_fired.load(Ordering::Relaxed)
    }

    /// Total samples lost to the overflow policy or discarded on teardown.
    #[must_use]
    pub fn samples_dropped(&self) -> u64 {
        self.samples_dropped.load(Ordering::Relaxed)
    }

    /// Total interpreter cycles.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Take a point-in-time snapshot for reporting.
    ///
    /// Counters are read individually, so a snapshot taken while producers
    /// are active is not a single consistent cut.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let last_ns = self.last_cycle_ns.load(Ordering::Relaxed);
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            deferred_ticks: self.deferred_ticks.load(Ordering::Relaxed),
            interrupts_fired: self.interrupts_fired.load(Ordering::Relaxed),
            samples_pushed: self.samples_pushed.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            samples_drained: self.samples_drained.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            last_cycle_ns: (last_ns > 0).then_some(last_ns),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.ticks,
            &self.deferred_ticks,
            &self.interrupts_fired,
            &self.samples_pushed,
            &self.samples_dropped,
            &self.samples_drained,
            &self.cycles,
            &self.last_cycle_ns,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Immutable snapshot of bridge statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Ticks received from the tick source.
    pub ticks: u64,
    /// Ticks that found the registry busy and were applied later.
    pub deferred_ticks: u64,
    /// Interrupt words fired.
    pub interrupts_fired: u64,
    /// Samples offered to the queue.
    pub samples_pushed: u64,
    /// Samples lost to the overflow policy or discarded on teardown.
    pub samples_dropped: u64,
    /// Samples handed to the interpreter.
    pub samples_drained: u64,
    /// Interpreter cycles completed.
    pub cycles: u64,
    /// Duration of the last cycle in nanoseconds.
    pub last_cycle_ns: Option<u64>,
}

impl StatsSnapshot {
    /// Samples pushed but neither drained nor dropped.
    #[must_use]
    pub fn samples_pending(&self) -> u64 {
        self.samples_pushed
            .saturating_sub(self.samples_drained)
            .saturating_sub(self.samples_dropped)
    }
}
