//! Periodic interrupt registry and dispatcher.
//!
//! The interpreter registers interrupt service words with individual
//! periods; a coarser tick source advances every registered counter and the
//! interpreter's cycle fires whatever is due.
//!
//! # Threading Model
//!
//! - **Tick source thread**: calls [`InterruptRegistry::tick`]. Never blocks.
//! - **Interpreter thread**: calls [`InterruptRegistry::set_period`],
//!   [`InterruptRegistry::service`] and [`InterruptRegistry::set_base_period`].
//!
//! # Lock Granularity
//!
//! One registry-wide mutex guards the entry list, the counters and the base
//! period. It is held only for counter increments, counter resets and list
//! edits, never while an interpreter word runs. A per-entry atomic would let
//! ticks skip the lock entirely, but an upsert or removal would still need
//! the list lock, and a single lock keeps "reset exactly what was found due"
//! trivially correct.
//!
//! `tick()` only *tries* the lock. When the interpreter holds it, the tick is
//! parked in an atomic pending count and folded into every counter by the
//! next critical section, whoever runs it. Ticks are delayed, never lost.

use crate::interpreter::Interpreter;
use bridge_common::{BridgeError, BridgeResult, WordId};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;
use tracing::{debug, trace};

/// Convert a requested wall-clock period into base ticks.
///
/// Returns `None` for a zero request (deregistration). Otherwise the period
/// is `requested / base` rounded toward zero, but at least one tick.
#[must_use]
pub fn period_ticks(requested: Duration, base: Duration) -> Option<u64> {
    if requested.is_zero() {
        return None;
    }
    let ticks = requested
        .as_nanos()
        .checked_div(base.as_nanos())
        .unwrap_or(1);
    Some(u64::try_from(ticks).unwrap_or(u64::MAX).max(1))
}

/// Result of delivering one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Counters were advanced immediately.
    Applied,
    /// The registry was busy; the tick is pending and will be applied by the
    /// next critical section.
    Deferred,
}

/// Point-in-time view of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsrEntry {
    /// Interpreter word to fire.
    pub word: WordId,
    /// Base ticks between firings.
    pub period_ticks: u64,
    /// Ticks accumulated since the last firing.
    pub counter: u64,
}

#[derive(Debug)]
struct RegistryInner {
    base_period: Duration,
    /// Registration order is firing order.
    entries: Vec<IsrEntry>,
}

impl RegistryInner {
    fn advance(&mut self, ticks: u64) {
        for entry in &mut self.entries {
            entry.counter = entry.counter.saturating_add(ticks);
        }
    }

    fn position(&self, word: WordId) -> Option<usize> {
        self.entries.iter().position(|e| e.word == word)
    }
}

/// Registry of interrupt service words and their tick counters.
#[derive(Debug)]
pub struct InterruptRegistry {
    inner: Mutex<RegistryInner>,
    /// Ticks that arrived while the lock was held elsewhere.
    pending: CachePadded<AtomicU64>,
}

impl InterruptRegistry {
    /// Create an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidPeriod`] if `base_period` is zero.
    pub fn new(base_period: Duration) -> BridgeResult<Self> {
        check_base_period(base_period)?;
        Ok(Self {
            inner: Mutex::new(RegistryInner {
                base_period,
                entries: Vec::new(),
            }),
            pending: CachePadded::new(AtomicU64::new(0)),
        })
    }

    /// Lock the registry and apply any parked ticks.
    ///
    /// A panic while holding the lock cannot leave the entry list in a torn
    /// state (every mutation is a single field store or `Vec` operation), so
    /// poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        self.fold_pending(&mut inner, 0);
        inner
    }

    fn fold_pending(&self, inner: &mut RegistryInner, extra: u64) {
        let ticks = self.pending.swap(0, Ordering::AcqRel).saturating_add(extra);
        if ticks > 0 {
            inner.advance(ticks);
        }
    }

    /// Advance every registered counter by one base tick.
    ///
    /// Safe to call from any thread; never blocks.
    #[inline]
    pub fn tick(&self) -> TickOutcome {
        match self.inner.try_lock() {
            Ok(mut inner) => {
                self.fold_pending(&mut inner, 1);
                TickOutcome::Applied
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                self.fold_pending(&mut poisoned.into_inner(), 1);
                TickOutcome::Applied
            }
            Err(TryLockError::WouldBlock) => {
                self.pending.fetch_add(1, Ordering::AcqRel);
                TickOutcome::Deferred
            }
        }
    }

    /// Register, re-register or remove an interrupt word.
    ///
    /// A zero `period` removes `word` (a no-op if it is not registered).
    /// Otherwise the period is converted against the current base period;
    /// an existing registration keeps its firing position but takes the new
    /// period and restarts its counter from zero.
    pub fn set_period(&self, word: WordId, period: Duration) {
        let mut inner = self.lock();
        let existing = inner.position(word);

        match (period_ticks(period, inner.base_period), existing) {
            (None, Some(idx)) => {
                inner.entries.remove(idx);
                debug!(%word, "Interrupt word removed");
            }
            (None, None) => {
                trace!(%word, "Removal of unregistered interrupt word ignored");
            }
            (Some(ticks), Some(idx)) => {
                let entry = &mut inner.entries[idx];
                entry.period_ticks = ticks;
                entry.counter = 0;
                debug!(%word, period_ticks = ticks, "Interrupt word re-registered");
            }
            (Some(ticks), None) => {
                inner.entries.push(IsrEntry {
                    word,
                    period_ticks: ticks,
                    counter: 0,
                });
                debug!(
                    %word,
                    period_ticks = ticks,
                    requested_ms = period.as_millis(),
                    "Interrupt word registered"
                );
            }
        }
    }

    /// Current base tick period.
    #[must_use]
    pub fn base_period(&self) -> Duration {
        self.lock().base_period
    }

    /// Change the base tick period.
    ///
    /// Existing registrations keep their tick counts; only later
    /// [`set_period`](Self::set_period) calls use the new base. Re-register
    /// words to rescale them.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidPeriod`] if `base_period` is zero.
    pub fn set_base_period(&self, base_period: Duration) -> BridgeResult<()> {
        check_base_period(base_period)?;
        let mut inner = self.lock();
        debug!(
            old_us = inner.base_period.as_micros(),
            new_us = base_period.as_micros(),
            registered = inner.entries.len(),
            "Base tick period changed"
        );
        inner.base_period = base_period;
        Ok(())
    }

    /// Move every due word into `due`, in registration order, and restart
    /// its counter.
    ///
    /// `due` is cleared first. Returns the number of due words. The caller
    /// fires them after the registry lock has been released.
    pub fn collect_due(&self, due: &mut Vec<WordId>) -> usize {
        due.clear();
        let mut inner = self.lock();
        for entry in &mut inner.entries {
            if entry.counter >= entry.period_ticks {
                entry.counter = 0;
                due.push(entry.word);
            }
        }
        due.len()
    }

    /// Fire every due word on `interpreter` and restart its counter.
    ///
    /// Each due word fires once per call regardless of how many periods
    /// elapsed since the last call. Returns the number of words fired.
    pub fn service<I: Interpreter + ?Sized>(&self, interpreter: &mut I) -> usize {
        let mut due = Vec::new();
        self.collect_due(&mut due);
        fire_all(&due, interpreter)
    }

    /// Snapshot of all registrations in firing order.
    #[must_use]
    pub fn entries(&self) -> Vec<IsrEntry> {
        self.lock().entries.clone()
    }

    /// Registration for `word`, if any.
    #[must_use]
    pub fn entry(&self, word: WordId) -> Option<IsrEntry> {
        let inner = self.lock();
        inner.position(word).map(|idx| inner.entries[idx])
    }

    /// Number of registered words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no word is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every registration and discard parked ticks.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        debug!(removed, "Interrupt registry cleared");
    }
}

/// Fire `words` in order; returns how many were fired.
pub(crate) fn fire_all<I: Interpreter + ?Sized>(words: &[WordId], interpreter: &mut I) -> usize {
    for &word in words {
        trace!(%word, "Firing interrupt word");
        interpreter.on_interrupt_fired(word);
    }
    words.len()
}

fn check_base_period(base_period: Duration) -> BridgeResult<()> {
    if base_period.is_zero() {
        return Err(BridgeError::InvalidPeriod(
            "base tick period must be non-zero".into(),
        ));
    }
    Ok(())
}
