//! Periodic tick source thread.
//!
//! Stands in for the host's hardware timer: calls [`TickHandle::tick`] once
//! per base period until stopped.

use bridge_core::TickHandle;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct TickerState {
    stop_requested: AtomicBool,
    ticks_sent: AtomicU64,
}

/// Tick source driving a bridge's interrupt registry.
#[derive(Debug)]
pub struct Ticker {
    state: Arc<TickerState>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn the tick thread.
    pub fn start(ticks: TickHandle, period: Duration) -> std::io::Result<Self> {
        let state = Arc::new(TickerState::default());
        let thread_state = Arc::clone(&state);

        info!(period_ms = period.as_millis(), "Starting tick source");

        let handle = thread::Builder::new()
            .name("bridge-ticker".into())
            .spawn(move || {
                debug!("Tick thread started");
                let mut next = Instant::now() + period;

                while !thread_state.stop_requested.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    }
                    if thread_state.stop_requested.load(Ordering::Acquire) {
                        break;
                    }

                    ticks.tick();
                    thread_state.ticks_sent.fetch_add(1, Ordering::Relaxed);

                    next += period;
                    let now = Instant::now();
                    if next < now {
                        // Ticks are counts, not deadlines: skip the backlog
                        next = now + period;
                    }
                }

                debug!("Tick thread stopped");
            })?;

        Ok(Self {
            state,
            handle: Some(handle),
        })
    }

    /// Ticks delivered so far.
    pub fn ticks_sent(&self) -> u64 {
        self.state.ticks_sent.load(Ordering::Relaxed)
    }

    /// Stop the tick thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.state.stop_requested.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Tick thread panicked");
            }
            info!(ticks = self.ticks_sent(), "Tick source stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
