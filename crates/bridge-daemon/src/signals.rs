//! Signal handling for graceful daemon shutdown.
//!
//! SIGINT and SIGTERM set an async-signal-safe atomic; the main loop polls
//! it once per interpreter cycle through [`SignalHandler`].

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Set by the signal handler. Only atomics are touched there.
static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);
static LAST_SIGNAL: AtomicI32 = AtomicI32::new(0);
static SIGNAL_COUNT: AtomicU32 = AtomicU32::new(0);

/// Signals the daemon handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SIGTERM - termination request.
    Terminate,
    /// SIGINT - Ctrl+C.
    Interrupt,
}

impl SignalKind {
    fn from_raw(signum: i32) -> Option<Self> {
        #[cfg(unix)]
        {
            match signum {
                libc::SIGTERM => Some(Self::Terminate),
                libc::SIGINT => Some(Self::Interrupt),
                _ => None,
            }
        }
        #[cfg(not(unix))]
        {
            let _ = signum;
            None
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Terminate => write!(f, "SIGTERM"),
            SignalKind::Interrupt => write!(f, "SIGINT"),
        }
    }
}

/// Shutdown flag shared between the main loop and anyone who may stop it.
#[derive(Debug, Default)]
pub struct SignalState {
    shutdown_requested: AtomicBool,
}

impl SignalState {
    /// Create a state with no shutdown requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown has been requested, by signal or manually.
    #[inline]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Relaxed)
            || SIGNAL_RECEIVED.load(Ordering::Relaxed)
    }

    /// Request shutdown from any thread.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Relaxed);
    }

    /// Total signals received by this process.
    pub fn signal_count(&self) -> u32 {
        SIGNAL_COUNT.load(Ordering::Relaxed)
    }

    /// The most recent handled signal, if any.
    pub fn last_signal(&self) -> Option<SignalKind> {
        SignalKind::from_raw(LAST_SIGNAL.load(Ordering::Relaxed))
    }
}

/// Cloneable handle to the daemon's shutdown state.
#[derive(Debug, Clone)]
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    /// Create a handler and install the process signal handlers.
    ///
    /// On non-Unix platforms only manual shutdown is available.
    pub fn new() -> std::io::Result<Self> {
        let handler = Self {
            state: Arc::new(SignalState::new()),
        };

        #[cfg(unix)]
        install_unix_handlers()?;

        Ok(handler)
    }

    /// Check if shutdown has been requested.
    #[inline]
    pub fn shutdown_requested(&self) -> bool {
        self.state.shutdown_requested()
    }

    /// Manually request shutdown.
    pub fn request_shutdown(&self) {
        info!("Manual shutdown requested");
        self.state.request_shutdown();
    }

    /// Shared state for inspection.
    pub fn state(&self) -> &SignalState {
        &self.state
    }
}

#[cfg(unix)]
fn install_unix_handlers() -> std::io::Result<()> {
    use std::os::raw::c_int;

    extern "C" fn on_shutdown_signal(signum: c_int) {
        LAST_SIGNAL.store(signum, Ordering::Relaxed);
        SIGNAL_COUNT.fetch_add(1, Ordering::Relaxed);
        SIGNAL_RECEIVED.store(true, Ordering::Relaxed);
    }

    for signum in [libc::SIGTERM, libc::SIGINT] {
        let handler = on_shutdown_signal as extern "C" fn(c_int) as libc::sighandler_t;
        // SAFETY: the handler only stores to atomics, which is async-signal-safe
        let previous = unsafe { libc::signal(signum, handler) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error());
        }
    }

    debug!("Unix signal handlers registered");
    Ok(())
}
