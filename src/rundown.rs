//! The rundown guard: admission control plus the drain-and-close protocol.
//!
//! A [`RundownGuard`] combines the packed atomic register with two
//! fire-once broadcast events: the shutdown signal (the cancellation
//! broadcast, fired when rundown begins) and the drained signal (fired when
//! the outstanding count reaches zero under rundown). [`RundownGuard::wait`]
//! blocks on the latter, so it returns only once every acquisition granted
//! before the cutoff has been released.
//!
//! # Caller discipline
//!
//! `wait` must not be called while holding a lock that an outstanding
//! acquirer needs in order to call [`RundownGuard::release`]; doing so
//! deadlocks. That hazard is outside the primitive's control.

use std::fmt;
use std::sync::Arc;

use crate::event::{OnceEvent, Signal};
use crate::state::{RundownState, RundownTransition};

/// Error returned when an RAII acquisition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    /// Rundown has begun; no further acquisitions are admitted.
    RundownInProgress,
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RundownInProgress => write!(f, "rundown in progress"),
        }
    }
}

impl std::error::Error for AcquireError {}

/// Coordinates graceful shutdown of a shared resource.
///
/// See the [crate documentation](crate) for the protocol overview. The
/// guard is single-use: once [`Self::wait`] has completed, it stays
/// permanently closed and every further acquisition is refused.
#[derive(Debug)]
pub struct RundownGuard {
    state: RundownState,
    /// Fired exactly once, when rundown begins (the cancellation broadcast).
    shutdown: Arc<OnceEvent>,
    /// Fired exactly once, when the count reaches zero under rundown.
    drained: Arc<OnceEvent>,
}

impl RundownGuard {
    /// Creates a fresh guard: zero outstanding acquisitions, not run down.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RundownState::new(),
            shutdown: Arc::new(OnceEvent::new()),
            drained: Arc::new(OnceEvent::new()),
        }
    }

    /// Registers one use of the protected resource.
    ///
    /// Returns `false` if rundown is in progress, in which case the caller
    /// must not touch the resource and must not call [`Self::release`].
    /// Lock-free; retries on contention but never blocks.
    pub fn acquire(&self) -> bool {
        self.state.try_acquire()
    }

    /// Unregisters one use of the protected resource.
    ///
    /// Caller contract: matched to a prior [`Self::acquire`] that returned
    /// `true`. If this release is the last one outstanding under rundown,
    /// it completes the drain and unblocks every [`Self::wait`] caller.
    /// Never blocks.
    pub fn release(&self) {
        if self.state.release() {
            tracing::trace!("last acquisition released, rundown drained");
            self.drained.fire();
        }
    }

    /// Acquires with an RAII permit that releases on drop.
    pub fn try_acquire(&self) -> Result<RundownPermit<'_>, AcquireError> {
        if self.acquire() {
            Ok(RundownPermit { guard: self })
        } else {
            Err(AcquireError::RundownInProgress)
        }
    }

    /// Acquires an owned RAII permit that keeps the guard alive.
    pub fn try_acquire_owned(self: &Arc<Self>) -> Result<OwnedRundownPermit, AcquireError> {
        if self.acquire() {
            Ok(OwnedRundownPermit {
                guard: Arc::clone(self),
            })
        } else {
            Err(AcquireError::RundownInProgress)
        }
    }

    /// Begins rundown (if not already begun) and blocks until every
    /// outstanding acquisition has been released.
    ///
    /// Exactly one caller wins the flag transition and fires the shutdown
    /// signal; every other concurrent or later caller simply waits for the
    /// drain to complete. Calling again after completion is a no-op that
    /// returns immediately.
    pub fn wait(&self) {
        match self.state.begin_rundown() {
            RundownTransition::Initiated { outstanding } => {
                tracing::debug!(outstanding, "rundown initiated");
                self.shutdown.fire();
                if outstanding == 0 {
                    self.drained.fire();
                } else {
                    self.drained.wait();
                }
                tracing::trace!("rundown complete");
            }
            RundownTransition::AlreadyActive => {
                // Another caller is driving (or has completed) the
                // shutdown; observe the drain without re-firing anything.
                self.drained.wait();
            }
        }
    }

    /// Returns true iff rundown has begun. Never blocks.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.state.is_rundown_active()
    }

    /// Returns the current outstanding-acquisition count.
    ///
    /// A snapshot for diagnostics and tests; it may be stale by the time
    /// the caller inspects it.
    #[must_use]
    pub fn outstanding(&self) -> u32 {
        self.state.outstanding()
    }

    /// Returns an owned handle to the shutdown broadcast.
    ///
    /// The handle (and its clones) observes the signal fired by the
    /// winning [`Self::wait`] caller, including observers that start
    /// watching after the fact.
    #[must_use]
    pub fn signal(&self) -> Signal {
        Signal::new(Arc::clone(&self.shutdown))
    }
}

impl Default for RundownGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII witness of one acquisition, borrowed from a [`RundownGuard`].
///
/// Dropping the permit releases the acquisition exactly once.
#[must_use = "permit is released immediately if not held"]
#[derive(Debug)]
pub struct RundownPermit<'a> {
    guard: &'a RundownGuard,
}

impl Drop for RundownPermit<'_> {
    fn drop(&mut self) {
        self.guard.release();
    }
}

/// RAII witness of one acquisition, holding the guard by `Arc`.
///
/// Useful when the acquisition must move to another thread or task.
#[must_use = "permit is released immediately if not held"]
#[derive(Debug)]
pub struct OwnedRundownPermit {
    guard: Arc<RundownGuard>,
}

impl Drop for OwnedRundownPermit {
    fn drop(&mut self) {
        self.guard.release();
    }
}
