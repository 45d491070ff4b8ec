//! Packed atomic state register for rundown bookkeeping.
//!
//! [`RundownState`] folds the outstanding-acquisition count and the
//! "rundown active" flag into a single `AtomicU32`: the low 31 bits hold
//! the count, bit 31 holds the flag. Every transition is a
//! compare-and-exchange retry loop, so no two concurrent mutations can
//! observe the same prior value and both commit, and the register is the
//! sole source of truth for admission decisions.
//!
//! The flag transition is monotonic: nothing ever clears it.

use std::sync::atomic::{AtomicU32, Ordering};

/// Bit 31: set once rundown has begun, never cleared.
const RUNDOWN_ACTIVE: u32 = 1 << 31;

/// Low 31 bits: the outstanding-acquisition count.
const COUNT_MASK: u32 = RUNDOWN_ACTIVE - 1;

/// Maximum number of concurrently outstanding acquisitions (2^31 - 1).
///
/// Behavior beyond this bound is unspecified; debug builds assert.
pub const MAX_OUTSTANDING: u32 = COUNT_MASK;

/// Outcome of [`RundownState::begin_rundown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RundownTransition {
    /// This caller won the flag transition. `outstanding` is the count
    /// observed at the instant the flag was set; if zero, the register is
    /// already quiescent.
    Initiated {
        /// Acquisitions still outstanding at the moment of transition.
        outstanding: u32,
    },
    /// Another caller has already set the flag (or fully completed rundown).
    AlreadyActive,
}

/// The packed count-plus-flag register.
///
/// This is the lock-free core of the crate; [`crate::RundownGuard`] layers
/// the broadcast events on top. Exposed for direct use in tests and for
/// callers that want the bare state machine without any blocking surface.
#[derive(Debug)]
pub struct RundownState {
    register: AtomicU32,
}

impl RundownState {
    /// Creates a register with a zero count and the flag clear.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            register: AtomicU32::new(0),
        }
    }

    /// Attempts to register one acquisition.
    ///
    /// Returns `false` with no side effect if rundown is active. Retries
    /// the increment on contention; never blocks.
    pub fn try_acquire(&self) -> bool {
        loop {
            let val = self.register.load(Ordering::SeqCst);
            if val & RUNDOWN_ACTIVE != 0 {
                return false;
            }
            debug_assert!(
                val & COUNT_MASK < MAX_OUTSTANDING,
                "acquisition count saturated"
            );
            if self
                .register
                .compare_exchange(val, val + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Unregisters one acquisition, preserving the flag bit.
    ///
    /// Returns `true` iff this release drained the register: the committed
    /// value is exactly "flag set, count zero". Exactly one release per
    /// rundown can report that, because the decrement commits atomically.
    ///
    /// Caller contract: must match a prior successful [`Self::try_acquire`].
    /// An unmatched release trips a debug assertion; in release builds the
    /// count is left undefined.
    pub fn release(&self) -> bool {
        loop {
            let val = self.register.load(Ordering::SeqCst);
            debug_assert!(val & COUNT_MASK != 0, "release without a matching acquire");
            let new = (val & RUNDOWN_ACTIVE) | ((val & COUNT_MASK).wrapping_sub(1) & COUNT_MASK);
            if self
                .register
                .compare_exchange(val, new, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return new == RUNDOWN_ACTIVE;
            }
        }
    }

    /// Attempts the one-time false-to-true flag transition.
    ///
    /// Exactly one caller over the lifetime of the register observes
    /// [`RundownTransition::Initiated`]; every later (or racing-and-losing)
    /// caller gets [`RundownTransition::AlreadyActive`]. Never blocks.
    pub fn begin_rundown(&self) -> RundownTransition {
        loop {
            let val = self.register.load(Ordering::SeqCst);
            if val & RUNDOWN_ACTIVE != 0 {
                return RundownTransition::AlreadyActive;
            }
            if self
                .register
                .compare_exchange(
                    val,
                    val | RUNDOWN_ACTIVE,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                return RundownTransition::Initiated {
                    outstanding: val & COUNT_MASK,
                };
            }
        }
    }

    /// Returns true iff the rundown flag is set.
    #[must_use]
    pub fn is_rundown_active(&self) -> bool {
        self.register.load(Ordering::SeqCst) & RUNDOWN_ACTIVE != 0
    }

    /// Returns the current outstanding-acquisition count.
    #[must_use]
    pub fn outstanding(&self) -> u32 {
        self.register.load(Ordering::SeqCst) & COUNT_MASK
    }
}

impl Default for RundownState {
    fn default() -> Self {
        Self::new()
    }
}
