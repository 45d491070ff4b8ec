//! Generic cancellation-token capability trait.
//!
//! [`CancelToken`] is the minimal capability set a shutdown observer
//! needs: a non-blocking canceled query and a broadcast signal handle,
//! plus deadline and key/value accessors for compatibility with richer
//! token shapes. [`RundownGuard`] implements it, so the guard can be
//! handed to any code written against the trait without that code ever
//! learning about acquire/release.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use crate::event::Signal;
use crate::rundown::RundownGuard;

/// Read-only view of an in-progress (or not) cancellation.
pub trait CancelToken {
    /// Returns true iff cancellation has been requested. Never blocks.
    fn is_canceled(&self) -> bool;

    /// Returns a handle that becomes observably fired when cancellation
    /// is requested. Supports any number of independent observers;
    /// observing after the fact completes immediately.
    fn signal(&self) -> Signal;

    /// Returns the instant at which work should be abandoned, if the
    /// token carries one. The default token has no time-based expiry.
    fn deadline(&self) -> Option<Instant> {
        None
    }

    /// Returns the auxiliary value associated with `key`, if the token
    /// carries one. The default token carries no key/value context.
    fn value(&self, key: &dyn Any) -> Option<Arc<dyn Any + Send + Sync>> {
        let _ = key;
        None
    }
}

impl CancelToken for RundownGuard {
    fn is_canceled(&self) -> bool {
        Self::is_canceled(self)
    }

    fn signal(&self) -> Signal {
        Self::signal(self)
    }
}
