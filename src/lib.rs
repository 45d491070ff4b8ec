//! Rundown protection: graceful-shutdown coordination for a shared resource.
//!
//! # Overview
//!
//! A [`RundownGuard`] sits in front of a shared resource that must be torn
//! down cleanly while arbitrarily many threads are still using it. Users of
//! the resource bracket their access with [`RundownGuard::acquire`] and
//! [`RundownGuard::release`]; a shutdown initiator calls
//! [`RundownGuard::wait`], which refuses all further acquisitions and blocks
//! until every outstanding one has been released.
//!
//! # Core Guarantees
//!
//! - **Admission cutoff**: once rundown begins, no acquire ever succeeds again
//! - **Drain before return**: `wait` returns only after the outstanding count
//!   reaches zero; concurrent and repeated `wait` calls are all safe
//! - **Single broadcast**: the shutdown signal fires exactly once and is
//!   observable by any number of independent consumers, before or after the fact
//! - **Lock-free bookkeeping**: acquire and release never block; all state
//!   lives in one atomic word mutated by compare-and-exchange
//! - **Single-use**: a guard that has run down stays permanently closed
//!
//! # Cancellation Token
//!
//! The guard doubles as a generic cancellation token through the
//! [`CancelToken`] trait: a non-blocking canceled query plus a broadcast
//! [`Signal`] handle, with no deadline and no key/value context. Code that
//! only needs to observe shutdown never has to know about acquire/release.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rundown_protection::RundownGuard;
//!
//! let guard = Arc::new(RundownGuard::new());
//!
//! // A worker registers use of the resource.
//! let worker = {
//!     let guard = Arc::clone(&guard);
//!     std::thread::spawn(move || {
//!         if guard.acquire() {
//!             // ... touch the shared resource ...
//!             guard.release();
//!         }
//!     })
//! };
//!
//! // Shut down: no new admissions, drain the rest.
//! guard.wait();
//! assert!(!guard.acquire());
//! worker.join().unwrap();
//! ```
//!
//! # Module Structure
//!
//! - [`state`]: the packed atomic register (count + rundown flag)
//! - [`event`]: fire-once broadcast event and [`Signal`] handles
//! - [`rundown`]: the guard, RAII permits, and the wait protocol
//! - [`token`]: the generic cancellation-token capability trait

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]

pub mod event;
pub mod rundown;
pub mod state;
pub mod token;

#[cfg(test)]
pub(crate) mod test_utils;

pub use event::{EventListener, OnceEvent, Signal};
pub use rundown::{AcquireError, OwnedRundownPermit, RundownGuard, RundownPermit};
pub use state::{RundownState, RundownTransition, MAX_OUTSTANDING};
pub use token::CancelToken;
