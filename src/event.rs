//! Fire-once broadcast event.
//!
//! [`OnceEvent`] transitions from unfired to fired exactly once and is
//! observable by arbitrarily many independent waiters, before or after the
//! fact. Three observation surfaces are provided:
//!
//! - [`OnceEvent::is_fired`]: non-blocking poll
//! - [`OnceEvent::wait`]: blocks the calling thread
//! - [`OnceEvent::listen`]: a future for async consumers
//!
//! # Cancel Safety
//!
//! - `listen()`: cancel-safe, a dropped listener is removed from the slab
//! - `fire()`: idempotent, the first caller wins and wakes everyone

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex as StdMutex};
use std::task::{Context, Poll, Waker};

/// A broadcast event that fires at most once.
///
/// Blocking waiters park on a condition variable; async listeners register
/// wakers in a slab that reuses freed slots, so repeatedly cancelled
/// listeners cause no unbounded growth.
#[derive(Debug)]
pub struct OnceEvent {
    /// Fast-path fired flag; authoritative copy lives in `inner`.
    fired: AtomicBool,
    /// Fired flag plus async waiters (protected by mutex).
    inner: StdMutex<EventState>,
    /// Wakes blocking waiters.
    cv: Condvar,
}

#[derive(Debug)]
struct EventState {
    fired: bool,
    listeners: ListenerSlab,
}

/// Slab-like waker storage that reuses freed slots to prevent unbounded
/// Vec growth when cancelled listeners leave holes in the middle.
#[derive(Debug)]
struct ListenerSlab {
    entries: Vec<Option<Waker>>,
    free_slots: Vec<usize>,
}

impl ListenerSlab {
    const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_slots: Vec::new(),
        }
    }

    /// Insert a waker, reusing a free slot if available.
    fn insert(&mut self, waker: Waker) -> usize {
        if let Some(index) = self.free_slots.pop() {
            self.entries[index] = Some(waker);
            index
        } else {
            let index = self.entries.len();
            self.entries.push(Some(waker));
            index
        }
    }

    /// Replace the waker in an occupied slot.
    fn update(&mut self, index: usize, waker: Waker) {
        if index < self.entries.len() {
            self.entries[index] = Some(waker);
        }
    }

    /// Vacate a slot, returning it to the free list.
    fn remove(&mut self, index: usize) {
        if index < self.entries.len() {
            self.entries[index] = None;
            self.free_slots.push(index);
        }

        // Shrink from the end: pop slots that are vacant and at the tail.
        while self.entries.last().is_some_and(Option::is_none) {
            let tail_idx = self.entries.len() - 1;
            self.entries.pop();
            if let Some(pos) = self.free_slots.iter().position(|&i| i == tail_idx) {
                self.free_slots.swap_remove(pos);
            }
        }
    }

    /// Take every registered waker and empty the slab.
    fn drain(&mut self) -> Vec<Waker> {
        self.free_slots.clear();
        self.entries.drain(..).flatten().collect()
    }

    /// Count occupied slots.
    fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

impl OnceEvent {
    /// Creates a new event in the unfired state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            inner: StdMutex::new(EventState {
                fired: false,
                listeners: ListenerSlab::new(),
            }),
            cv: Condvar::new(),
        }
    }

    /// Returns true iff the event has fired. Never blocks.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Fires the event, waking every current blocking and async waiter.
    ///
    /// Idempotent: the first caller wins and returns `true`; all later
    /// calls are no-ops returning `false`.
    pub fn fire(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let wakers = {
            let mut inner = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            inner.fired = true;
            inner.listeners.drain()
        };

        self.cv.notify_all();

        // Wake outside the lock.
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Blocks the calling thread until the event fires.
    ///
    /// Returns immediately if it already has. Safe to call from any number
    /// of threads.
    pub fn wait(&self) {
        if self.is_fired() {
            return;
        }
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while !inner.fired {
            inner = match self.cv.wait(inner) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Returns a future that completes when the event fires.
    ///
    /// Completes immediately if it already has. The returned future is
    /// cancel-safe: if dropped before completion, the listener is cleanly
    /// removed.
    pub fn listen(&self) -> EventListener<'_> {
        EventListener {
            event: self,
            state: ListenerState::Init,
            index: None,
        }
    }

    /// Returns the number of async listeners currently registered.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        let inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.listeners.active_count()
    }
}

impl Default for OnceEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// State of the `EventListener` future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerState {
    /// Not yet polled.
    Init,
    /// Registered in the slab.
    Waiting,
    /// Observed the fire.
    Done,
}

/// Future returned by [`OnceEvent::listen`].
#[derive(Debug)]
pub struct EventListener<'a> {
    event: &'a OnceEvent,
    state: ListenerState,
    index: Option<usize>,
}

impl Future for EventListener<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.state {
            ListenerState::Init => {
                if self.event.is_fired() {
                    self.state = ListenerState::Done;
                    return Poll::Ready(());
                }

                let mut inner = match self.event.inner.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                // Recheck under the lock: fire() drains the slab in the
                // same critical section that sets `fired`, so an entry
                // inserted here cannot miss the broadcast.
                if inner.fired {
                    drop(inner);
                    self.state = ListenerState::Done;
                    return Poll::Ready(());
                }
                let index = inner.listeners.insert(cx.waker().clone());
                drop(inner);

                self.index = Some(index);
                self.state = ListenerState::Waiting;
                Poll::Pending
            }
            ListenerState::Waiting => {
                let mut inner = match self.event.inner.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if inner.fired {
                    // The slab was drained when the event fired; the slot
                    // is already gone.
                    drop(inner);
                    self.index = None;
                    self.state = ListenerState::Done;
                    return Poll::Ready(());
                }
                if let Some(index) = self.index {
                    inner.listeners.update(index, cx.waker().clone());
                }
                Poll::Pending
            }
            ListenerState::Done => Poll::Ready(()),
        }
    }
}

impl EventListener<'_> {
    fn cleanup(&mut self) {
        if let Some(index) = self.index.take() {
            let mut inner = match self.event.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !inner.fired {
                inner.listeners.remove(index);
            }
        }
    }
}

impl Drop for EventListener<'_> {
    fn drop(&mut self) {
        if self.state == ListenerState::Waiting {
            self.cleanup();
        }
    }
}

/// A cloneable, owned handle to a [`OnceEvent`].
///
/// Handed out by [`crate::RundownGuard::signal`] so shutdown observers can
/// outlive the call site that obtained them. Every clone observes the same
/// underlying event.
#[derive(Debug, Clone)]
pub struct Signal {
    event: Arc<OnceEvent>,
}

impl Signal {
    pub(crate) fn new(event: Arc<OnceEvent>) -> Self {
        Self { event }
    }

    /// Returns true iff the underlying event has fired. Never blocks.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.event.is_fired()
    }

    /// Blocks the calling thread until the underlying event fires.
    pub fn wait(&self) {
        self.event.wait();
    }

    /// Returns a future that completes when the underlying event fires.
    pub fn listen(&self) -> EventListener<'_> {
        self.event.listen()
    }
}
