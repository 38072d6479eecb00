//! Multicast event sources with one-shot suspension.
//!
//! An [`EventSource`] is owned by the object that fires it (a mob's
//! `defeated` signal, a player's `serve_released` input edge) and shared by
//! cheap clone with whoever listens. It supports two kinds of consumers:
//!
//! - **Persistent listeners** registered with [`EventSource::listen`], called
//!   synchronously on every [`fire`](EventSource::fire) in subscription order.
//! - **One-shot waiters** created with [`EventSource::next`], which a task
//!   awaits to suspend until the next fire. Each waiter resolves exactly once;
//!   simultaneous waiters resolve in FIFO registration order.
//!
//! # Delivery rules
//!
//! - Listeners are called against a snapshot of the subscriber list taken at
//!   the start of delivery. Subscribing or unsubscribing during a fire only
//!   affects later fires.
//! - Waiters are also snapshotted at the start of delivery: a waiter created
//!   while a fire is being delivered waits for the following fire.
//! - A re-entrant `fire()` from inside a listener is queued, not run inline.
//!   It is delivered in full after the current delivery returns, before the
//!   outermost `fire()` call returns.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Handle returned by [`EventSource::listen`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn()>;

/// A multicast notification point.
///
/// Cloning an `EventSource` produces another handle to the same source.
#[derive(Clone, Default)]
pub struct EventSource {
    inner: Rc<EventInner>,
}

#[derive(Default)]
struct EventInner {
    /// Persistent listeners in subscription order.
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    /// One-shot waiters in registration order.
    pending: RefCell<VecDeque<Rc<WaitSlot>>>,
    next_listener: Cell<u64>,
    /// Set while a delivery is in progress.
    delivering: Cell<bool>,
    /// Fires requested during an in-progress delivery.
    deferred: Cell<u32>,
    /// Number of completed deliveries.
    deliveries: Cell<u64>,
}

impl core::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventSource")
            .field("listeners", &self.listener_count())
            .field("pending_waiters", &self.pending_waiters())
            .field("deliveries", &self.inner.deliveries.get())
            .finish()
    }
}

impl EventSource {
    /// Create a source with no listeners and no waiters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a persistent listener.
    pub fn listen(&self, callback: impl Fn() + 'static) -> ListenerId {
        let raw = self.inner.next_listener.get();
        self.inner.next_listener.set(raw.saturating_add(1));
        let id = ListenerId(raw);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(callback)));
        id
    }

    /// Remove a persistent listener. Returns `false` if it was not subscribed.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }

    /// Register a one-shot waiter that resolves on the next fire.
    ///
    /// Dropping the returned [`EventWait`] before the fire removes it from the
    /// pending set without invoking anything.
    pub fn next(&self) -> EventWait {
        let slot = Rc::new(WaitSlot::default());
        self.inner.pending.borrow_mut().push_back(Rc::clone(&slot));
        EventWait {
            source: Rc::clone(&self.inner),
            slot,
        }
    }

    /// Notify every listener, then resolve every pending waiter.
    ///
    /// Firing a source with no listeners and no waiters has no effect beyond
    /// counting the delivery.
    pub fn fire(&self) {
        let inner = &self.inner;
        if inner.delivering.get() {
            inner.deferred.set(inner.deferred.get().saturating_add(1));
            return;
        }
        inner.delivering.set(true);
        loop {
            self.deliver();
            let deferred = inner.deferred.get();
            if deferred == 0 {
                break;
            }
            inner.deferred.set(deferred.saturating_sub(1));
        }
        inner.delivering.set(false);
    }

    fn deliver(&self) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        let waiters = std::mem::take(&mut *self.inner.pending.borrow_mut());
        self.inner
            .deliveries
            .set(self.inner.deliveries.get().saturating_add(1));

        for listener in &listeners {
            listener();
        }
        for slot in waiters {
            slot.resolve();
        }
    }

    /// Number of persistent listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Number of one-shot waiters still pending.
    pub fn pending_waiters(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Number of deliveries performed, including queued re-entrant ones.
    pub fn deliveries(&self) -> u64 {
        self.inner.deliveries.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Pending,
    Fired,
    Canceled,
}

#[derive(Debug)]
struct WaitSlot {
    state: Cell<SlotState>,
    waker: RefCell<Option<Waker>>,
}

impl Default for WaitSlot {
    fn default() -> Self {
        Self {
            state: Cell::new(SlotState::Pending),
            waker: RefCell::new(None),
        }
    }
}

impl WaitSlot {
    fn resolve(&self) {
        if self.state.get() != SlotState::Pending {
            return;
        }
        self.state.set(SlotState::Fired);
        let waker = self.waker.borrow_mut().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// A pending one-shot wait on an [`EventSource`].
///
/// Resolves once, on the first fire after it was created.
#[must_use = "an event wait does nothing unless awaited"]
pub struct EventWait {
    source: Rc<EventInner>,
    slot: Rc<WaitSlot>,
}

impl core::fmt::Debug for EventWait {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventWait")
            .field("state", &self.slot.state.get())
            .finish_non_exhaustive()
    }
}

impl EventWait {
    /// Whether the source has fired since this wait was created.
    pub fn is_fired(&self) -> bool {
        self.slot.state.get() == SlotState::Fired
    }
}

impl Future for EventWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.slot.state.get() {
            SlotState::Fired => Poll::Ready(()),
            SlotState::Pending | SlotState::Canceled => {
                *self.slot.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Drop for EventWait {
    fn drop(&mut self) {
        if self.slot.state.get() != SlotState::Pending {
            return;
        }
        self.slot.state.set(SlotState::Canceled);
        self.source
            .pending
            .borrow_mut()
            .retain(|slot| !Rc::ptr_eq(slot, &self.slot));
    }
}
