//! Task scopes: the ownership and cancellation unit for cooperative tasks.
//!
//! Every gameplay object that runs tasks owns one [`Scope`]. Tasks are
//! spawned with [`Scope::run`] or [`Scope::start`] and suspend on the
//! waiters the scope hands out ([`Scope::ticks`], [`Scope::listen_for`],
//! [`Scope::any`], ...).
//!
//! # Disposal
//!
//! [`Scope::dispose`] is one-way and idempotent. It cancels every task the
//! scope still owns, in spawn order, by dropping the task's future. Locals
//! of a canceled task are dropped exactly as on a normal return, so a
//! [`Finally`] guard is the task's guaranteed-cleanup block and runs
//! synchronously before `dispose` returns.
//!
//! A task may dispose its own scope. It keeps running until its next
//! suspension point, at which it is dropped (running its cleanup once).
//!
//! Owners must dispose their scope when they are destroyed; a task parked on
//! an event that never fires is otherwise kept alive until the runtime is
//! dropped.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::FutureExt as _;
use tracing::debug;

use crate::clock::{Tick, TickSpan};
use crate::event::{EventSource, EventWait};
use crate::runtime::{RuntimeInner, TaskHandle, TaskId};
use crate::waiter::{AnyWait, TickWait, Waiter};

/// Identifier of a scope, allocated in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl core::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

pub(crate) struct ScopeInner {
    id: ScopeId,
    runtime: Weak<RuntimeInner>,
    /// Owned live tasks in spawn order.
    tasks: RefCell<Vec<TaskId>>,
    disposed: Cell<bool>,
}

impl ScopeInner {
    pub(crate) const fn id(&self) -> ScopeId {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub(crate) fn adopt(&self, task: TaskId) {
        self.tasks.borrow_mut().push(task);
    }

    pub(crate) fn release(&self, task: TaskId) {
        self.tasks.borrow_mut().retain(|owned| *owned != task);
    }
}

/// Handle to a task scope.
///
/// Cloning produces another handle to the same scope; task bodies receive
/// such a clone so they can spawn siblings and create waiters.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl core::fmt::Debug for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.disposed.get())
            .field("live_tasks", &self.live_tasks())
            .finish()
    }
}

impl Scope {
    pub(crate) fn new(runtime: &Rc<RuntimeInner>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                id: runtime.allocate_scope_id(),
                runtime: Rc::downgrade(runtime),
                tasks: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    /// This scope's identifier.
    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Number of owned tasks that are still alive.
    pub fn live_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Current tick, or 0 if the runtime is gone.
    pub fn now(&self) -> Tick {
        self.inner.runtime.upgrade().map_or(0, |rt| rt.now())
    }

    /// Spawn a task owned by this scope and return a joinable handle.
    ///
    /// The body receives a handle to this scope and runs synchronously up to
    /// its first suspension point before `run` returns. Spawning into a
    /// disposed scope never runs the body and yields a canceled handle.
    pub fn run<F, Fut>(&self, body: F) -> TaskHandle
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        let future = body(self.clone()).boxed_local();
        match self.inner.runtime.upgrade() {
            Some(rt) => rt.spawn(&self.inner, future),
            None => {
                debug!(scope = %self.inner.id, "Spawn after runtime shutdown ignored");
                TaskHandle::stillborn()
            }
        }
    }

    /// Spawn a task owned by this scope without keeping a handle.
    ///
    /// Same semantics as [`run`](Self::run).
    pub fn start<F, Fut>(&self, body: F)
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        let _ = self.run(body);
    }

    /// Suspend for exactly `count` ticks from now.
    pub fn ticks(&self, count: u64) -> TickWait {
        TickWait::new(&self.inner.runtime, TickSpan::ticks(count))
    }

    /// Suspend for a tick-denominated duration.
    pub fn delay(&self, span: TickSpan) -> TickWait {
        TickWait::new(&self.inner.runtime, span)
    }

    /// Suspend for a real-time duration, rounded to the nearest tick.
    pub fn sleep(&self, duration: Duration) -> TickWait {
        let span = self
            .inner
            .runtime
            .upgrade()
            .map_or(TickSpan::ZERO, |rt| rt.rate().span(duration));
        self.delay(span)
    }

    /// Suspend for whole milliseconds, rounded to the nearest tick.
    pub fn millis(&self, millis: u64) -> TickWait {
        self.sleep(Duration::from_millis(millis))
    }

    /// Suspend for whole seconds.
    pub fn seconds(&self, seconds: u64) -> TickWait {
        self.sleep(Duration::from_secs(seconds))
    }

    /// Suspend until the source's next fire.
    pub fn listen_for(&self, source: &EventSource) -> EventWait {
        source.next()
    }

    /// Race several waiters; resolves with the index of the first to resolve.
    ///
    /// The losers are dropped (canceled) before the race resolves, so at most
    /// one branch ever wins.
    pub fn any<I>(&self, waiters: I) -> AnyWait
    where
        I: IntoIterator<Item = Waiter>,
    {
        AnyWait::new(waiters)
    }

    /// Cancel every owned task and refuse new ones.
    ///
    /// Calling `dispose` again is a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let owned = std::mem::take(&mut *self.inner.tasks.borrow_mut());
        let Some(rt) = self.inner.runtime.upgrade() else {
            return;
        };
        let canceled = rt.cancel_tasks(&owned);
        debug!(scope = %self.inner.id, owned = owned.len(), canceled, "Scope disposed");
    }
}

/// Guard that runs a closure when dropped.
///
/// Hold one across the suspension points of a task body to get cleanup that
/// runs on both normal completion and cancellation.
#[must_use = "the cleanup runs when the guard is dropped"]
pub struct Finally<F: FnOnce()> {
    cleanup: Option<F>,
}

impl<F: FnOnce()> Finally<F> {
    /// Drop the guard without running the cleanup.
    pub fn dismiss(mut self) {
        self.cleanup = None;
    }
}

impl<F: FnOnce()> Drop for Finally<F> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

/// Create a [`Finally`] guard.
pub const fn finally<F: FnOnce()>(cleanup: F) -> Finally<F> {
    Finally {
        cleanup: Some(cleanup),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::clock::TickRate;
    use crate::runtime::{Runtime, TaskState};

    fn runtime() -> Runtime {
        Runtime::new(TickRate::new(60).unwrap())
    }

    #[test]
    fn body_runs_inline_to_first_suspension() {
        let rt = runtime();
        let scope = rt.scope();
        let log = Rc::new(RefCell::new(Vec::new()));
        let task_log = Rc::clone(&log);
        let handle = scope.run(|scope| async move {
            task_log.borrow_mut().push("before");
            scope.ticks(1).await;
            task_log.borrow_mut().push("after");
        });
        assert_eq!(*log.borrow(), vec!["before"]);
        assert_eq!(handle.state(), TaskState::Suspended);
        rt.advance().unwrap();
        assert_eq!(*log.borrow(), vec!["before", "after"]);
        assert_eq!(handle.state(), TaskState::Completed);
        assert_eq!(scope.live_tasks(), 0);
    }

    #[test]
    fn dispose_runs_cleanup_once_per_task() {
        let rt = runtime();
        let scope = rt.scope();
        let cleanups = Rc::new(Cell::new(0_u32));
        let mut handles = Vec::new();
        for _ in 0..3 {
            let count = Rc::clone(&cleanups);
            handles.push(scope.run(|scope| async move {
                let _guard = finally(move || count.set(count.get() + 1));
                scope.ticks(100).await;
            }));
        }
        assert_eq!(scope.live_tasks(), 3);

        scope.dispose();
        assert_eq!(cleanups.get(), 3);
        assert!(handles.iter().all(|h| h.state() == TaskState::Canceled));
        assert_eq!(rt.live_tasks(), 0);
        assert_eq!(rt.pending_timers(), 0);

        scope.dispose();
        assert_eq!(cleanups.get(), 3);
    }

    #[test]
    fn dispose_cancels_in_spawn_order() {
        let rt = runtime();
        let scope = rt.scope();
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            scope.start(move |scope| async move {
                let _guard = finally(move || order.borrow_mut().push(name));
                scope.ticks(10).await;
            });
        }
        scope.dispose();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn spawn_into_disposed_scope_never_runs() {
        let rt = runtime();
        let scope = rt.scope();
        scope.dispose();
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let handle = scope.run(|_| async move {
            flag.set(true);
        });
        assert!(!ran.get());
        assert_eq!(handle.state(), TaskState::Canceled);
    }

    #[test]
    fn task_can_dispose_its_own_scope() {
        let rt = runtime();
        let scope = rt.scope();
        let cleanups = Rc::new(Cell::new(0_u32));
        let reached = Rc::new(Cell::new(false));

        let count = Rc::clone(&cleanups);
        let sibling = scope.run(|scope| async move {
            let _guard = finally(move || count.set(count.get() + 1));
            scope.ticks(50).await;
        });

        let count = Rc::clone(&cleanups);
        let after = Rc::clone(&reached);
        let handle = scope.run(|scope| async move {
            let _guard = finally(move || count.set(count.get() + 1));
            scope.ticks(1).await;
            scope.dispose();
            scope.ticks(1).await;
            after.set(true);
        });

        rt.advance().unwrap();
        assert_eq!(cleanups.get(), 2);
        assert!(!reached.get());
        assert_eq!(handle.state(), TaskState::Canceled);
        assert_eq!(sibling.state(), TaskState::Canceled);
        assert_eq!(rt.live_tasks(), 0);

        rt.advance().unwrap();
        assert_eq!(cleanups.get(), 2);
    }

    #[test]
    fn dismissed_guard_does_not_run() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let guard = finally(move || flag.set(true));
        guard.dismiss();
        assert!(!ran.get());
    }

    #[test]
    fn sleep_rounds_to_ticks() {
        let rt = runtime();
        let scope = rt.scope();
        assert_eq!(scope.millis(200).due(), 12);
        assert_eq!(scope.seconds(2).due(), 120);
        assert_eq!(scope.delay(TickSpan::ticks(4)).due(), 4);
    }

    #[test]
    fn scopes_are_independent() {
        let rt = runtime();
        let a = rt.scope();
        let b = rt.scope();
        assert_ne!(a.id(), b.id());
        a.start(|scope| async move { scope.ticks(5).await });
        b.start(|scope| async move { scope.ticks(5).await });
        a.dispose();
        assert_eq!(a.live_tasks(), 0);
        assert_eq!(b.live_tasks(), 1);
        assert_eq!(rt.live_tasks(), 1);
    }
}
