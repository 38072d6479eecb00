//! Tick-synchronized cooperative task runtime.
//!
//! [`Runtime`] is the explicit context object constructed once at startup.
//! It owns the [`TickClock`], the table of live tasks, the timer queue, and
//! the ready queue. Gameplay objects never touch it directly: they receive a
//! [`Scope`] and spawn tasks into it.
//!
//! # Execution model
//!
//! Single-threaded, cooperative, non-preemptive. A task body runs
//! synchronously between suspension points. The host calls
//! [`Runtime::advance`] exactly once per fixed step; after the clock moves,
//! every timer due on the new tick is woken and the ready queue is drained
//! completely (including tasks spawned during the drain, which run inline up
//! to their first suspension point) before control returns to the host.
//!
//! # Resume order
//!
//! Tasks resume in the order their waiters became ready. Timers expiring on
//! the same tick become ready in registration order; event waiters become
//! ready in FIFO registration order when their source fires. A task woken
//! several times before it is resumed is resumed once.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};

use futures::future::LocalBoxFuture;
use futures::task::{ArcWake, waker};
use tracing::{debug, trace};

use crate::clock::{ClockError, Tick, TickClock, TickRate};
use crate::scope::{Scope, ScopeId};

/// Identifier of a spawned task, allocated in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl core::fmt::Display for TaskId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle state of a cooperative task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// The task body is executing right now.
    Running,
    /// The task is parked on a waiter.
    Suspended,
    /// The task body returned.
    Completed,
    /// The task was canceled by its scope before it returned.
    Canceled,
}

impl TaskState {
    /// Whether the task can no longer run.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

/// Key of a registered timer: due tick, then registration sequence.
pub(crate) type TimerKey = (Tick, u64);

// ---------------------------------------------------------------------------
// Ready queue and wakers
// ---------------------------------------------------------------------------

/// FIFO of tasks whose waiters have become ready.
///
/// Wakers must be `Send + Sync`, so the queue sits behind a mutex even
/// though only the simulation thread ever touches it.
#[derive(Debug, Default)]
struct ReadyQueue {
    inner: Mutex<ReadyInner>,
}

#[derive(Debug, Default)]
struct ReadyInner {
    order: VecDeque<TaskId>,
    queued: HashSet<TaskId>,
}

impl ReadyQueue {
    fn push(&self, id: TaskId) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.queued.insert(id) {
            inner.order.push_back(id);
        }
    }

    fn pop(&self) -> Option<TaskId> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inner.order.pop_front()?;
        let _ = inner.queued.remove(&id);
        Some(id)
    }

    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }
}

struct TaskWaker {
    id: TaskId,
    ready: Arc<ReadyQueue>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.ready.push(arc_self.id);
    }
}

// ---------------------------------------------------------------------------
// Task bookkeeping
// ---------------------------------------------------------------------------

/// State shared between a task's slot and its [`TaskHandle`]s.
#[derive(Debug)]
pub(crate) struct TaskShared {
    state: Cell<TaskState>,
    joiners: RefCell<Vec<Waker>>,
}

impl TaskShared {
    fn new() -> Self {
        Self {
            state: Cell::new(TaskState::Suspended),
            joiners: RefCell::new(Vec::new()),
        }
    }

    fn finish(&self, outcome: TaskState) {
        self.state.set(outcome);
        let joiners = std::mem::take(&mut *self.joiners.borrow_mut());
        for joiner in joiners {
            joiner.wake();
        }
    }
}

struct TaskSlot {
    scope: Weak<crate::scope::ScopeInner>,
    /// `None` while the task is being polled.
    future: Option<LocalBoxFuture<'static, ()>>,
    shared: Rc<TaskShared>,
    /// Set when the owning scope is disposed mid-poll.
    cancel_requested: bool,
}

/// Handle to a spawned task.
///
/// Awaiting the handle suspends until the task completes or is canceled
/// and yields its terminal [`TaskState`].
#[derive(Debug, Clone)]
#[must_use = "dropping a task handle does not cancel the task"]
pub struct TaskHandle {
    id: TaskId,
    shared: Rc<TaskShared>,
}

impl TaskHandle {
    /// A handle for a task that never ran.
    pub(crate) fn stillborn() -> Self {
        let shared = Rc::new(TaskShared::new());
        shared.finish(TaskState::Canceled);
        Self {
            id: TaskId(u64::MAX),
            shared,
        }
    }

    /// The task's identifier.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// The task's current state.
    pub fn state(&self) -> TaskState {
        self.shared.state.get()
    }

    /// Whether the task has completed or been canceled.
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }
}

impl Future for TaskHandle {
    type Output = TaskState;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<TaskState> {
        let state = self.shared.state.get();
        if state.is_terminal() {
            return Poll::Ready(state);
        }
        let mut joiners = self.shared.joiners.borrow_mut();
        if !joiners.iter().any(|joiner| joiner.will_wake(cx.waker())) {
            joiners.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

pub(crate) struct RuntimeInner {
    clock: RefCell<TickClock>,
    tasks: RefCell<BTreeMap<TaskId, TaskSlot>>,
    ready: Arc<ReadyQueue>,
    timers: RefCell<BTreeMap<TimerKey, Waker>>,
    next_task: Cell<u64>,
    next_timer: Cell<u64>,
    next_scope: Cell<u64>,
    draining: Cell<bool>,
}

impl RuntimeInner {
    pub(crate) fn now(&self) -> Tick {
        self.clock.borrow().now()
    }

    pub(crate) fn rate(&self) -> TickRate {
        self.clock.borrow().rate()
    }

    pub(crate) fn allocate_scope_id(&self) -> ScopeId {
        let raw = self.next_scope.get();
        self.next_scope.set(raw.saturating_add(1));
        ScopeId::new(raw)
    }

    /// Register a task and poll it inline up to its first suspension point.
    pub(crate) fn spawn(
        &self,
        scope: &Rc<crate::scope::ScopeInner>,
        future: LocalBoxFuture<'static, ()>,
    ) -> TaskHandle {
        let raw = self.next_task.get();
        self.next_task.set(raw.saturating_add(1));
        let id = TaskId(raw);
        let shared = Rc::new(TaskShared::new());
        let handle = TaskHandle {
            id,
            shared: Rc::clone(&shared),
        };

        if scope.is_disposed() {
            debug!(task = %id, scope = %scope.id(), "Spawn into disposed scope ignored");
            drop(future);
            shared.finish(TaskState::Canceled);
            return handle;
        }

        let _ = self.tasks.borrow_mut().insert(
            id,
            TaskSlot {
                scope: Rc::downgrade(scope),
                future: Some(future),
                shared,
                cancel_requested: false,
            },
        );
        scope.adopt(id);
        debug!(task = %id, scope = %scope.id(), "Task spawned");

        self.poll_task(id);
        handle
    }

    fn poll_task(&self, id: TaskId) {
        let taken = {
            let mut tasks = self.tasks.borrow_mut();
            let Some(slot) = tasks.get_mut(&id) else {
                return;
            };
            // Already running further up the stack.
            let Some(future) = slot.future.take() else {
                return;
            };
            slot.shared.state.set(TaskState::Running);
            (future, Rc::clone(&slot.shared))
        };
        let (mut future, shared) = taken;

        let task_waker = waker(Arc::new(TaskWaker {
            id,
            ready: Arc::clone(&self.ready),
        }));
        let mut cx = Context::from_waker(&task_waker);
        let poll = future.as_mut().poll(&mut cx);

        let outcome = match poll {
            Poll::Ready(()) => TaskState::Completed,
            Poll::Pending => {
                let mut tasks = self.tasks.borrow_mut();
                match tasks.get_mut(&id) {
                    Some(slot) if !slot.cancel_requested => {
                        slot.future = Some(future);
                        slot.shared.state.set(TaskState::Suspended);
                        return;
                    }
                    _ => TaskState::Canceled,
                }
            }
        };

        let slot = self.tasks.borrow_mut().remove(&id);
        if let Some(scope) = slot.as_ref().and_then(|slot| slot.scope.upgrade()) {
            scope.release(id);
        }
        // Cleanup guards run here, with no runtime borrows held.
        drop(future);
        drop(slot);
        shared.finish(outcome);
        debug!(task = %id, outcome = ?outcome, "Task finished");
    }

    /// Cancel tasks in the given order. Tasks currently being polled are
    /// flagged and dropped as soon as their poll returns.
    pub(crate) fn cancel_tasks(&self, ids: &[TaskId]) -> usize {
        let mut doomed = Vec::with_capacity(ids.len());
        {
            let mut tasks = self.tasks.borrow_mut();
            for id in ids {
                let running = match tasks.get_mut(id) {
                    Some(slot) if slot.future.is_none() => {
                        slot.cancel_requested = true;
                        true
                    }
                    Some(_) => false,
                    None => continue,
                };
                if !running && let Some(slot) = tasks.remove(id) {
                    doomed.push((*id, slot));
                }
            }
        }

        let canceled = doomed.len();
        for (id, slot) in doomed {
            let TaskSlot {
                scope,
                future,
                shared,
                ..
            } = slot;
            if let Some(scope) = scope.upgrade() {
                scope.release(id);
            }
            drop(future);
            shared.finish(TaskState::Canceled);
            debug!(task = %id, "Task canceled");
        }
        canceled
    }

    pub(crate) fn register_timer(
        &self,
        due: Tick,
        waker: &Waker,
        existing: Option<TimerKey>,
    ) -> TimerKey {
        let mut timers = self.timers.borrow_mut();
        if let Some(key) = existing
            && let Some(slot) = timers.get_mut(&key)
        {
            slot.clone_from(waker);
            return key;
        }
        let seq = self.next_timer.get();
        self.next_timer.set(seq.saturating_add(1));
        let key = (due, seq);
        let _ = timers.insert(key, waker.clone());
        key
    }

    pub(crate) fn cancel_timer(&self, key: TimerKey) {
        let _ = self.timers.borrow_mut().remove(&key);
    }

    fn expire_timers(&self, now: Tick) {
        let due: Vec<Waker> = {
            let mut timers = self.timers.borrow_mut();
            let later = timers.split_off(&(now.saturating_add(1), 0));
            std::mem::replace(&mut *timers, later).into_values().collect()
        };
        for waker in due {
            waker.wake();
        }
    }

    fn drain(&self) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let mut resumed: usize = 0;
        while let Some(id) = self.ready.pop() {
            self.poll_task(id);
            resumed = resumed.saturating_add(1);
        }
        self.draining.set(false);
        resumed
    }

    fn cancel_all(&self) -> usize {
        let ids: Vec<TaskId> = self.tasks.borrow().keys().copied().collect();
        self.cancel_tasks(&ids)
    }
}

/// The simulation's task runtime and clock.
///
/// Constructed once at startup and owned by the host. Dropping the runtime
/// cancels every task that is still alive.
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runtime")
            .field("tick", &self.now())
            .field("live_tasks", &self.live_tasks())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

impl Runtime {
    /// Create a runtime whose clock starts at tick 0.
    pub fn new(rate: TickRate) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                clock: RefCell::new(TickClock::new(rate)),
                tasks: RefCell::new(BTreeMap::new()),
                ready: Arc::new(ReadyQueue::default()),
                timers: RefCell::new(BTreeMap::new()),
                next_task: Cell::new(0),
                next_timer: Cell::new(0),
                next_scope: Cell::new(0),
                draining: Cell::new(false),
            }),
        }
    }

    /// Current tick.
    pub fn now(&self) -> Tick {
        self.inner.now()
    }

    /// Fixed step rate.
    pub fn rate(&self) -> TickRate {
        self.inner.rate()
    }

    /// Create a new, active scope.
    pub fn scope(&self) -> Scope {
        Scope::new(&self.inner)
    }

    /// Advance the clock by exactly one tick and resume every task whose
    /// waiter became ready, draining the whole wave before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the clock cannot advance.
    pub fn advance(&self) -> Result<Tick, ClockError> {
        let now = self.inner.clock.borrow_mut().advance()?;
        self.inner.expire_timers(now);
        let resumed = self.inner.drain();
        trace!(tick = now, resumed, "Tick advanced");
        Ok(now)
    }

    /// Resume tasks woken outside of a tick, e.g. by an input event fired
    /// from host code. Returns the number of resumptions.
    pub fn run_ready(&self) -> usize {
        self.inner.drain()
    }

    /// Cancel every live task in every scope, drop all timers, and rewind
    /// the clock to tick 0.
    ///
    /// Scopes stay usable; owners are expected to dispose and replace them
    /// as part of their own restart handling.
    pub fn restart(&self) {
        let canceled = self.inner.cancel_all();
        self.inner.timers.borrow_mut().clear();
        while self.inner.ready.pop().is_some() {}
        self.inner.clock.borrow_mut().reset();
        debug!(canceled, "Runtime restarted");
    }

    /// Number of tasks that have not yet completed or been canceled.
    pub fn live_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Number of registered, unexpired timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Number of tasks waiting in the ready queue.
    pub fn ready_tasks(&self) -> usize {
        self.inner.ready.len()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let _ = self.inner.cancel_all();
    }
}
