//! Waiters: the things a task can suspend on.
//!
//! - [`TickWait`] resumes after an exact number of ticks.
//! - [`EventWait`](crate::event::EventWait) resumes on a source's next fire.
//! - [`AnyWait`] races several [`Waiter`]s and cancels the losers.
//! - A [`TaskHandle`] resumes when the task finishes.
//!
//! Dropping a waiter cancels it: a dropped `TickWait` removes its timer and
//! a dropped `EventWait` leaves the source's waiter list.

use std::future::Future;
use std::pin::Pin;
use std::rc::Weak;
use std::task::{Context, Poll};

use futures::FutureExt as _;
use futures::future::LocalBoxFuture;

use crate::clock::{Tick, TickSpan};
use crate::event::EventWait;
use crate::runtime::{RuntimeInner, TaskHandle, TimerKey};

/// Suspends until the runtime clock reaches a fixed tick.
///
/// The due tick is captured when the waiter is created, so `ticks(n)`
/// created at tick `t` resumes on tick `t + n` exactly. `ticks(0)` is ready
/// immediately.
#[derive(Debug)]
#[must_use = "waiters do nothing unless awaited"]
pub struct TickWait {
    runtime: Weak<RuntimeInner>,
    due: Tick,
    key: Option<TimerKey>,
}

impl TickWait {
    pub(crate) fn new(runtime: &Weak<RuntimeInner>, span: TickSpan) -> Self {
        let now = runtime.upgrade().map_or(0, |rt| rt.now());
        Self {
            runtime: runtime.clone(),
            due: now.saturating_add(span.get()),
            key: None,
        }
    }

    /// Tick on which this waiter resolves.
    pub const fn due(&self) -> Tick {
        self.due
    }
}

impl Future for TickWait {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A waiter that outlives its runtime never resolves.
        let Some(rt) = self.runtime.upgrade() else {
            return Poll::Pending;
        };
        if rt.now() >= self.due {
            if let Some(key) = self.key.take() {
                rt.cancel_timer(key);
            }
            return Poll::Ready(());
        }
        let key = rt.register_timer(self.due, cx.waker(), self.key);
        self.key = Some(key);
        Poll::Pending
    }
}

impl Drop for TickWait {
    fn drop(&mut self) {
        if let Some(key) = self.key.take()
            && let Some(rt) = self.runtime.upgrade()
        {
            rt.cancel_timer(key);
        }
    }
}

/// One branch of an [`AnyWait`] race.
#[must_use = "waiters do nothing unless awaited"]
pub enum Waiter {
    /// Tick delay.
    Ticks(TickWait),
    /// Next fire of an event source.
    Event(EventWait),
    /// Nested race.
    Any(AnyWait),
    /// Completion of another task.
    Task(TaskHandle),
    /// Any other unit future, e.g. a sub-task body awaited in place.
    Future(LocalBoxFuture<'static, ()>),
}

impl Waiter {
    /// Wrap an arbitrary unit future as a race branch.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = ()> + 'static,
    {
        Self::Future(future.boxed_local())
    }
}

impl core::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Ticks(wait) => f.debug_tuple("Ticks").field(wait).finish(),
            Self::Event(wait) => f.debug_tuple("Event").field(wait).finish(),
            Self::Any(wait) => f.debug_tuple("Any").field(wait).finish(),
            Self::Task(handle) => f.debug_tuple("Task").field(&handle.id()).finish(),
            Self::Future(_) => f.write_str("Future"),
        }
    }
}

impl From<TickWait> for Waiter {
    fn from(wait: TickWait) -> Self {
        Self::Ticks(wait)
    }
}

impl From<EventWait> for Waiter {
    fn from(wait: EventWait) -> Self {
        Self::Event(wait)
    }
}

impl From<AnyWait> for Waiter {
    fn from(wait: AnyWait) -> Self {
        Self::Any(wait)
    }
}

impl From<TaskHandle> for Waiter {
    fn from(handle: TaskHandle) -> Self {
        Self::Task(handle)
    }
}

impl Future for Waiter {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.get_mut() {
            Self::Ticks(wait) => Pin::new(wait).poll(cx),
            Self::Event(wait) => Pin::new(wait).poll(cx),
            Self::Any(wait) => Pin::new(wait).poll(cx).map(|_| ()),
            Self::Task(handle) => Pin::new(handle).poll(cx).map(|_| ()),
            Self::Future(future) => future.as_mut().poll(cx),
        }
    }
}

/// Race of several waiters. Resolves with the index of the winning branch.
///
/// Branches are polled in argument order, so when several are ready at once
/// the lowest index wins. Every losing branch is dropped, in index order,
/// before the race resolves. A race with no branches never resolves.
#[derive(Debug)]
#[must_use = "waiters do nothing unless awaited"]
pub struct AnyWait {
    branches: Vec<Option<Waiter>>,
    winner: Option<usize>,
}

impl AnyWait {
    pub(crate) fn new<I>(waiters: I) -> Self
    where
        I: IntoIterator<Item = Waiter>,
    {
        Self {
            branches: waiters.into_iter().map(Some).collect(),
            winner: None,
        }
    }

    /// Number of branches the race started with.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Whether the race has no branches.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl Future for AnyWait {
    type Output = usize;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<usize> {
        if let Some(winner) = self.winner {
            return Poll::Ready(winner);
        }
        let winner = self.branches.iter_mut().position(|branch| {
            branch
                .as_mut()
                .is_some_and(|waiter| Pin::new(waiter).poll(cx).is_ready())
        });
        let Some(winner) = winner else {
            return Poll::Pending;
        };
        for branch in &mut self.branches {
            drop(branch.take());
        }
        self.winner = Some(winner);
        Poll::Ready(winner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::clock::TickRate;
    use crate::event::EventSource;
    use crate::runtime::Runtime;

    fn runtime() -> Runtime {
        Runtime::new(TickRate::new(60).unwrap())
    }

    #[test]
    fn ticks_zero_is_immediate() {
        let rt = runtime();
        let scope = rt.scope();
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);
        scope.start(|scope| async move {
            scope.ticks(0).await;
            flag.set(true);
        });
        assert!(done.get());
        assert_eq!(rt.pending_timers(), 0);
    }

    #[test]
    fn tick_wait_due_is_fixed_at_creation() {
        let rt = runtime();
        let scope = rt.scope();
        rt.advance().unwrap();
        rt.advance().unwrap();
        let wait = scope.ticks(5);
        assert_eq!(wait.due(), 7);
    }

    #[test]
    fn dropped_tick_wait_removes_timer() {
        let rt = runtime();
        let scope = rt.scope();
        scope.start(|scope| async move {
            scope.ticks(10).await;
        });
        assert_eq!(rt.pending_timers(), 1);
        scope.dispose();
        assert_eq!(rt.pending_timers(), 0);
    }

    #[test]
    fn first_ready_branch_wins_by_index() {
        let rt = runtime();
        let scope = rt.scope();
        let winner = Rc::new(Cell::new(None));
        let seen = Rc::clone(&winner);
        scope.start(|scope| async move {
            let index = scope
                .any([scope.ticks(2).into(), scope.ticks(2).into()])
                .await;
            seen.set(Some(index));
        });
        rt.advance().unwrap();
        assert_eq!(winner.get(), None);
        rt.advance().unwrap();
        assert_eq!(winner.get(), Some(0));
        assert_eq!(rt.pending_timers(), 0);
    }

    #[test]
    fn event_branch_cancels_timer_branch() {
        let rt = runtime();
        let scope = rt.scope();
        let source = EventSource::new();
        let winner = Rc::new(Cell::new(None));
        let seen = Rc::clone(&winner);
        let event = source.clone();
        scope.start(|scope| async move {
            let index = scope
                .any([scope.ticks(5).into(), scope.listen_for(&event).into()])
                .await;
            seen.set(Some(index));
        });
        rt.advance().unwrap();
        source.fire();
        rt.run_ready();
        assert_eq!(winner.get(), Some(1));
        assert_eq!(rt.pending_timers(), 0);
        assert_eq!(source.pending_waiters(), 0);
    }

    #[test]
    fn empty_race_never_resolves() {
        let rt = runtime();
        let scope = rt.scope();
        let handle = scope.run(|scope| async move {
            let _ = scope.any(Vec::new()).await;
        });
        for _ in 0..10 {
            rt.advance().unwrap();
        }
        assert!(!handle.is_finished());
    }

    #[test]
    fn task_handle_branch_resolves_on_completion() {
        let rt = runtime();
        let scope = rt.scope();
        let child = scope.run(|scope| async move {
            scope.ticks(3).await;
        });
        let winner = Rc::new(Cell::new(None));
        let seen = Rc::clone(&winner);
        scope.start(|scope| async move {
            let index = scope
                .any([scope.ticks(10).into(), child.into()])
                .await;
            seen.set(Some(index));
        });
        for _ in 0..3 {
            rt.advance().unwrap();
        }
        assert_eq!(winner.get(), Some(1));
    }
}
