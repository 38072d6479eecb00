//! Scheduler properties of the cooperative task runtime.
//!
//! These drive a [`Runtime`] the way the host does, one `advance` per step,
//! and check resume timing, ordering, race cancellation, and scope disposal.

// Tests use unwrap for clarity -- panicking on failure is the correct
// behavior in test code.
#![allow(
    clippy::unwrap_used,
    clippy::items_after_statements,
    clippy::arithmetic_side_effects
)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kickback_core::{EventSource, Runtime, TaskState, TickRate, Waiter, finally};

fn runtime() -> Runtime {
    Runtime::new(TickRate::new(60).unwrap())
}

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

// =============================================================================
// Clock and tick waits
// =============================================================================

#[test]
fn now_strictly_increases_by_one() {
    let rt = runtime();
    let mut previous = rt.now();
    for _ in 0..1000 {
        let now = rt.advance().unwrap();
        assert_eq!(now, previous + 1);
        assert_eq!(rt.now(), now);
        previous = now;
    }
}

#[test]
fn ticks_resolves_exactly_n_steps_after_call() {
    let rt = runtime();
    let scope = rt.scope();
    for _ in 0..4 {
        rt.advance().unwrap();
    }

    for n in [1_u64, 2, 7, 30] {
        let resumed_at = Rc::new(Cell::new(None));
        let seen = Rc::clone(&resumed_at);
        let called_at = rt.now();
        scope.start(move |scope| async move {
            scope.ticks(n).await;
            seen.set(Some(scope.now()));
        });
        for _ in 1..n {
            rt.advance().unwrap();
            assert_eq!(resumed_at.get(), None, "resolved early for n = {n}");
        }
        rt.advance().unwrap();
        assert_eq!(resumed_at.get(), Some(called_at + n));
    }
}

// =============================================================================
// Event sources
// =============================================================================

#[test]
fn fire_resolves_every_pending_waiter_once_in_fifo_order() {
    let rt = runtime();
    let scope = rt.scope();
    let source = EventSource::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    for index in 0..5_u32 {
        let log = Rc::clone(&log);
        let event = source.clone();
        scope.start(move |scope| async move {
            scope.listen_for(&event).await;
            log.borrow_mut().push(index);
        });
    }
    assert_eq!(source.pending_waiters(), 5);

    source.fire();
    rt.run_ready();
    assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4]);
    assert_eq!(source.pending_waiters(), 0);

    source.fire();
    rt.run_ready();
    assert_eq!(log.borrow().len(), 5);
}

#[test]
fn fire_with_nobody_listening_is_a_no_op() {
    let rt = runtime();
    let source = EventSource::new();
    source.fire();
    assert_eq!(rt.run_ready(), 0);
    assert_eq!(rt.live_tasks(), 0);
    assert_eq!(source.pending_waiters(), 0);
}

#[test]
fn event_fired_by_a_task_resumes_waiters_in_same_step() {
    let rt = runtime();
    let scope = rt.scope();
    let source = EventSource::new();
    let resumed_at = Rc::new(Cell::new(None));

    let seen = Rc::clone(&resumed_at);
    let event = source.clone();
    scope.start(move |scope| async move {
        scope.listen_for(&event).await;
        seen.set(Some(scope.now()));
    });

    let event = source.clone();
    scope.start(move |scope| async move {
        scope.ticks(4).await;
        event.fire();
    });

    for _ in 0..4 {
        rt.advance().unwrap();
    }
    assert_eq!(resumed_at.get(), Some(4));
}

// =============================================================================
// Any
// =============================================================================

#[test]
fn event_beats_timer_and_timer_branch_cleans_up_once() {
    let rt = runtime();
    let scope = rt.scope();
    let source = EventSource::new();
    let timer_cleanups = counter();
    let timer_won = Rc::new(Cell::new(false));
    let winner = Rc::new(Cell::new(None));

    let cleanups = Rc::clone(&timer_cleanups);
    let won = Rc::clone(&timer_won);
    let seen = Rc::clone(&winner);
    let event = source.clone();
    scope.start(move |scope| async move {
        let timer = scope.ticks(5);
        let timer_branch = Waiter::future(async move {
            let _cleanup = finally(move || cleanups.set(cleanups.get() + 1));
            timer.await;
            won.set(true);
        });
        let index = scope
            .any([timer_branch, scope.listen_for(&event).into()])
            .await;
        seen.set(Some(index));
    });

    for _ in 0..3 {
        rt.advance().unwrap();
    }
    source.fire();
    rt.run_ready();

    assert_eq!(winner.get(), Some(1));
    assert_eq!(timer_cleanups.get(), 1);
    assert_eq!(rt.pending_timers(), 0);

    for _ in 0..10 {
        rt.advance().unwrap();
    }
    assert!(!timer_won.get());
    assert_eq!(timer_cleanups.get(), 1);
    assert_eq!(rt.live_tasks(), 0);
}

#[test]
fn timer_wins_when_event_never_fires() {
    let rt = runtime();
    let scope = rt.scope();
    let source = EventSource::new();
    let winner = Rc::new(Cell::new(None));

    let seen = Rc::clone(&winner);
    let event = source.clone();
    scope.start(move |scope| async move {
        let index = scope
            .any([scope.ticks(5).into(), scope.listen_for(&event).into()])
            .await;
        seen.set(Some((index, scope.now())));
    });

    for _ in 0..5 {
        rt.advance().unwrap();
    }
    assert_eq!(winner.get(), Some((0, 5)));
    assert_eq!(source.pending_waiters(), 0);
}

#[test]
fn nested_any_resolves_through_outer_race() {
    let rt = runtime();
    let scope = rt.scope();
    let source = EventSource::new();
    let winner = Rc::new(Cell::new(None));

    let seen = Rc::clone(&winner);
    let event = source.clone();
    scope.start(move |scope| async move {
        let inner = scope.any([scope.ticks(50).into(), scope.listen_for(&event).into()]);
        let index = scope.any([scope.ticks(20).into(), inner.into()]).await;
        seen.set(Some(index));
    });

    rt.advance().unwrap();
    source.fire();
    rt.run_ready();
    assert_eq!(winner.get(), Some(1));
    assert_eq!(rt.pending_timers(), 0);
}

// =============================================================================
// Scopes
// =============================================================================

#[test]
fn dispose_cancels_in_flight_tasks_exactly_once() {
    let rt = runtime();
    let scope = rt.scope();
    let source = EventSource::new();
    let cleanups = counter();

    for n in 0..4_u64 {
        let count = Rc::clone(&cleanups);
        let event = source.clone();
        scope.start(move |scope| async move {
            let _cleanup = finally(move || count.set(count.get() + 1));
            if n % 2 == 0 {
                scope.ticks(100).await;
            } else {
                scope.listen_for(&event).await;
            }
        });
    }
    rt.advance().unwrap();

    scope.dispose();
    assert_eq!(cleanups.get(), 4);
    assert_eq!(rt.live_tasks(), 0);
    assert_eq!(rt.pending_timers(), 0);
    assert_eq!(source.pending_waiters(), 0);

    scope.dispose();
    source.fire();
    rt.run_ready();
    assert_eq!(cleanups.get(), 4);
}

#[test]
fn self_dispose_runs_own_cleanup_once() {
    let rt = runtime();
    let scope = rt.scope();
    let cleanups = counter();

    let count = Rc::clone(&cleanups);
    let handle = scope.run(move |scope| async move {
        let _cleanup = finally(move || count.set(count.get() + 1));
        scope.ticks(2).await;
        scope.dispose();
        scope.dispose();
        scope.ticks(1).await;
    });

    for _ in 0..5 {
        rt.advance().unwrap();
    }
    assert_eq!(cleanups.get(), 1);
    assert_eq!(handle.state(), TaskState::Canceled);
    assert!(scope.is_disposed());
}

#[test]
fn restart_idiom_replaces_scope() {
    let rt = runtime();
    let mut scope = rt.scope();
    let old_cleanups = counter();

    let count = Rc::clone(&old_cleanups);
    scope.start(move |scope| async move {
        let _cleanup = finally(move || count.set(count.get() + 1));
        scope.ticks(1000).await;
    });

    scope.dispose();
    scope = rt.scope();
    assert_eq!(old_cleanups.get(), 1);
    assert_eq!(rt.live_tasks(), 0);

    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);
    scope.start(move |scope| async move {
        scope.ticks(1).await;
        flag.set(true);
    });
    rt.advance().unwrap();
    assert!(ran.get());
}
