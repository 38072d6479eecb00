//! Charge timer: a tick wait that remembers how far it got.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use kickback_core::{Scope, finally};

/// Records the elapsed fraction of its most recent wait.
///
/// The fraction is written when the wait ends, whether it ran to completion
/// or was canceled, e.g. by losing a race against a release event.
#[derive(Debug, Clone, Default)]
pub struct ChargeTimer {
    fraction: Rc<Cell<f32>>,
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn elapsed_fraction(elapsed: u64, total: u64) -> f32 {
    if total == 0 {
        return 1.0;
    }
    (elapsed as f64 / total as f64).clamp(0.0, 1.0) as f32
}

impl ChargeTimer {
    /// Create a timer with a fraction of zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction recorded by the last finished wait, in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        self.fraction.get()
    }

    /// Wait `ticks` ticks in `scope`, then record `(now - start) / ticks`.
    ///
    /// The start tick is taken when this is called. The fraction is also
    /// recorded if the returned future is dropped early, polled or not.
    pub fn charge(&self, scope: &Scope, ticks: u64) -> impl Future<Output = ()> + 'static {
        let start = scope.now();
        let wait = scope.ticks(ticks);
        let fraction = Rc::clone(&self.fraction);
        let clock = scope.clone();
        let record = finally(move || {
            let elapsed = clock.now().saturating_sub(start);
            fraction.set(elapsed_fraction(elapsed, ticks));
        });
        async move {
            let _record = record;
            wait.await;
        }
    }
}
