//! Fixed-step host loop.
//!
//! [`run_fixed_steps`] is the host side of the runtime contract: it calls
//! [`Runtime::advance`] exactly once per step, and only then hands the step
//! to the per-step gameplay callback. The loop is bounded by `max_ticks`
//! (0 = unlimited) and can be stopped by the callback. A non-zero
//! `tick_interval_ms` paces steps in real time with `tokio::time`.

use tracing::{info, warn};

use crate::clock::{ClockError, Tick};
use crate::config::SimulationConfig;
use crate::runtime::Runtime;

/// Errors that can occur during the host loop.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// What the per-step callback wants the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
    /// Keep stepping.
    Continue,
    /// End the run after this step.
    Stop,
}

/// Why the host loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The configured tick limit was reached.
    MaxTicksReached,
    /// The step callback asked to stop.
    Stopped,
}

/// Result of a host loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// The reason the run ended.
    pub end_reason: RunEndReason,
    /// Number of steps executed by this run.
    pub total_ticks: u64,
    /// Clock value after the last step.
    pub final_tick: Tick,
}

/// Host loop bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunBounds {
    /// Maximum number of steps (0 = unlimited).
    pub max_ticks: u64,
    /// Real-time milliseconds between steps (0 = back to back).
    pub tick_interval_ms: u64,
}

impl From<&SimulationConfig> for RunBounds {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            max_ticks: config.max_ticks,
            tick_interval_ms: config.tick_interval_ms,
        }
    }
}

/// Callback invoked after every step, once the runtime has drained.
pub trait StepCallback {
    /// Run the gameplay work for the step that just advanced to `tick`.
    fn on_step(&mut self, runtime: &Runtime, tick: Tick) -> StepControl;
}

/// Run the host loop until the tick limit is reached or the callback stops.
///
/// # Errors
///
/// Returns [`RunnerError::Clock`] if the clock overflows.
pub async fn run_fixed_steps(
    runtime: &Runtime,
    bounds: RunBounds,
    callback: &mut dyn StepCallback,
) -> Result<RunResult, RunnerError> {
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = bounds.max_ticks,
        tick_interval_ms = bounds.tick_interval_ms,
        ticks_per_second = runtime.rate().per_second(),
        "Host loop starting"
    );

    loop {
        if bounds.max_ticks > 0 && total_ticks >= bounds.max_ticks {
            info!(
                tick = runtime.now(),
                max_ticks = bounds.max_ticks,
                "Tick limit reached"
            );
            return Ok(RunResult {
                end_reason: RunEndReason::MaxTicksReached,
                total_ticks,
                final_tick: runtime.now(),
            });
        }

        let tick = runtime.advance()?;
        total_ticks = total_ticks.saturating_add(1);

        if callback.on_step(runtime, tick) == StepControl::Stop {
            info!(tick, "Step callback requested stop");
            return Ok(RunResult {
                end_reason: RunEndReason::Stopped,
                total_ticks,
                final_tick: tick,
            });
        }

        if bounds.tick_interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(bounds.tick_interval_ms)).await;
        }
    }
}

/// Log the end of a host loop run.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_tick,
        "Host loop ended"
    );
    if result.total_ticks == 0 {
        warn!("Host loop ended with no steps executed");
    }
}
