//! Tick clock, event sources, and the cooperative task runtime for kickback.
//!
//! Every gameplay object in the game is driven by short-lived cooperative
//! tasks that suspend on tick delays, event fires, or races of both. This
//! crate owns that machinery and the host loop that drives it.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter, tick rate, and duration-to-tick conversion.
//! - [`event`] -- Multicast [`EventSource`] with persistent listeners and
//!   one-shot waiters.
//! - [`runtime`] -- The [`Runtime`] context object: task table, timers, and
//!   the ready queue drained once per step.
//! - [`scope`] -- [`Scope`], the ownership and cancellation unit for tasks,
//!   and the [`Finally`] cleanup guard.
//! - [`waiter`] -- [`TickWait`], [`AnyWait`], and the [`Waiter`] enum.
//! - [`config`] -- Configuration loading from `kickback-config.yaml`.
//! - [`runner`] -- Fixed-step host loop.
//!
//! [`EventSource`]: event::EventSource
//! [`Runtime`]: runtime::Runtime
//! [`Scope`]: scope::Scope
//! [`Finally`]: scope::Finally
//! [`TickWait`]: waiter::TickWait
//! [`AnyWait`]: waiter::AnyWait
//! [`Waiter`]: waiter::Waiter

pub mod clock;
pub mod config;
pub mod event;
pub mod runner;
pub mod runtime;
pub mod scope;
pub mod waiter;

pub use clock::{ClockError, Tick, TickClock, TickRate, TickSpan};
pub use event::{EventSource, EventWait, ListenerId};
pub use runtime::{Runtime, TaskHandle, TaskId, TaskState};
pub use scope::{Finally, Scope, ScopeId, finally};
pub use waiter::{AnyWait, TickWait, Waiter};
