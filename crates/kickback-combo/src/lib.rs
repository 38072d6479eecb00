//! Combo state machine, ring visualization, and mob codes for kickback.
//!
//! This crate is the pure logic layer behind every mob: it validates a
//! stream of timestamped hits against a required sequence and describes
//! how the progress should be drawn. It never touches the task runtime;
//! the game crate steps each [`Combo`] once per tick and turns the returned
//! [`ComboStep`] into events and collaborator calls.
//!
//! # Modules
//!
//! - [`code`] -- Mob code parser (`rRG,G,BB`) producing a [`MobCode`]
//! - [`combo`] -- The per-tick [`Combo`] state machine
//! - [`config`] -- Tick-denominated [`ComboSettings`] and the [`RingPalette`]
//! - [`error`] -- [`ComboError`] and [`CodeError`]
//! - [`rings`] -- Ring phases, views, and renderer parameter paints

pub mod code;
pub mod combo;
pub mod config;
pub mod error;
pub mod rings;

pub use code::MobCode;
pub use combo::{Combo, ComboStep, HurtEvent};
pub use config::{ComboSettings, RingPalette};
pub use error::{CodeError, ComboError};
pub use rings::{RingPaint, RingParam, RingPhase, RingValue, RingView, ring_paints, ring_views};
