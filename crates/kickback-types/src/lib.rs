//! Shared value types for the Kickback arcade game.
//!
//! This crate is the single source of truth for the small closed set of
//! values that flow between the combo state machine, the gameplay actors,
//! and the external collaborators (renderer, physics, audio).
//!
//! # Modules
//!
//! - [`ids`] -- Typed numeric identifiers for mobs and balls
//! - [`enums`] -- Hit classification tags ([`HurtType`])
//! - [`structs`] -- Requirement slots, positions, and colors

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::HurtType;
pub use ids::{BallId, MobId};
pub use structs::{Color, HurtRequirement, Position};
