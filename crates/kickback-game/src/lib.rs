//! Gameplay for kickback: mobs, the arena, encounters, the player, and the
//! game session.
//!
//! Everything here is single-threaded and driven by the host's fixed step:
//! the host advances the [`Runtime`](kickback_core::Runtime), then calls
//! [`GameSession::step`], which steps the player and the arena and resumes
//! any task the arena's events woke. The engine around the game (animation,
//! audio, physics queries, rendering) is reached through the [`Stage`]
//! collaborator trait.
//!
//! # Modules
//!
//! - [`arena`] -- The [`Arena`] roster: spawning, hits, per-tick update,
//!   despawn, score, and ring painting
//! - [`bomb`] -- Death bombs queued on defeat and resolved by the arena
//! - [`charge`] -- [`ChargeTimer`], a wait that records its elapsed fraction
//! - [`encounter`] -- Wave scripts and the encounter task
//! - [`error`] -- [`GameError`] and [`EncounterError`]
//! - [`mob`] -- The [`Mob`] actor and its `defeated` / `missed` events
//! - [`player`] -- Serve and swing tasks, contact, and hit-stop
//! - [`session`] -- [`GameSession`]: score text, victory, fireworks, reload
//! - [`stage`] -- The [`Stage`] collaborator port and [`RecordingStage`]

pub mod arena;
pub mod bomb;
pub mod charge;
pub mod encounter;
pub mod error;
pub mod mob;
pub mod player;
pub mod session;
pub mod stage;

pub use arena::{Arena, ArenaSettings, ArenaStep};
pub use bomb::{Blast, BlastQueue, DEFAULT_BLAST_RADIUS};
pub use charge::ChargeTimer;
pub use encounter::{Encounter, Placement, Wave};
pub use error::{EncounterError, GameError};
pub use mob::Mob;
pub use player::{Player, PlayerSettings};
pub use session::{GameSession, SessionSettings, SessionSetup, SessionStep};
pub use stage::{Clip, Cue, RecordingStage, SharedStage, Stage, StageCall, TextSlot};
