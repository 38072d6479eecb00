//! The arena: the roster of live mobs and their per-tick update.
//!
//! [`Arena::step`] runs once per fixed step, after the task runtime has
//! advanced:
//!
//! 1. Step every combo in spawn order, raising `missed` and `defeated`.
//! 2. Resolve death-bomb blasts queued by this step's defeats (and by any
//!    explosion since the last step), buffering one hit on every other mob
//!    in range.
//! 3. Despawn defeated mobs. Mobs that completed their sequence score.
//! 4. Paint the rings of every surviving mob.

use std::collections::BTreeMap;

use kickback_combo::{ComboSettings, MobCode, RingPalette, ring_paints};
use kickback_core::Tick;
use kickback_types::{HurtType, MobId, Position};
use tracing::{debug, info, warn};

use crate::bomb::{self, BlastQueue, DEFAULT_BLAST_RADIUS};
use crate::error::GameError;
use crate::mob::Mob;
use crate::stage::{Cue, SharedStage};

/// Tuning shared by every mob in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaSettings {
    /// Combo timing handed to each mob.
    pub combo: ComboSettings,
    /// Ring colors.
    pub palette: RingPalette,
    /// Death-bomb blast radius.
    pub blast_radius: f32,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            combo: ComboSettings::default(),
            palette: RingPalette::default(),
            blast_radius: DEFAULT_BLAST_RADIUS,
        }
    }
}

/// What happened during one [`Arena::step`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArenaStep {
    /// Mobs despawned this step, in spawn order.
    pub despawned: Vec<MobId>,
    /// Hits that aged out without matching.
    pub misses: usize,
    /// Death-bomb blasts resolved.
    pub blasts: usize,
    /// Points scored.
    pub scored: u32,
}

/// Owner of every live mob.
pub struct Arena {
    stage: SharedStage,
    settings: ArenaSettings,
    mobs: BTreeMap<MobId, Mob>,
    next_id: Option<MobId>,
    blasts: BlastQueue,
    score: u32,
}

impl core::fmt::Debug for Arena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("mobs", &self.mobs.len())
            .field("pending_blasts", &self.blasts.len())
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

impl Arena {
    /// Create an empty arena drawing through `stage`.
    pub fn new(stage: SharedStage, settings: ArenaSettings) -> Self {
        Self {
            stage,
            settings,
            mobs: BTreeMap::new(),
            next_id: Some(MobId::new(0)),
            blasts: BlastQueue::new(),
            score: 0,
        }
    }

    /// Arena tuning.
    pub const fn settings(&self) -> &ArenaSettings {
        &self.settings
    }

    /// Mobs defeated by completing their sequence since the last reset.
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Number of live mobs.
    pub fn live_mobs(&self) -> usize {
        self.mobs.len()
    }

    /// Whether no mob is alive.
    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }

    /// Live mob identifiers in spawn order.
    pub fn mob_ids(&self) -> Vec<MobId> {
        self.mobs.keys().copied().collect()
    }

    /// Look up a live mob.
    pub fn mob(&self, id: MobId) -> Option<&Mob> {
        self.mobs.get(&id)
    }

    /// Blasts waiting for the next step.
    pub fn pending_blasts(&self) -> usize {
        self.blasts.len()
    }

    /// Spawn a mob from a parsed code.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::IdsExhausted`] when no identifier is left, or
    /// [`GameError::Combo`] if the combo cannot be built.
    pub fn spawn(&mut self, code: MobCode, position: Position) -> Result<MobId, GameError> {
        let id = self.next_id.ok_or(GameError::IdsExhausted)?;
        let mob = Mob::new(id, position, code, self.settings.combo)?;
        self.next_id = id.next();
        let _ = bomb::arm(&mob, self.settings.blast_radius, &self.blasts);
        self.stage.borrow_mut().spawn_mob(id, position, mob.code());
        debug!(
            mob = %id,
            code = %mob.code(),
            x = position.x,
            y = position.y,
            z = position.z,
            "Mob spawned"
        );
        self.mobs.insert(id, mob);
        Ok(id)
    }

    /// Spawn a mob from code text.
    ///
    /// An invalid code disables this one actor: a warning is logged and
    /// nothing is spawned.
    pub fn spawn_code(&mut self, code: &str, position: Position) -> Option<MobId> {
        let parsed = match MobCode::parse(code) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(code, error = %e, "Invalid mob code, actor disabled");
                return None;
            }
        };
        match self.spawn(parsed, position) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(code, error = %e, "Mob spawn failed");
                None
            }
        }
    }

    /// Deliver a hit to a live mob. Returns whether it was buffered.
    pub fn hurt(&mut self, id: MobId, hurt: HurtType, now: Tick) -> bool {
        self.mobs
            .get_mut(&id)
            .is_some_and(|mob| mob.on_hurt(hurt, now))
    }

    /// Defeat a live mob immediately. It is despawned on the next step.
    pub fn explode(&mut self, id: MobId, now: Tick) -> bool {
        self.mobs.get_mut(&id).is_some_and(|mob| mob.explode(now))
    }

    /// Run one tick of the arena.
    pub fn step(&mut self, now: Tick) -> ArenaStep {
        let mut step = ArenaStep::default();

        // 1. Combos
        for mob in self.mobs.values_mut() {
            let combo = mob.step(now);
            step.misses = step.misses.saturating_add(combo.misses.len());
        }
        if step.misses > 0 {
            let mut stage = self.stage.borrow_mut();
            for _ in 0..step.misses {
                stage.play_cue(Cue::Miss);
            }
        }

        // 2. Blasts
        for blast in self.blasts.drain() {
            step.blasts = step.blasts.saturating_add(1);
            let targets = {
                let mut stage = self.stage.borrow_mut();
                stage.explosion(blast.center, blast.radius, blast.hurt);
                stage.play_cue(Cue::Explosion);
                stage.overlap_mobs(blast.center, blast.radius)
            };
            let mut struck: usize = 0;
            for target in targets.into_iter().filter(|target| *target != blast.owner) {
                if self.hurt(target, blast.hurt, now) {
                    struck = struck.saturating_add(1);
                }
            }
            debug!(
                owner = %blast.owner,
                hurt = ?blast.hurt,
                struck,
                tick = now,
                "Death bomb resolved"
            );
        }

        // 3. Despawn
        let defeated: Vec<MobId> = self
            .mobs
            .iter()
            .filter(|(_, mob)| mob.is_defeated())
            .map(|(id, _)| *id)
            .collect();
        for id in defeated {
            let Some(mob) = self.mobs.remove(&id) else {
                continue;
            };
            if mob.completed() {
                step.scored = step.scored.saturating_add(1);
            }
            self.stage.borrow_mut().destroy_mob(id);
            step.despawned.push(id);
        }
        if step.scored > 0 {
            self.score = self.score.saturating_add(step.scored);
            info!(tick = now, score = self.score, live = self.mobs.len(), "Score changed");
        }

        // 4. Rings
        let mut stage = self.stage.borrow_mut();
        for (id, mob) in &self.mobs {
            for paint in ring_paints(&mob.ring_views(&self.settings.palette)) {
                stage.paint_ring(*id, paint);
            }
        }
        step
    }

    /// Despawn every mob and reset the score.
    pub fn reset(&mut self) -> usize {
        let cleared = self.mobs.len();
        let mut stage = self.stage.borrow_mut();
        for id in self.mobs.keys() {
            stage.destroy_mob(*id);
        }
        drop(stage);
        self.mobs.clear();
        let _ = self.blasts.drain();
        self.score = 0;
        debug!(cleared, "Arena reset");
        cleared
    }
}
