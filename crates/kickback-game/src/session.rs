//! The game session: wires the arena, player, and encounter together and
//! runs the victory sequence.
//!
//! The session owns two scopes. The play scope runs the encounter; the
//! session scope runs the game-over tasks (replay prompt and fireworks).
//! [`GameSession::reload`] disposes both and replaces them with fresh
//! scopes from the runtime, so nothing from the previous round survives.
//!
//! Victory is declared on the first step where the encounter has spawned
//! its last wave and the arena is empty.

use std::cell::RefCell;
use std::rc::Rc;

use kickback_combo::{ComboSettings, MobCode, RingPalette};
use kickback_core::config::{GameConfig, SessionConfig};
use kickback_core::{Runtime, Scope, TaskHandle};
use kickback_types::Position;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::arena::{Arena, ArenaSettings, ArenaStep};
use crate::bomb::DEFAULT_BLAST_RADIUS;
use crate::encounter::Encounter;
use crate::error::GameError;
use crate::player::{Player, PlayerSettings};
use crate::stage::{SharedStage, TextSlot};

/// Center of the region fireworks spawn in.
pub const FIREWORK_ORIGIN: Position = Position::new(0.0, 20.0, 40.0);

/// Radius of the region fireworks spawn in.
pub const FIREWORK_SPREAD: f32 = 20.0;

const REPLAY_PROMPT: &str = "\nPress 'r' to play again";

/// Victory sequence tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Fireworks launched on victory.
    pub firework_count: u32,
    /// Shortest delay before a firework, in milliseconds.
    pub firework_delay_min_millis: u64,
    /// Longest delay before a firework, in milliseconds (exclusive).
    pub firework_delay_max_millis: u64,
    /// Delay before the replay prompt appears, in milliseconds.
    pub replay_prompt_millis: u64,
    /// Mob codes fireworks are drawn from.
    pub firework_codes: Vec<String>,
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            firework_count: config.firework_count,
            firework_delay_min_millis: config.firework_delay_min_millis,
            firework_delay_max_millis: config.firework_delay_max_millis,
            replay_prompt_millis: config.replay_prompt_millis,
            firework_codes: config.firework_codes.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

/// Everything a session is built from.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    /// Arena tuning.
    pub arena: ArenaSettings,
    /// Player tuning.
    pub player: PlayerSettings,
    /// Victory sequence tuning.
    pub session: SessionSettings,
    /// Waves to play.
    pub encounter: Encounter,
    /// Seed for firework randomness.
    pub seed: u64,
}

impl SessionSetup {
    /// Build the setup from a loaded config.
    ///
    /// # Errors
    ///
    /// Returns a [`GameError`] if a duration, the encounter script, or a
    /// firework code is invalid.
    pub fn from_config(config: &GameConfig) -> Result<Self, GameError> {
        let rate = config.time.tick_rate()?;
        let session = SessionSettings::from(&config.session);
        for code in &session.firework_codes {
            let _ = MobCode::parse(code)?;
        }
        Ok(Self {
            arena: ArenaSettings {
                combo: ComboSettings::from_config(&config.combo, rate)?,
                palette: RingPalette::new(config.combo.colors),
                blast_radius: DEFAULT_BLAST_RADIUS,
            },
            player: PlayerSettings::from_config(&config.player, rate)?,
            session,
            encounter: Encounter::from_config(&config.encounter)?,
            seed: config.simulation.seed,
        })
    }
}

/// What happened during one [`GameSession::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStep {
    /// Player animation time scale (0 during hit-stop).
    pub time_scale: f32,
    /// Arena outcome.
    pub arena: ArenaStep,
    /// Tasks resumed by arena events.
    pub resumed: usize,
    /// Whether victory was declared this step.
    pub victory: bool,
}

/// One round of play, restartable with [`reload`](Self::reload).
pub struct GameSession {
    stage: SharedStage,
    arena: Rc<RefCell<Arena>>,
    player: Player,
    encounter: Encounter,
    settings: SessionSettings,
    rng: Rc<RefCell<StdRng>>,
    scope: Scope,
    play_scope: Scope,
    encounter_task: TaskHandle,
    game_over: bool,
}

impl core::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GameSession")
            .field("scope", &self.scope.id())
            .field("play_scope", &self.play_scope.id())
            .field("game_over", &self.game_over)
            .field("arena", &self.arena)
            .field("player", &self.player)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Start a session: spawn the player and start the encounter.
    pub fn new(runtime: &Runtime, stage: SharedStage, setup: SessionSetup) -> Self {
        let arena = Rc::new(RefCell::new(Arena::new(Rc::clone(&stage), setup.arena)));
        let player = Player::new(runtime.scope(), Rc::clone(&stage), setup.player);
        let play_scope = runtime.scope();
        let encounter_task = setup.encounter.start(&play_scope, Rc::clone(&arena));
        info!(
            waves = setup.encounter.waves().len(),
            mobs = setup.encounter.mob_count(),
            seed = setup.seed,
            "Session started"
        );
        Self {
            stage,
            arena,
            player,
            encounter: setup.encounter,
            settings: setup.session,
            rng: Rc::new(RefCell::new(StdRng::seed_from_u64(setup.seed))),
            scope: runtime.scope(),
            play_scope,
            encounter_task,
            game_over: false,
        }
    }

    /// Start a session from a loaded config.
    ///
    /// # Errors
    ///
    /// As for [`SessionSetup::from_config`].
    pub fn from_config(
        runtime: &Runtime,
        stage: SharedStage,
        config: &GameConfig,
    ) -> Result<Self, GameError> {
        Ok(Self::new(runtime, stage, SessionSetup::from_config(config)?))
    }

    /// The arena, shared with the encounter and firework tasks.
    pub const fn arena(&self) -> &Rc<RefCell<Arena>> {
        &self.arena
    }

    /// The player.
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// The encounter being played.
    pub const fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.arena.borrow().score()
    }

    /// Whether victory has been declared.
    pub const fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Whether the victory prompt or fireworks are still running.
    pub fn is_celebrating(&self) -> bool {
        self.game_over && self.scope.live_tasks() > 0
    }

    /// Whether every wave has spawned.
    pub fn encounter_finished(&self) -> bool {
        self.encounter_task.is_finished()
    }

    /// Per-step gameplay update. Call once per step, after
    /// [`Runtime::advance`].
    pub fn step(&mut self, runtime: &Runtime) -> SessionStep {
        let now = runtime.now();
        let time_scale = self.player.step();
        let arena = self.arena.borrow_mut().step(now);
        let resumed = runtime.run_ready();

        let mut victory = false;
        if !self.game_over {
            if self.encounter_finished() && self.arena.borrow().is_empty() {
                victory = self.game_over();
            } else {
                let text = format!("Score: {}", self.score());
                self.stage.borrow_mut().set_text(TextSlot::Score, &text);
            }
        }
        SessionStep {
            time_scale,
            arena,
            resumed,
            victory,
        }
    }

    /// Declare victory and start the replay prompt and fireworks.
    ///
    /// Returns `false` if the game was already over.
    pub fn game_over(&mut self) -> bool {
        if self.game_over {
            return false;
        }
        self.game_over = true;
        let score = self.score();
        let banner = format!("Victory!\nScore: {score}");
        {
            let mut stage = self.stage.borrow_mut();
            stage.set_text(TextSlot::Score, "");
            stage.set_text(TextSlot::GameOver, &banner);
        }
        info!(score, tick = self.scope.now(), "Game over");

        let stage = Rc::clone(&self.stage);
        let prompt_delay = self.settings.replay_prompt_millis;
        self.scope.start(move |scope| async move {
            scope.millis(prompt_delay).await;
            stage
                .borrow_mut()
                .set_text(TextSlot::GameOver, &format!("{banner}{REPLAY_PROMPT}"));
        });

        if self.settings.firework_count > 0 && !self.settings.firework_codes.is_empty() {
            let arena = Rc::clone(&self.arena);
            let rng = Rc::clone(&self.rng);
            let settings = self.settings.clone();
            self.scope.start(move |scope| async move {
                for _ in 0..settings.firework_count {
                    let delay = firework_delay(&mut *rng.borrow_mut(), &settings);
                    scope.millis(delay).await;
                    let (code, position) = {
                        let mut rng = rng.borrow_mut();
                        let pick = rng.random_range(0..settings.firework_codes.len());
                        (settings.firework_codes.get(pick), firework_position(&mut *rng))
                    };
                    let Some(code) = code else {
                        continue;
                    };
                    let mut roster = arena.borrow_mut();
                    if let Some(mob) = roster.spawn_code(code, position) {
                        roster.explode(mob, scope.now());
                        debug!(mob = %mob, code = %code, "Firework");
                    }
                }
            });
        }
        true
    }

    /// Restart the round: cancel every session task, clear the arena and the
    /// game-over state, and start the encounter again.
    pub fn reload(&mut self, runtime: &Runtime) {
        self.scope.dispose();
        self.scope = runtime.scope();
        self.play_scope.dispose();
        self.play_scope = runtime.scope();
        self.player.reset(runtime.scope());

        self.game_over = false;
        self.stage.borrow_mut().set_text(TextSlot::GameOver, "");
        let cleared = self.arena.borrow_mut().reset();
        self.encounter_task = self.encounter.start(&self.play_scope, Rc::clone(&self.arena));
        info!(cleared, tick = runtime.now(), "Session reloaded");
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.scope.dispose();
        self.play_scope.dispose();
    }
}

fn firework_delay(rng: &mut impl Rng, settings: &SessionSettings) -> u64 {
    let min = settings.firework_delay_min_millis;
    let max = settings.firework_delay_max_millis;
    if min < max { rng.random_range(min..max) } else { min }
}

/// A point uniformly distributed in the firework sphere.
fn firework_position(rng: &mut impl Rng) -> Position {
    loop {
        let x: f32 = rng.random_range(-1.0..=1.0);
        let y: f32 = rng.random_range(-1.0..=1.0);
        let z: f32 = rng.random_range(-1.0..=1.0);
        if z.mul_add(z, x.mul_add(x, y * y)) <= 1.0 {
            return Position::new(
                x.mul_add(FIREWORK_SPREAD, FIREWORK_ORIGIN.x),
                y.mul_add(FIREWORK_SPREAD, FIREWORK_ORIGIN.y),
                z.mul_add(FIREWORK_SPREAD, FIREWORK_ORIGIN.z),
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::EncounterError;

    #[test]
    fn firework_positions_stay_in_sphere() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let p = firework_position(&mut rng);
            assert!(p.distance(FIREWORK_ORIGIN) <= FIREWORK_SPREAD + 1e-3);
        }
    }

    #[test]
    fn firework_delay_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let settings = SessionSettings::default();
        for _ in 0..200 {
            let delay = firework_delay(&mut rng, &settings);
            assert!((300..1200).contains(&delay));
        }
        let fixed = SessionSettings {
            firework_delay_min_millis: 50,
            firework_delay_max_millis: 50,
            ..SessionSettings::default()
        };
        assert_eq!(firework_delay(&mut rng, &fixed), 50);
    }

    #[test]
    fn setup_from_default_config() {
        let setup = SessionSetup::from_config(&GameConfig::default()).unwrap();
        assert_eq!(setup.arena.combo, ComboSettings::default());
        assert_eq!(setup.player.swing_window.get(), 30);
        assert_eq!(setup.session.firework_count, 20);
        assert_eq!(setup.seed, 42);
    }

    #[test]
    fn setup_rejects_bad_firework_code() {
        let mut config = GameConfig::default();
        config.session.firework_codes.push("Q".to_owned());
        let err = SessionSetup::from_config(&config).unwrap_err();
        assert!(matches!(err, GameError::Code { .. }));
    }

    #[test]
    fn setup_rejects_bad_encounter_object() {
        let mut config = GameConfig::default();
        config
            .encounter
            .objects
            .insert("9".to_owned(), "R,,G".to_owned());
        let err = SessionSetup::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            GameError::Encounter {
                source: EncounterError::InvalidObject { glyph: '9', .. }
            }
        ));
    }
}
