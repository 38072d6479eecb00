//! Scripted input for headless runs.
//!
//! [`HitFeed`] is the per-step callback of the host loop. It steps the
//! session, plays the player through a fixed serve-and-swing cycle, and
//! throws seeded random volleys at live mobs. Most volleys match the mob's
//! current requirement so rounds finish; the rest are noise that ages out
//! as misses. After a victory the feed waits for the celebration to end,
//! then reloads the session for the next round or stops the loop.

use std::cell::RefCell;
use std::rc::Rc;

use kickback_core::runner::{StepCallback, StepControl};
use kickback_core::{Runtime, Tick};
use kickback_game::GameSession;
use kickback_types::{HurtRequirement, HurtType, MobId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::headless::HeadlessStage;

/// Ticks in one serve-and-swing cycle.
const PLAYER_CYCLE: u64 = 120;

/// Feed behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSettings {
    /// Ticks between volleys (0 = no volleys).
    pub volley_interval: u64,
    /// Probability that a volley matches the target's current requirement.
    pub accuracy: f64,
    /// Rounds to play after the first one.
    pub replays: u32,
    /// Whether to drive the player's serve and swing.
    pub drive_player: bool,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            volley_interval: 6,
            accuracy: 0.8,
            replays: 1,
            drive_player: true,
        }
    }
}

/// Totals kept by the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedTally {
    /// Hits thrown at mobs.
    pub hits: u64,
    /// Hits a live combo accepted into its buffer.
    pub accepted: u64,
    /// Rounds won.
    pub victories: u32,
    /// Balls the player kicked.
    pub contacts: u64,
}

/// Per-step driver for a [`GameSession`] on a [`HeadlessStage`].
#[derive(Debug)]
pub struct HitFeed {
    session: GameSession,
    stage: Rc<RefCell<HeadlessStage>>,
    rng: StdRng,
    settings: FeedSettings,
    replays_left: u32,
    tally: FeedTally,
}

impl HitFeed {
    /// Drive `session`, whose stage is `stage`, seeding volleys from `seed`.
    pub fn new(
        session: GameSession,
        stage: Rc<RefCell<HeadlessStage>>,
        settings: FeedSettings,
        seed: u64,
    ) -> Self {
        Self {
            session,
            stage,
            // Offset so volleys do not replay the session's firework draws.
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
            settings,
            replays_left: settings.replays,
            tally: FeedTally::default(),
        }
    }

    /// Totals so far.
    pub const fn tally(&self) -> FeedTally {
        self.tally
    }

    /// The session being driven.
    pub const fn session(&self) -> &GameSession {
        &self.session
    }

    fn drive_player(&mut self, tick: Tick) {
        let player = self.session.player();
        match tick.checked_rem(PLAYER_CYCLE) {
            Some(1) => {
                player.press_serve();
            }
            Some(24) => player.release_serve(),
            Some(30) => player.launch_ball(),
            Some(40) => player.end_serve(),
            Some(50) => {
                player.press_swing();
            }
            Some(56) => {
                let struck = player.contact();
                let struck = u64::try_from(struck).unwrap_or(u64::MAX);
                self.tally.contacts = self.tally.contacts.saturating_add(struck);
            }
            Some(62) => player.release_swing(),
            _ => {}
        }
    }

    /// Throw one volley at a random live mob.
    fn volley(&mut self, now: Tick) {
        let (target, requirement) = {
            let arena = self.session.arena().borrow();
            let ids = arena.mob_ids();
            if ids.is_empty() {
                return;
            }
            let pick = self.rng.random_range(0..ids.len());
            let Some(&target) = ids.get(pick) else {
                return;
            };
            let requirement = arena
                .mob(target)
                .and_then(|mob| mob.combo().current_requirement());
            (target, requirement)
        };

        let hits = match requirement {
            Some(requirement) if self.rng.random_bool(self.settings.accuracy) => {
                matching_hits(requirement)
            }
            _ => vec![self.random_hurt()],
        };
        for hurt in hits {
            self.hit(target, hurt, now);
        }
    }

    fn hit(&mut self, target: MobId, hurt: HurtType, now: Tick) {
        let accepted = self.session.arena().borrow_mut().hurt(target, hurt, now);
        self.tally.hits = self.tally.hits.saturating_add(1);
        if accepted {
            self.tally.accepted = self.tally.accepted.saturating_add(1);
        }
        debug!(mob = %target, hurt = %hurt, accepted, tick = now, "Volley");
    }

    fn random_hurt(&mut self) -> HurtType {
        let pick = self.rng.random_range(0..HurtType::ALL.len());
        HurtType::ALL.get(pick).copied().unwrap_or(HurtType::Red)
    }
}

/// The hits that satisfy `requirement`, in buffer order.
fn matching_hits(requirement: HurtRequirement) -> Vec<HurtType> {
    match requirement {
        HurtRequirement::Single(hurt) => vec![hurt],
        HurtRequirement::Split { left, right } => vec![left, right],
    }
}

impl StepCallback for HitFeed {
    fn on_step(&mut self, runtime: &Runtime, tick: Tick) -> StepControl {
        let step = self.session.step(runtime);
        if step.victory {
            self.tally.victories = self.tally.victories.saturating_add(1);
            info!(tick, score = self.session.score(), "Round won");
        }

        let mut control = StepControl::Continue;
        if self.session.is_game_over() {
            if !self.session.is_celebrating() {
                if self.replays_left == 0 {
                    control = StepControl::Stop;
                } else {
                    self.replays_left = self.replays_left.saturating_sub(1);
                    self.session.reload(runtime);
                }
            }
        } else if step.time_scale > 0.0 {
            if self.settings.drive_player {
                self.drive_player(tick);
            }
            if self.settings.volley_interval > 0
                && tick.checked_rem(self.settings.volley_interval) == Some(0)
            {
                self.volley(runtime.now());
            }
            // Tasks woken by this step's input resume before the stage flush.
            let resumed = runtime.run_ready();
            trace!(tick, resumed, "Input tasks resumed");
        }

        self.stage.borrow_mut().flush();
        control
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kickback_core::TickRate;
    use kickback_core::config::GameConfig;
    use kickback_core::runner::{RunBounds, RunEndReason, run_fixed_steps};
    use kickback_game::SharedStage;

    use super::*;

    fn feed(settings: FeedSettings, yaml: &str) -> (Runtime, HitFeed) {
        let config = GameConfig::parse(yaml).unwrap();
        let rt = Runtime::new(TickRate::new(60).unwrap());
        let stage = Rc::new(RefCell::new(HeadlessStage::new()));
        let shared: SharedStage = Rc::clone(&stage) as SharedStage;
        let session = GameSession::from_config(&rt, shared, &config).unwrap();
        let feed = HitFeed::new(session, stage, settings, 7);
        (rt, feed)
    }

    const SHORT: &str = "
session:
  firework_count: 2
  firework_delay_min_millis: 100
  firework_delay_max_millis: 200
  replay_prompt_millis: 500
encounter:
  script: \"0\\n1 2\\n\\n\\n\\n\"
  objects:
    '1': R
    '2': gG,B
";

    #[test]
    fn split_requirements_need_both_halves() {
        let split = HurtRequirement::Split {
            left: HurtType::Red,
            right: HurtType::Blue,
        };
        assert_eq!(matching_hits(split), vec![HurtType::Red, HurtType::Blue]);
        assert_eq!(
            matching_hits(HurtRequirement::Single(HurtType::Green)),
            vec![HurtType::Green]
        );
    }

    #[tokio::test]
    async fn accurate_feed_wins_every_round() {
        let settings = FeedSettings {
            accuracy: 1.0,
            replays: 2,
            ..FeedSettings::default()
        };
        let (rt, mut feed) = feed(settings, SHORT);
        let bounds = RunBounds {
            max_ticks: 3_000,
            tick_interval_ms: 0,
        };
        let result = run_fixed_steps(&rt, bounds, &mut feed).await.unwrap();
        assert_eq!(result.end_reason, RunEndReason::Stopped);
        assert_eq!(feed.tally().victories, 3);
        assert!(feed.session().is_game_over());
        assert_eq!(feed.session().score(), 2);
        assert!(feed.tally().accepted >= 3);
    }

    #[tokio::test]
    async fn player_cycle_serves_and_kicks() {
        let settings = FeedSettings {
            volley_interval: 0,
            ..FeedSettings::default()
        };
        let (rt, mut feed) = feed(settings, SHORT);
        let stage = Rc::clone(&feed.stage);
        let bounds = RunBounds {
            max_ticks: PLAYER_CYCLE,
            tick_interval_ms: 0,
        };
        run_fixed_steps(&rt, bounds, &mut feed).await.unwrap();
        assert_eq!(feed.tally().contacts, 1);
        let tally = stage.borrow().tally();
        assert_eq!(tally.launches, 1);
        assert_eq!(tally.strikes, 1);
        assert_eq!(stage.borrow().balls_in_reach(), 0);
        assert!(!feed.session().player().is_serving());
    }

    #[test]
    fn released_serve_launches_in_the_same_step() {
        let settings = FeedSettings {
            volley_interval: 0,
            ..FeedSettings::default()
        };
        let (rt, mut feed) = feed(settings, SHORT);
        let stage = Rc::clone(&feed.stage);
        for _ in 0..30 {
            let tick = rt.advance().unwrap();
            feed.on_step(&rt, tick);
        }
        assert_eq!(rt.now(), 30);
        assert_eq!(stage.borrow().tally().launches, 1);
        assert_eq!(stage.borrow().balls_in_reach(), 1);
    }

    #[tokio::test]
    async fn idle_feed_runs_to_the_tick_limit() {
        let settings = FeedSettings {
            volley_interval: 0,
            drive_player: false,
            ..FeedSettings::default()
        };
        let (rt, mut feed) = feed(settings, SHORT);
        let bounds = RunBounds {
            max_ticks: 120,
            tick_interval_ms: 0,
        };
        let result = run_fixed_steps(&rt, bounds, &mut feed).await.unwrap();
        assert_eq!(result.end_reason, RunEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 120);
        assert_eq!(feed.tally(), FeedTally::default());
        assert_eq!(feed.session().arena().borrow().live_mobs(), 2);
    }
}
