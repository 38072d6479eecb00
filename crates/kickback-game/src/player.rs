//! The player: serve and swing tasks gated on each other, plus contact.
//!
//! Inputs and animation events arrive from the host as method calls. Presses
//! spawn a task in the player's scope; releases and animation events fire
//! the [`EventSource`]s those tasks are suspended on.
//!
//! | Action | Allowed when |
//! |---|---|
//! | serve | not swinging |
//! | swing | neither serving nor swinging |
//!
//! `serving` and `swinging` are cleared by cleanup guards, so disposing the
//! player's scope mid-action leaves it ready for the next input.

use std::cell::Cell;
use std::rc::Rc;

use kickback_core::config::{ConfigError, PlayerConfig};
use kickback_core::{EventSource, Scope, TickRate, TickSpan, finally};
use tracing::{debug, info};

use crate::charge::ChargeTimer;
use crate::stage::{Clip, Cue, SharedStage};

/// Player tuning in ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSettings {
    /// How long a swing stays active without a release.
    pub swing_window: TickSpan,
    /// Charge time of a full-power serve.
    pub max_serve_charge: TickSpan,
    /// Radius of the contact overlap query.
    pub contact_radius: f32,
    /// Freeze applied to the player and struck balls on contact.
    pub hit_stop: TickSpan,
    /// Camera shake intensity on contact.
    pub camera_shake: f32,
}

impl PlayerSettings {
    /// Convert the `player` config section at the given tick rate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Clock`] if the hit-stop duration is invalid.
    pub fn from_config(config: &PlayerConfig, rate: TickRate) -> Result<Self, ConfigError> {
        Ok(Self {
            swing_window: TickSpan::ticks(config.swing_window_ticks),
            max_serve_charge: TickSpan::ticks(config.max_serve_charge_ticks),
            contact_radius: config.contact_radius,
            hit_stop: config.hit_stop(rate)?,
            camera_shake: config.camera_shake,
        })
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            swing_window: TickSpan::ticks(30),
            max_serve_charge: TickSpan::ticks(60),
            contact_radius: 1.5,
            hit_stop: TickSpan::ticks(30),
            camera_shake: 20.0,
        }
    }
}

#[derive(Debug, Default)]
struct PlayerState {
    serving: Cell<bool>,
    swinging: Cell<bool>,
    hit_stop: Cell<u64>,
}

/// Input edges and animation events the action tasks wait on.
#[derive(Debug, Clone, Default)]
struct PlayerSignals {
    serve_released: EventSource,
    swing_released: EventSource,
    launch_ball: EventSource,
    end_serve: EventSource,
}

/// The kicker.
pub struct Player {
    scope: Scope,
    stage: SharedStage,
    settings: PlayerSettings,
    state: Rc<PlayerState>,
    signals: PlayerSignals,
    charge: ChargeTimer,
}

impl core::fmt::Debug for Player {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Player")
            .field("scope", &self.scope.id())
            .field("serving", &self.is_serving())
            .field("swinging", &self.is_swinging())
            .field("hit_stop", &self.hit_stop_ticks())
            .finish_non_exhaustive()
    }
}

impl Player {
    /// Create a player whose actions run in `scope`.
    pub fn new(scope: Scope, stage: SharedStage, settings: PlayerSettings) -> Self {
        Self {
            scope,
            stage,
            settings,
            state: Rc::new(PlayerState::default()),
            signals: PlayerSignals::default(),
            charge: ChargeTimer::new(),
        }
    }

    /// Player tuning.
    pub const fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    /// Whether a serve is in progress.
    pub fn is_serving(&self) -> bool {
        self.state.serving.get()
    }

    /// Whether a swing is in progress.
    pub fn is_swinging(&self) -> bool {
        self.state.swinging.get()
    }

    /// Whether a serve press would be accepted.
    pub fn can_serve(&self) -> bool {
        !self.is_swinging()
    }

    /// Whether a swing press would be accepted.
    pub fn can_swing(&self) -> bool {
        !self.is_serving() && !self.is_swinging()
    }

    /// Remaining hit-stop ticks.
    pub fn hit_stop_ticks(&self) -> u64 {
        self.state.hit_stop.get()
    }

    /// Charge fraction of the most recent serve.
    pub fn serve_charge(&self) -> f32 {
        self.charge.fraction()
    }

    /// Serve button pressed. Returns `false` if serving is not allowed.
    pub fn press_serve(&self) -> bool {
        if !self.can_serve() {
            debug!("Serve ignored while swinging");
            return false;
        }
        let state = Rc::clone(&self.state);
        let stage = Rc::clone(&self.stage);
        let signals = self.signals.clone();
        let charge = self.charge.clone();
        let max_charge = self.settings.max_serve_charge.get();
        self.scope.start(move |scope| async move {
            state.serving.set(true);
            let _serving = finally(move || state.serving.set(false));
            stage.borrow_mut().crossfade(Clip::Toss);

            // Registered up front so an early launch event is not lost.
            let launch = scope.listen_for(&signals.launch_ball);
            let _ = scope
                .any([
                    kickback_core::Waiter::future(charge.charge(&scope, max_charge)),
                    scope.listen_for(&signals.serve_released).into(),
                ])
                .await;
            launch.await;

            let power = charge.fraction();
            let ball = stage.borrow_mut().launch_ball(power);
            info!(ball = %ball, charge = power, tick = scope.now(), "Ball served");

            scope.listen_for(&signals.end_serve).await;
            stage.borrow_mut().crossfade(Clip::Idle);
        });
        true
    }

    /// Serve button released.
    pub fn release_serve(&self) {
        self.signals.serve_released.fire();
    }

    /// Swing button pressed. Returns `false` if swinging is not allowed.
    pub fn press_swing(&self) -> bool {
        if !self.can_swing() {
            debug!(serving = self.is_serving(), "Swing ignored");
            return false;
        }
        let state = Rc::clone(&self.state);
        let stage = Rc::clone(&self.stage);
        let released = self.signals.swing_released.clone();
        let window = self.settings.swing_window;
        self.scope.start(move |scope| async move {
            state.swinging.set(true);
            let _swinging = finally(move || state.swinging.set(false));
            stage.borrow_mut().crossfade(Clip::HighKick);
            let _ = scope
                .any([scope.delay(window).into(), scope.listen_for(&released).into()])
                .await;
            stage.borrow_mut().crossfade(Clip::Idle);
        });
        true
    }

    /// Swing button released.
    pub fn release_swing(&self) {
        self.signals.swing_released.fire();
    }

    /// Toss animation reached its release frame.
    pub fn launch_ball(&self) {
        self.signals.launch_ball.fire();
    }

    /// Toss animation finished.
    pub fn end_serve(&self) {
        self.signals.end_serve.fire();
    }

    /// Kick animation reached its contact frame. Returns the balls struck.
    pub fn contact(&self) -> usize {
        self.state.swinging.set(false);
        let mut stage = self.stage.borrow_mut();
        let balls = stage.overlap_balls(self.settings.contact_radius);
        if balls.is_empty() {
            return 0;
        }
        let hit_stop = self.settings.hit_stop;
        self.state.hit_stop.set(hit_stop.get());
        stage.shake_camera(self.settings.camera_shake);
        stage.play_cue(Cue::Hit);
        for ball in &balls {
            stage.strike_ball(*ball, hit_stop);
        }
        debug!(balls = balls.len(), hit_stop = %hit_stop, "Contact");
        balls.len()
    }

    /// Per-step update. Returns the animation time scale for this step.
    pub fn step(&self) -> f32 {
        let remaining = self.state.hit_stop.get();
        self.state.hit_stop.set(remaining.saturating_sub(1));
        if remaining > 0 { 0.0 } else { 1.0 }
    }

    /// Cancel every action and continue in a fresh scope.
    pub fn reset(&mut self, scope: Scope) {
        self.scope.dispose();
        self.scope = scope;
        self.state.hit_stop.set(0);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.scope.dispose();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::cell::RefCell;

    use kickback_core::{Runtime, TickRate};
    use kickback_types::BallId;

    use super::*;
    use crate::stage::{RecordingStage, StageCall};

    fn setup() -> (Runtime, Player, Rc<RefCell<RecordingStage>>) {
        let rt = Runtime::new(TickRate::new(60).unwrap());
        let stage = RecordingStage::shared();
        let player = Player::new(rt.scope(), stage.clone(), PlayerSettings::default());
        (rt, player, stage)
    }

    fn advance(rt: &Runtime, ticks: u64) {
        for _ in 0..ticks {
            rt.advance().unwrap();
        }
    }

    #[test]
    fn swing_times_out_and_clears_flag() {
        let (rt, player, stage) = setup();
        assert!(player.press_swing());
        assert!(player.is_swinging());
        assert!(!player.can_swing());
        advance(&rt, 29);
        assert!(player.is_swinging());
        advance(&rt, 1);
        assert!(!player.is_swinging());
        assert_eq!(
            stage.borrow().calls(),
            &[StageCall::Crossfade(Clip::HighKick), StageCall::Crossfade(Clip::Idle)]
        );
    }

    #[test]
    fn swing_release_ends_early() {
        let (rt, player, _stage) = setup();
        player.press_swing();
        advance(&rt, 3);
        player.release_swing();
        rt.run_ready();
        assert!(!player.is_swinging());
    }

    #[test]
    fn gating_between_actions() {
        let (_rt, player, _stage) = setup();
        assert!(player.press_serve());
        assert!(player.is_serving());
        assert!(!player.press_swing());
        assert!(player.can_serve());

        let (_rt, player, _stage) = setup();
        assert!(player.press_swing());
        assert!(!player.press_serve());
        assert!(!player.press_swing());
    }

    #[test]
    fn serve_charges_until_release() {
        let (rt, player, stage) = setup();
        player.press_serve();
        advance(&rt, 15);
        player.release_serve();
        rt.run_ready();
        assert_eq!(player.serve_charge(), 0.25);

        player.launch_ball();
        rt.run_ready();
        assert!(stage
            .borrow()
            .calls()
            .contains(&StageCall::LaunchBall { ball: BallId::new(0), charge: 0.25 }));
        assert!(player.is_serving());

        player.end_serve();
        rt.run_ready();
        assert!(!player.is_serving());
        assert_eq!(stage.borrow().calls().last(), Some(&StageCall::Crossfade(Clip::Idle)));
    }

    #[test]
    fn serve_charge_caps_at_full() {
        let (rt, player, _stage) = setup();
        player.press_serve();
        advance(&rt, 90);
        player.release_serve();
        player.launch_ball();
        rt.run_ready();
        assert_eq!(player.serve_charge(), 1.0);
    }

    #[test]
    fn early_launch_event_is_not_lost() {
        let (rt, player, stage) = setup();
        player.press_serve();
        player.launch_ball();
        advance(&rt, 10);
        player.release_serve();
        rt.run_ready();
        let launches = stage
            .borrow()
            .count(|call| matches!(call, StageCall::LaunchBall { .. }));
        assert_eq!(launches, 1);
    }

    #[test]
    fn contact_applies_hit_stop() {
        let (_rt, player, stage) = setup();
        player.press_swing();
        stage.borrow_mut().set_balls_in_reach(vec![BallId::new(4)]);
        assert_eq!(player.contact(), 1);
        assert!(!player.is_swinging());
        assert_eq!(player.hit_stop_ticks(), 30);
        assert!(stage.borrow().calls().contains(&StageCall::Cue(Cue::Hit)));
        assert!(stage.borrow().calls().contains(&StageCall::Shake(20.0)));

        assert_eq!(player.step(), 0.0);
        assert_eq!(player.hit_stop_ticks(), 29);
        for _ in 0..29 {
            player.step();
        }
        assert_eq!(player.step(), 1.0);
    }

    #[test]
    fn contact_without_balls_does_nothing() {
        let (_rt, player, stage) = setup();
        assert_eq!(player.contact(), 0);
        assert_eq!(player.hit_stop_ticks(), 0);
        assert!(stage.borrow().calls().is_empty());
    }

    #[test]
    fn reset_cancels_actions_and_clears_flags() {
        let (rt, mut player, _stage) = setup();
        player.press_serve();
        assert!(player.is_serving());
        player.reset(rt.scope());
        assert!(!player.is_serving());
        assert!(player.press_swing());
    }
}
