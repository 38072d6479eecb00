//! Headless stage for running sessions without an engine attached.
//!
//! [`HeadlessStage`] answers every [`Stage`] query through a
//! [`RecordingStage`], keeps served balls in reach until they are struck,
//! and turns the recorded calls into log lines and running totals once per
//! step so the record never grows past a single step.

use kickback_combo::{MobCode, RingPaint};
use kickback_core::TickSpan;
use kickback_game::{Clip, Cue, RecordingStage, Stage, StageCall, TextSlot};
use kickback_types::{BallId, HurtType, MobId, Position};
use tracing::{debug, info};

/// Running totals of stage activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTally {
    /// Mob bodies created.
    pub spawned: u64,
    /// Mob bodies removed.
    pub destroyed: u64,
    /// Death-bomb explosions shown.
    pub explosions: u64,
    /// Buffered hits that aged out.
    pub misses: u64,
    /// Balls served.
    pub launches: u64,
    /// Balls kicked.
    pub strikes: u64,
}

/// A [`Stage`] with no engine behind it.
#[derive(Debug, Default)]
pub struct HeadlessStage {
    record: RecordingStage,
    in_reach: Vec<BallId>,
    tally: StageTally,
}

impl HeadlessStage {
    /// Create an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals so far. Calls since the last [`flush`](Self::flush) are not
    /// counted yet.
    pub const fn tally(&self) -> StageTally {
        self.tally
    }

    /// Current text of a UI slot.
    pub fn text(&self, slot: TextSlot) -> &str {
        self.record.text(slot)
    }

    /// Served balls not yet struck.
    pub fn balls_in_reach(&self) -> usize {
        self.in_reach.len()
    }

    /// Log and count the calls recorded since the last flush, then drop
    /// them. Returns how many calls were flushed.
    pub fn flush(&mut self) -> usize {
        let calls = self.record.take_calls();
        for call in &calls {
            self.count(call);
            log_call(call);
        }
        calls.len()
    }

    fn count(&mut self, call: &StageCall) {
        let tally = &mut self.tally;
        let counter = match call {
            StageCall::SpawnMob { .. } => &mut tally.spawned,
            StageCall::DestroyMob(_) => &mut tally.destroyed,
            StageCall::Explosion { .. } => &mut tally.explosions,
            StageCall::Cue(Cue::Miss) => &mut tally.misses,
            StageCall::LaunchBall { .. } => &mut tally.launches,
            StageCall::StrikeBall { .. } => &mut tally.strikes,
            _ => return,
        };
        *counter = counter.saturating_add(1);
    }
}

fn log_call(call: &StageCall) {
    match call {
        StageCall::Crossfade(clip) => debug!(clip = clip.name(), "Crossfade"),
        StageCall::Cue(cue) => debug!(cue = ?cue, "Cue"),
        StageCall::Shake(intensity) => debug!(intensity, "Camera shake"),
        StageCall::Text { slot, text } => match slot {
            TextSlot::GameOver if !text.is_empty() => info!(text = %text, "Banner"),
            _ => debug!(slot = ?slot, text = %text, "Text"),
        },
        StageCall::SpawnMob {
            mob,
            position,
            code,
        } => debug!(mob = %mob, code = %code, position = ?position, "Mob spawned"),
        StageCall::DestroyMob(mob) => debug!(mob = %mob, "Mob destroyed"),
        StageCall::Explosion {
            center,
            radius,
            hurt,
        } => debug!(center = ?center, radius, hurt = %hurt, "Explosion"),
        StageCall::LaunchBall { ball, charge } => debug!(ball = %ball, charge, "Ball launched"),
        StageCall::StrikeBall { ball, hit_stop } => {
            debug!(ball = %ball, hit_stop = %hit_stop, "Ball struck");
        }
    }
}

impl Stage for HeadlessStage {
    fn crossfade(&mut self, clip: Clip) {
        self.record.crossfade(clip);
    }

    fn play_cue(&mut self, cue: Cue) {
        self.record.play_cue(cue);
    }

    fn shake_camera(&mut self, intensity: f32) {
        self.record.shake_camera(intensity);
    }

    fn set_text(&mut self, slot: TextSlot, text: &str) {
        self.record.set_text(slot, text);
    }

    fn spawn_mob(&mut self, mob: MobId, position: Position, code: &MobCode) {
        self.record.spawn_mob(mob, position, code);
    }

    fn destroy_mob(&mut self, mob: MobId) {
        self.record.destroy_mob(mob);
    }

    fn explosion(&mut self, center: Position, radius: f32, hurt: HurtType) {
        self.record.explosion(center, radius, hurt);
    }

    fn launch_ball(&mut self, charge: f32) -> BallId {
        let ball = self.record.launch_ball(charge);
        self.in_reach.push(ball);
        ball
    }

    // Every served ball is within reach until it is kicked.
    fn overlap_balls(&mut self, _radius: f32) -> Vec<BallId> {
        self.in_reach.clone()
    }

    fn strike_ball(&mut self, ball: BallId, hit_stop: TickSpan) {
        self.in_reach.retain(|reach| *reach != ball);
        self.record.strike_ball(ball, hit_stop);
    }

    fn overlap_mobs(&mut self, center: Position, radius: f32) -> Vec<MobId> {
        self.record.overlap_mobs(center, radius)
    }

    fn paint_ring(&mut self, mob: MobId, paint: RingPaint) {
        self.record.paint_ring(mob, paint);
    }
}
