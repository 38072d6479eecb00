//! The collaborator port: everything gameplay asks of the engine around it.
//!
//! Animation, audio, camera, UI text, physics overlap queries, and ring
//! rendering all sit behind the [`Stage`] trait. Gameplay objects share one
//! stage through a [`SharedStage`] and borrow it only for the duration of a
//! single call, so a stage implementation must never call back into the
//! arena or the player.
//!
//! [`RecordingStage`] is a headless implementation that records every call
//! and answers overlap queries from the positions it was told about.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use kickback_combo::{MobCode, RingPaint};
use kickback_core::TickSpan;
use kickback_types::{BallId, HurtType, MobId, Position};

/// Player animation clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clip {
    /// Standing still.
    Idle,
    /// Serve toss.
    Toss,
    /// Swing kick.
    HighKick,
}

impl Clip {
    /// Animator state name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Toss => "Toss",
            Self::HighKick => "High Kick",
        }
    }

    /// Crossfade duration into this clip, in seconds.
    pub const fn fade_seconds(self) -> f32 {
        match self {
            Self::Idle | Self::Toss => 0.25,
            Self::HighKick => 0.1,
        }
    }
}

/// One-shot audio cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// The player's kick connected with a ball.
    Hit,
    /// A buffered hit aged out without matching.
    Miss,
    /// A death bomb went off.
    Explosion,
}

/// UI text slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextSlot {
    /// Running score line.
    Score,
    /// Victory banner and replay prompt.
    GameOver,
}

/// Engine-side services used by gameplay.
pub trait Stage {
    /// Crossfade the player animator into `clip`.
    fn crossfade(&mut self, clip: Clip);

    /// Play a one-shot audio cue.
    fn play_cue(&mut self, cue: Cue);

    /// Shake the camera.
    fn shake_camera(&mut self, intensity: f32);

    /// Replace the text shown in a UI slot.
    fn set_text(&mut self, slot: TextSlot, text: &str);

    /// Create the visual and physical body of a new mob.
    fn spawn_mob(&mut self, mob: MobId, position: Position, code: &MobCode);

    /// Remove a mob's body.
    fn destroy_mob(&mut self, mob: MobId);

    /// Show a death-bomb explosion.
    fn explosion(&mut self, center: Position, radius: f32, hurt: HurtType);

    /// Launch a served ball with charge in `0.0..=1.0`.
    fn launch_ball(&mut self, charge: f32) -> BallId;

    /// Balls within `radius` of the player's contact point.
    fn overlap_balls(&mut self, radius: f32) -> Vec<BallId>;

    /// Kick a ball, freezing it for `hit_stop` first.
    fn strike_ball(&mut self, ball: BallId, hit_stop: TickSpan);

    /// Mobs within `radius` of `center`.
    fn overlap_mobs(&mut self, center: Position, radius: f32) -> Vec<MobId>;

    /// Set one ring parameter on a mob's renderer.
    fn paint_ring(&mut self, mob: MobId, paint: RingPaint);
}

/// A stage shared between the arena, the player, and the session.
pub type SharedStage = Rc<RefCell<dyn Stage>>;

/// A recorded [`Stage`] call. Ring paints are kept separately.
#[derive(Debug, Clone, PartialEq)]
pub enum StageCall {
    /// [`Stage::crossfade`].
    Crossfade(Clip),
    /// [`Stage::play_cue`].
    Cue(Cue),
    /// [`Stage::shake_camera`].
    Shake(f32),
    /// [`Stage::set_text`].
    Text {
        /// Slot written.
        slot: TextSlot,
        /// New text.
        text: String,
    },
    /// [`Stage::spawn_mob`].
    SpawnMob {
        /// New mob.
        mob: MobId,
        /// Spawn position.
        position: Position,
        /// Mob code as text.
        code: String,
    },
    /// [`Stage::destroy_mob`].
    DestroyMob(MobId),
    /// [`Stage::explosion`].
    Explosion {
        /// Blast center.
        center: Position,
        /// Blast radius.
        radius: f32,
        /// Hit type delivered.
        hurt: HurtType,
    },
    /// [`Stage::launch_ball`].
    LaunchBall {
        /// Ball allocated for the launch.
        ball: BallId,
        /// Serve charge.
        charge: f32,
    },
    /// [`Stage::strike_ball`].
    StrikeBall {
        /// Ball struck.
        ball: BallId,
        /// Freeze before the ball flies.
        hit_stop: TickSpan,
    },
}

/// Headless [`Stage`] that records calls.
///
/// Mob overlap queries are answered from spawn positions; ball overlap
/// queries return whatever was last set with
/// [`set_balls_in_reach`](Self::set_balls_in_reach).
#[derive(Debug, Default)]
pub struct RecordingStage {
    calls: Vec<StageCall>,
    mobs: BTreeMap<MobId, Position>,
    texts: BTreeMap<TextSlot, String>,
    paints: BTreeMap<MobId, Vec<RingPaint>>,
    balls_in_reach: Vec<BallId>,
    next_ball: u32,
}

impl RecordingStage {
    /// Create an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty stage already wrapped for sharing.
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Calls recorded so far, oldest first.
    pub fn calls(&self) -> &[StageCall] {
        &self.calls
    }

    /// Remove and return the recorded calls.
    pub fn take_calls(&mut self) -> Vec<StageCall> {
        std::mem::take(&mut self.calls)
    }

    /// Current text of a UI slot (empty if never set).
    pub fn text(&self, slot: TextSlot) -> &str {
        self.texts.get(&slot).map_or("", String::as_str)
    }

    /// Mobs with a live body.
    pub fn mob_ids(&self) -> Vec<MobId> {
        self.mobs.keys().copied().collect()
    }

    /// Position of a live mob body.
    pub fn mob_position(&self, mob: MobId) -> Option<Position> {
        self.mobs.get(&mob).copied()
    }

    /// Latest value of every ring parameter painted on `mob`.
    pub fn paints(&self, mob: MobId) -> &[RingPaint] {
        self.paints.get(&mob).map_or(&[], Vec::as_slice)
    }

    /// Set the balls the next contact overlap query finds.
    pub fn set_balls_in_reach(&mut self, balls: Vec<BallId>) {
        self.balls_in_reach = balls;
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&StageCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }
}

impl Stage for RecordingStage {
    fn crossfade(&mut self, clip: Clip) {
        self.calls.push(StageCall::Crossfade(clip));
    }

    fn play_cue(&mut self, cue: Cue) {
        self.calls.push(StageCall::Cue(cue));
    }

    fn shake_camera(&mut self, intensity: f32) {
        self.calls.push(StageCall::Shake(intensity));
    }

    fn set_text(&mut self, slot: TextSlot, text: &str) {
        // Unchanged text is not worth a record; the score is rewritten every step.
        if self.text(slot) == text {
            return;
        }
        self.texts.insert(slot, text.to_owned());
        self.calls.push(StageCall::Text {
            slot,
            text: text.to_owned(),
        });
    }

    fn spawn_mob(&mut self, mob: MobId, position: Position, code: &MobCode) {
        self.mobs.insert(mob, position);
        self.calls.push(StageCall::SpawnMob {
            mob,
            position,
            code: code.to_string(),
        });
    }

    fn destroy_mob(&mut self, mob: MobId) {
        self.mobs.remove(&mob);
        self.paints.remove(&mob);
        self.calls.push(StageCall::DestroyMob(mob));
    }

    fn explosion(&mut self, center: Position, radius: f32, hurt: HurtType) {
        self.calls.push(StageCall::Explosion {
            center,
            radius,
            hurt,
        });
    }

    fn launch_ball(&mut self, charge: f32) -> BallId {
        let ball = BallId::new(self.next_ball);
        self.next_ball = self.next_ball.saturating_add(1);
        self.calls.push(StageCall::LaunchBall { ball, charge });
        ball
    }

    fn overlap_balls(&mut self, _radius: f32) -> Vec<BallId> {
        self.balls_in_reach.clone()
    }

    fn strike_ball(&mut self, ball: BallId, hit_stop: TickSpan) {
        self.balls_in_reach.retain(|reach| *reach != ball);
        self.calls.push(StageCall::StrikeBall { ball, hit_stop });
    }

    fn overlap_mobs(&mut self, center: Position, radius: f32) -> Vec<MobId> {
        self.mobs
            .iter()
            .filter(|(_, position)| position.distance(center) <= radius)
            .map(|(mob, _)| *mob)
            .collect()
    }

    fn paint_ring(&mut self, mob: MobId, paint: RingPaint) {
        let paints = self.paints.entry(mob).or_default();
        match paints
            .iter_mut()
            .find(|old| old.ring == paint.ring && old.param == paint.param)
        {
            Some(old) => *old = paint,
            None => paints.push(paint),
        }
    }
}
