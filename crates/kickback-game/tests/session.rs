//! Full session runs: waves spawn on schedule, hits defeat mobs, victory
//! starts the replay prompt and fireworks, and reload starts a clean round.

// Tests use unwrap for clarity -- panicking on failure is the correct
// behavior in test code.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use kickback_core::{Runtime, TickRate};
use kickback_game::{
    ArenaSettings, Encounter, GameSession, PlayerSettings, RecordingStage, SessionSettings,
    SessionSetup, SessionStep, StageCall, TextSlot,
};
use kickback_types::{HurtType, MobId};

const ONE_WAVE: &str = "1\n12\n\n\n\n";

fn setup(script: &str) -> SessionSetup {
    let objects = BTreeMap::from([
        ('1', "R".to_owned()),
        ('2', "G".to_owned()),
        ('3', "rB".to_owned()),
    ]);
    SessionSetup {
        arena: ArenaSettings::default(),
        player: PlayerSettings::default(),
        session: SessionSettings {
            firework_count: 3,
            firework_delay_min_millis: 100,
            firework_delay_max_millis: 200,
            replay_prompt_millis: 500,
            firework_codes: vec!["B".to_owned()],
        },
        encounter: Encounter::parse(script, &objects).unwrap(),
        seed: 1,
    }
}

struct Harness {
    rt: Runtime,
    stage: Rc<RefCell<RecordingStage>>,
    session: GameSession,
}

impl Harness {
    fn new(script: &str) -> Self {
        let rt = Runtime::new(TickRate::new(60).unwrap());
        let stage = RecordingStage::shared();
        let session = GameSession::new(&rt, stage.clone(), setup(script));
        Self { rt, stage, session }
    }

    fn step(&mut self) -> SessionStep {
        self.rt.advance().unwrap();
        self.session.step(&self.rt)
    }

    fn steps(&mut self, count: u64) {
        for _ in 0..count {
            self.step();
        }
    }

    fn hurt(&self, mob: MobId, hurt: HurtType) -> bool {
        self.session
            .arena()
            .borrow_mut()
            .hurt(mob, hurt, self.rt.now())
    }

    fn text(&self, slot: TextSlot) -> String {
        self.stage.borrow().text(slot).to_owned()
    }

    fn firework_spawns(&self) -> usize {
        self.stage
            .borrow()
            .count(|call| matches!(call, StageCall::SpawnMob { code, .. } if code == "B"))
    }
}

#[test]
fn wave_spawns_after_its_delay() {
    let mut h = Harness::new(ONE_WAVE);
    h.steps(59);
    assert!(h.session.arena().borrow().is_empty());
    assert!(!h.session.encounter_finished());
    assert_eq!(h.text(TextSlot::Score), "Score: 0");

    h.step();
    assert_eq!(h.rt.now(), 60);
    assert_eq!(h.session.arena().borrow().live_mobs(), 2);
    assert!(h.session.encounter_finished());
    assert!(!h.session.is_game_over());
}

#[test]
fn clearing_the_arena_wins() {
    let mut h = Harness::new(ONE_WAVE);
    h.steps(60);
    let ids = h.session.arena().borrow().mob_ids();
    assert_eq!(ids.len(), 2);

    assert!(h.hurt(ids[0], HurtType::Red));
    let step = h.step();
    assert_eq!(step.arena.scored, 1);
    assert!(!step.victory);
    assert_eq!(h.text(TextSlot::Score), "Score: 1");

    assert!(h.hurt(ids[1], HurtType::Green));
    let step = h.step();
    assert!(step.victory);
    assert!(h.session.is_game_over());
    assert_eq!(h.session.score(), 2);
    assert_eq!(h.text(TextSlot::Score), "");
    assert_eq!(h.text(TextSlot::GameOver), "Victory!\nScore: 2");
}

#[test]
fn victory_runs_prompt_and_fireworks() {
    let mut h = Harness::new(ONE_WAVE);
    h.steps(60);
    let ids = h.session.arena().borrow().mob_ids();
    assert!(h.hurt(ids[0], HurtType::Red));
    assert!(h.hurt(ids[1], HurtType::Green));
    assert!(h.step().victory);
    assert!(h.session.is_celebrating());

    // 500 ms at 60 ticks per second.
    h.steps(29);
    assert_eq!(h.text(TextSlot::GameOver), "Victory!\nScore: 2");
    h.step();
    assert_eq!(
        h.text(TextSlot::GameOver),
        "Victory!\nScore: 2\nPress 'r' to play again"
    );

    h.steps(60);
    assert_eq!(h.firework_spawns(), 3);
    assert!(!h.session.is_celebrating());
    // Fireworks explode on the spot and never score.
    assert!(h.session.arena().borrow().is_empty());
    assert_eq!(h.session.score(), 2);
    assert_eq!(h.rt.live_tasks(), 0);
}

#[test]
fn victory_is_declared_once() {
    let mut h = Harness::new("0\n\n\n\n\n");
    assert!(h.step().victory);
    for _ in 0..10 {
        assert!(!h.step().victory);
    }
    assert!(!h.session.game_over());
}

#[test]
fn reload_cancels_fireworks_and_restarts_encounter() {
    let mut h = Harness::new(ONE_WAVE);
    h.steps(60);
    let ids = h.session.arena().borrow().mob_ids();
    for id in ids {
        assert!(h.session.arena().borrow_mut().explode(id, h.rt.now()));
    }
    assert!(h.step().victory);
    // No firework delay is shorter than 6 ticks.
    h.steps(3);
    assert_eq!(h.firework_spawns(), 0);

    h.session.reload(&h.rt);
    assert!(!h.session.is_game_over());
    assert_eq!(h.text(TextSlot::GameOver), "");
    assert_eq!(h.session.score(), 0);
    assert!(!h.session.encounter_finished());

    h.steps(120);
    assert_eq!(h.firework_spawns(), 0);
    assert_eq!(h.session.arena().borrow().live_mobs(), 2);
    assert!(!h.session.is_game_over());
    assert_eq!(h.text(TextSlot::Score), "Score: 0");
}

#[test]
fn reload_mid_wave_clears_live_mobs() {
    let mut h = Harness::new("1\n1\n\n\n\n2\n2\n\n\n\n");
    h.steps(60);
    assert_eq!(h.session.arena().borrow().live_mobs(), 1);
    h.session.reload(&h.rt);
    assert!(h.session.arena().borrow().is_empty());
    assert!(h.stage.borrow().mob_ids().is_empty());

    // The restarted encounter waits its full first delay again.
    h.steps(59);
    assert!(h.session.arena().borrow().is_empty());
    h.step();
    assert_eq!(h.session.arena().borrow().live_mobs(), 1);
}

#[test]
fn death_bomb_chain_in_session() {
    let mut h = Harness::new("0\n3 2\n\n\n\n");
    let ids = h.session.arena().borrow().mob_ids();
    assert_eq!(ids.len(), 2);

    h.hurt(ids[0], HurtType::Blue);
    // The bomber falls, then the blast (Blue) lands on the Green mob, which
    // it does not match; it ages out as a miss.
    h.step();
    assert_eq!(h.session.arena().borrow().live_mobs(), 1);
    h.steps(20);
    let misses = h
        .stage
        .borrow()
        .count(|call| *call == StageCall::Cue(kickback_game::Cue::Miss));
    assert_eq!(misses, 1);

    h.hurt(ids[1], HurtType::Green);
    assert!(h.step().victory);
    assert_eq!(h.session.score(), 2);
}

#[test]
fn dropping_the_session_cancels_its_tasks() {
    let mut h = Harness::new(ONE_WAVE);
    h.session.player().press_swing();
    h.steps(5);
    assert!(h.rt.live_tasks() > 0);
    let Harness { rt, stage, session } = h;
    drop(session);
    assert_eq!(rt.live_tasks(), 0);
    drop(stage);
}
