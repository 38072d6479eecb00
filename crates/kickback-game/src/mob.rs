//! The mob actor: a combo state machine plus the events it raises.

use kickback_combo::{
    Combo, ComboError, ComboSettings, ComboStep, MobCode, RingPalette, RingView, ring_views,
};
use kickback_core::{EventSource, Tick};
use kickback_types::{HurtType, MobId, Position};
use tracing::{debug, info};

/// A target that must be hit in a fixed colored sequence.
///
/// `defeated` fires exactly once, on the step the combo completes or when the
/// mob is exploded. `missed` fires once per buffered hit that aged out.
#[derive(Debug)]
pub struct Mob {
    id: MobId,
    position: Position,
    code: MobCode,
    combo: Combo,
    defeated: EventSource,
    missed: EventSource,
}

impl Mob {
    /// Build a mob from a parsed code.
    ///
    /// # Errors
    ///
    /// Returns [`ComboError::EmptySequence`] if the code has no requirements.
    pub fn new(
        id: MobId,
        position: Position,
        code: MobCode,
        settings: ComboSettings,
    ) -> Result<Self, ComboError> {
        let combo = Combo::new(code.sequence.clone(), settings)?;
        Ok(Self {
            id,
            position,
            code,
            combo,
            defeated: EventSource::new(),
            missed: EventSource::new(),
        })
    }

    /// This mob's identifier.
    pub const fn id(&self) -> MobId {
        self.id
    }

    /// Where the mob was spawned.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// The code the mob was built from.
    pub const fn code(&self) -> &MobCode {
        &self.code
    }

    /// Hit type of the death bomb, if the mob carries one.
    pub const fn bomb(&self) -> Option<HurtType> {
        self.code.bomb
    }

    /// Combo progress.
    pub const fn combo(&self) -> &Combo {
        &self.combo
    }

    /// Fires once when the mob is defeated.
    pub const fn defeated(&self) -> &EventSource {
        &self.defeated
    }

    /// Fires once per hit that aged out of the buffer.
    pub const fn missed(&self) -> &EventSource {
        &self.missed
    }

    /// Whether the mob has been defeated.
    pub const fn is_defeated(&self) -> bool {
        self.combo.is_defeated()
    }

    /// Whether the mob was defeated by completing its whole sequence.
    pub fn completed(&self) -> bool {
        self.combo.is_defeated() && self.combo.sequence_index() == self.combo.len()
    }

    /// Buffer a hit. Returns `false` once the mob is defeated.
    pub fn on_hurt(&mut self, hurt: HurtType, now: Tick) -> bool {
        let accepted = self.combo.on_hurt(hurt, now);
        if accepted {
            debug!(mob = %self.id, tick = now, hurt = ?hurt, "Mob hurt");
        }
        accepted
    }

    /// Step the combo and raise the resulting events.
    pub fn step(&mut self, now: Tick) -> ComboStep {
        let step = self.combo.step(now);
        for miss in &step.misses {
            debug!(
                mob = %self.id,
                tick = now,
                hurt = ?miss.hurt,
                received = miss.received,
                "Hit missed"
            );
            self.missed.fire();
        }
        if step.defeated {
            info!(mob = %self.id, tick = now, code = %self.code, "Mob defeated");
            self.defeated.fire();
        }
        step
    }

    /// Defeat the mob on the spot, skipping its sequence.
    ///
    /// Returns `false` if it was already defeated.
    pub fn explode(&mut self, now: Tick) -> bool {
        if !self.combo.defeat() {
            return false;
        }
        debug!(mob = %self.id, tick = now, "Mob exploded");
        self.defeated.fire();
        true
    }

    /// Appearance of the mob's rings.
    pub fn ring_views(&self, palette: &RingPalette) -> Vec<RingView> {
        ring_views(&self.combo, palette)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn mob(code: &str) -> Mob {
        Mob::new(
            MobId::new(1),
            Position::default(),
            MobCode::parse(code).unwrap(),
            ComboSettings::default(),
        )
        .unwrap()
    }

    fn counter(source: &EventSource) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0_u32));
        let seen = Rc::clone(&count);
        source.listen(move || seen.set(seen.get().saturating_add(1)));
        count
    }

    #[test]
    fn defeated_fires_once_on_completion() {
        let mut m = mob("R,B");
        let defeats = counter(m.defeated());
        m.on_hurt(HurtType::Red, 0);
        m.step(1);
        m.on_hurt(HurtType::Blue, 5);
        m.step(6);
        m.step(7);
        assert!(m.completed());
        assert_eq!(defeats.get(), 1);
        assert!(!m.on_hurt(HurtType::Red, 8));
    }

    #[test]
    fn missed_fires_per_expired_hit() {
        let mut m = mob("R");
        let misses = counter(m.missed());
        m.on_hurt(HurtType::Green, 0);
        m.on_hurt(HurtType::Blue, 0);
        // Default window is 12 ticks; evicted once 0 + 12 < now.
        m.step(12);
        assert_eq!(misses.get(), 0);
        let step = m.step(13);
        assert_eq!(step.misses.len(), 2);
        assert_eq!(misses.get(), 2);
    }

    #[test]
    fn explode_defeats_without_completing() {
        let mut m = mob("gR,G,B");
        let defeats = counter(m.defeated());
        assert_eq!(m.bomb(), Some(HurtType::Green));
        assert!(m.explode(3));
        assert!(!m.explode(4));
        assert!(m.is_defeated());
        assert!(!m.completed());
        assert_eq!(defeats.get(), 1);
        // A later step must not fire again.
        assert!(m.step(5).is_quiet());
        assert_eq!(defeats.get(), 1);
    }
}
