//! Death bombs.
//!
//! A mob built with a bomb prefix gets a listener on its own `defeated`
//! event. The listener only queues a [`Blast`]; the arena resolves queued
//! blasts after stepping every combo, so blast hits enter the ordinary hit
//! buffer and are matched on the following step.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use kickback_core::ListenerId;
use kickback_types::{HurtType, MobId, Position};
use tracing::debug;

use crate::mob::Mob;

/// Blast radius of a death bomb.
pub const DEFAULT_BLAST_RADIUS: f32 = 10.0;

/// A death bomb that went off and still has to deliver its hits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blast {
    /// Mob that carried the bomb; never hit by its own blast.
    pub owner: MobId,
    /// Blast center.
    pub center: Position,
    /// Blast radius.
    pub radius: f32,
    /// Hit type delivered to every mob in range.
    pub hurt: HurtType,
}

/// Blasts waiting to be resolved, shared between bomb listeners and the arena.
#[derive(Debug, Clone, Default)]
pub struct BlastQueue {
    pending: Rc<RefCell<VecDeque<Blast>>>,
}

impl BlastQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a blast.
    pub fn push(&self, blast: Blast) {
        self.pending.borrow_mut().push_back(blast);
    }

    /// Remove every queued blast, oldest first.
    pub fn drain(&self) -> Vec<Blast> {
        self.pending.borrow_mut().drain(..).collect()
    }

    /// Number of queued blasts.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

/// Attach a death bomb to `mob` if its code carries one.
pub fn arm(mob: &Mob, radius: f32, queue: &BlastQueue) -> Option<ListenerId> {
    let hurt = mob.bomb()?;
    let blast = Blast {
        owner: mob.id(),
        center: mob.position(),
        radius,
        hurt,
    };
    let queue = queue.clone();
    debug!(mob = %blast.owner, hurt = ?hurt, radius, "Death bomb armed");
    Some(mob.defeated().listen(move || queue.push(blast)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kickback_combo::{ComboSettings, MobCode};

    use super::*;

    fn mob(code: &str) -> Mob {
        Mob::new(
            MobId::new(7),
            Position::new(1.0, 2.0, 3.0),
            MobCode::parse(code).unwrap(),
            ComboSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn plain_mob_has_no_bomb() {
        let queue = BlastQueue::new();
        assert!(arm(&mob("R,G"), DEFAULT_BLAST_RADIUS, &queue).is_none());
    }

    #[test]
    fn defeat_queues_one_blast() {
        let queue = BlastQueue::new();
        let mut m = mob("bR");
        assert!(arm(&m, DEFAULT_BLAST_RADIUS, &queue).is_some());
        assert!(queue.is_empty());

        m.explode(1);
        assert_eq!(queue.len(), 1);
        let blasts = queue.drain();
        assert_eq!(
            blasts,
            vec![Blast {
                owner: MobId::new(7),
                center: Position::new(1.0, 2.0, 3.0),
                radius: DEFAULT_BLAST_RADIUS,
                hurt: HurtType::Blue,
            }]
        );
        assert!(queue.is_empty());
    }
}
