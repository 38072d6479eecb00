//! Ordered, buffered hit-sequence validation applied to a mob each tick.
//!
//! A [`Combo`] holds a fixed sequence of [`HurtRequirement`]s. Hits arrive
//! through [`Combo::on_hurt`] and are always buffered with the tick they
//! arrived on; the per-tick [`Combo::step`] does the rest:
//!
//! 1. Evict buffered hits older than the hit window. Each evicted hit never
//!    matched anything and is reported as a miss.
//! 2. Satisfy requirements in order for as long as the buffer allows. Each
//!    satisfaction advances the sequence index and refills regen; reaching
//!    the end of the sequence latches the mob as defeated.
//! 3. Decay regen by one tick, unless something was satisfied this step.
//!    Running out steps the sequence back one ring (refilling regen), or
//!    drops the combo to idle from the first ring.
//!
//! Once defeated, a combo ignores every further hit and step.

use kickback_core::Tick;
use kickback_types::{HurtRequirement, HurtType};
use tracing::trace;

use crate::config::ComboSettings;
use crate::error::ComboError;

/// One observed hit waiting in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HurtEvent {
    /// Hit type.
    pub hurt: HurtType,
    /// Tick the hit arrived on.
    pub received: Tick,
}

/// What happened during one [`Combo::step`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboStep {
    /// Requirements satisfied this step.
    pub satisfied: u32,
    /// Whether this step latched the defeated transition.
    pub defeated: bool,
    /// Hits that aged out of the buffer without matching.
    pub misses: Vec<HurtEvent>,
    /// Whether regen ran out and the sequence stepped back this step.
    pub decayed: bool,
}

impl ComboStep {
    /// Whether anything observable happened.
    pub fn is_quiet(&self) -> bool {
        self.satisfied == 0 && !self.defeated && self.misses.is_empty() && !self.decayed
    }
}

/// Per-mob combo progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combo {
    sequence: Vec<HurtRequirement>,
    settings: ComboSettings,
    buffer: Vec<HurtEvent>,
    index: usize,
    regen_remaining: u64,
    defeated: bool,
}

impl Combo {
    /// Create an idle combo for the given sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ComboError::EmptySequence`] if `sequence` is empty.
    pub fn new(
        sequence: Vec<HurtRequirement>,
        settings: ComboSettings,
    ) -> Result<Self, ComboError> {
        if sequence.is_empty() {
            return Err(ComboError::EmptySequence);
        }
        Ok(Self {
            sequence,
            settings,
            buffer: Vec::new(),
            index: 0,
            regen_remaining: 0,
            defeated: false,
        })
    }

    /// The required sequence.
    pub fn sequence(&self) -> &[HurtRequirement] {
        &self.sequence
    }

    /// Number of requirements.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Always false; a combo has at least one requirement.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Timing this combo was built with.
    pub const fn settings(&self) -> ComboSettings {
        self.settings
    }

    /// Number of requirements satisfied so far, in `0..=len()`.
    pub const fn sequence_index(&self) -> usize {
        self.index
    }

    /// Ticks left before the current ring decays.
    pub const fn regen_ticks_remaining(&self) -> u64 {
        self.regen_remaining
    }

    /// Whether the defeated transition has fired.
    pub const fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Hits currently buffered, oldest first.
    pub fn buffered(&self) -> &[HurtEvent] {
        &self.buffer
    }

    /// The requirement the combo is waiting on, if any.
    pub fn current_requirement(&self) -> Option<HurtRequirement> {
        self.sequence.get(self.index).copied()
    }

    /// Record a hit received on tick `now`.
    ///
    /// Returns `false` (and records nothing) once the combo is defeated.
    pub fn on_hurt(&mut self, hurt: HurtType, now: Tick) -> bool {
        if self.defeated {
            return false;
        }
        self.buffer.push(HurtEvent {
            hurt,
            received: now,
        });
        true
    }

    /// Latch the defeated transition without completing the sequence.
    ///
    /// Returns `false` if the combo was already defeated.
    pub fn defeat(&mut self) -> bool {
        if self.defeated {
            return false;
        }
        self.defeated = true;
        self.buffer.clear();
        true
    }

    /// Run one tick of eviction, matching, and decay.
    pub fn step(&mut self, now: Tick) -> ComboStep {
        let mut step = ComboStep::default();
        if self.defeated {
            return step;
        }

        // 1. Evict hits older than the window
        let window = self.settings.hurt_buffer.get();
        let (expired, kept): (Vec<HurtEvent>, Vec<HurtEvent>) = std::mem::take(&mut self.buffer)
            .into_iter()
            .partition(|event| event.received.saturating_add(window) < now);
        self.buffer = kept;
        step.misses = expired;

        // 2. Satisfy requirements in order
        while let Some(requirement) = self.current_requirement() {
            if !self.take_match(requirement) {
                break;
            }
            self.index = self.index.saturating_add(1);
            self.regen_remaining = self.settings.regen.get();
            step.satisfied = step.satisfied.saturating_add(1);
            if self.index == self.sequence.len() {
                self.defeated = true;
                step.defeated = true;
                trace!(tick = now, "Combo completed");
                return step;
            }
        }

        // 3. Decay, unless progress was made this step
        if step.satisfied == 0 {
            step.decayed = self.decay();
        }
        step
    }

    /// Remove the buffered hits that satisfy `requirement`, if present.
    fn take_match(&mut self, requirement: HurtRequirement) -> bool {
        match requirement {
            HurtRequirement::Single(hurt) => {
                let Some(found) = self.buffer.iter().position(|event| event.hurt == hurt) else {
                    return false;
                };
                let _ = self.buffer.remove(found);
                true
            }
            HurtRequirement::Split { left, right } => {
                let first = self.buffer.iter().position(|event| event.hurt == left);
                let last = self.buffer.iter().rposition(|event| event.hurt == right);
                let (Some(first), Some(last)) = (first, last) else {
                    return false;
                };
                if first == last {
                    return false;
                }
                // Remove the higher index first so the lower stays valid.
                let _ = self.buffer.remove(first.max(last));
                let _ = self.buffer.remove(first.min(last));
                true
            }
        }
    }

    /// Returns whether the sequence stepped back.
    fn decay(&mut self) -> bool {
        if self.index == 0 && self.regen_remaining == 0 {
            return false;
        }
        self.regen_remaining = self.regen_remaining.saturating_sub(1);
        if self.regen_remaining > 0 {
            return false;
        }
        if self.index > 1 {
            self.index = self.index.saturating_sub(1);
            self.regen_remaining = self.settings.regen.get();
        } else {
            self.index = 0;
            self.regen_remaining = 0;
        }
        true
    }
}
