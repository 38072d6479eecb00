//! Ring visualization of combo progress.
//!
//! Ring `i` shows requirement `i`, nested from the outside in. Every ring
//! has the same thickness, `regen / max_total`, narrowed to `1 / len` when
//! the sequence would not otherwise fit. The renderer collaborator
//! receives a flat list of [`RingPaint`] values keyed by the closed
//! [`RingParam`] set.
//!
//! | Phase | Fill | Colors |
//! |---|---|---|
//! | [`RingPhase::Consumed`] | full | black |
//! | [`RingPhase::Regenerating`] | grows with regen progress | regen color |
//! | [`RingPhase::Intact`] | full | type colors, dimmed while regen runs |
//!
//! A split ring paints its left type into `Color0` and its right type into
//! `Color1`; a single ring paints the same color into both.

use kickback_types::{Color, HurtRequirement};

use crate::combo::Combo;
use crate::config::RingPalette;

/// How a ring is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RingPhase {
    /// Already satisfied and no longer regenerating.
    Consumed,
    /// The most recently satisfied ring while regen runs.
    Regenerating {
        /// Regen progress in `0.0..=1.0`.
        fraction: f32,
    },
    /// Not yet satisfied.
    Intact,
}

/// The closed set of per-ring renderer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingParam {
    /// Radius the ring's fill reaches.
    OuterRadius,
    /// Inner edge of the ring.
    InnerRadius,
    /// First color (left type of a split).
    Color0,
    /// Second color (right type of a split).
    Color1,
}

/// A value for one [`RingParam`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RingValue {
    /// A radius in `0.0..=1.0`.
    Radius(f32),
    /// A color.
    Color(Color),
}

/// One parameter assignment for the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPaint {
    /// Ring index.
    pub ring: usize,
    /// Parameter to set.
    pub param: RingParam,
    /// Value to set it to.
    pub value: RingValue,
}

/// Computed appearance of one ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingView {
    /// Ring index, equal to the requirement index.
    pub index: usize,
    /// Requirement the ring stands for.
    pub requirement: HurtRequirement,
    /// Drawing phase.
    pub phase: RingPhase,
    /// Radius the fill reaches.
    pub fill_radius: f32,
    /// Inner edge.
    pub inner_radius: f32,
    /// First color.
    pub color0: Color,
    /// Second color.
    pub color1: Color,
}

impl RingView {
    /// The four renderer parameters of this ring.
    pub const fn paints(&self) -> [RingPaint; 4] {
        let ring = self.index;
        [
            RingPaint {
                ring,
                param: RingParam::OuterRadius,
                value: RingValue::Radius(self.fill_radius),
            },
            RingPaint {
                ring,
                param: RingParam::InnerRadius,
                value: RingValue::Radius(self.inner_radius),
            },
            RingPaint {
                ring,
                param: RingParam::Color0,
                value: RingValue::Color(self.color0),
            },
            RingPaint {
                ring,
                param: RingParam::Color1,
                value: RingValue::Color(self.color1),
            },
        ]
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn ratio(numerator: u64, denominator: u64) -> f32 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64).clamp(0.0, 1.0) as f32
}

/// Phase of ring `index` for the given combo state.
pub fn ring_phase(combo: &Combo, index: usize) -> RingPhase {
    let progress = combo.sequence_index();
    let regen = combo.regen_ticks_remaining();
    let full = combo.settings().regen.get();
    let regenerating = progress.saturating_sub(1);
    if index == regenerating && regen > 0 {
        RingPhase::Regenerating {
            fraction: ratio(full.saturating_sub(regen), full),
        }
    } else if index < progress {
        RingPhase::Consumed
    } else {
        RingPhase::Intact
    }
}

/// Compute the appearance of every ring of `combo`.
pub fn ring_views(combo: &Combo, palette: &RingPalette) -> Vec<RingView> {
    let settings = combo.settings();
    let rings = u64::try_from(combo.len()).unwrap_or(u64::MAX);
    let thickness = ratio(settings.regen.get(), settings.max_total.get()).min(ratio(1, rings));
    let full = settings.regen.get();
    // Intact rings fade back in while the current ring regenerates.
    let charge = if combo.regen_ticks_remaining() > 0 {
        ratio(full.saturating_sub(combo.regen_ticks_remaining()), full)
    } else {
        1.0
    };

    let mut outer = 1.0_f32;
    combo
        .sequence()
        .iter()
        .enumerate()
        .map(|(index, requirement)| {
            let inner = (outer - thickness).max(0.0);
            let phase = ring_phase(combo, index);
            let (fill_radius, color0, color1) = match phase {
                RingPhase::Consumed => (outer, Color::BLACK, Color::BLACK),
                RingPhase::Regenerating { fraction } => (
                    (outer - inner).mul_add(fraction, inner),
                    palette.regen,
                    palette.regen,
                ),
                RingPhase::Intact => (
                    outer,
                    palette.types.of(requirement.left()).scaled(charge),
                    palette.types.of(requirement.right()).scaled(charge),
                ),
            };
            let view = RingView {
                index,
                requirement: *requirement,
                phase,
                fill_radius,
                inner_radius: inner,
                color0,
                color1,
            };
            outer = inner;
            view
        })
        .collect()
}

/// Flatten ring views into renderer parameter assignments.
pub fn ring_paints(views: &[RingView]) -> Vec<RingPaint> {
    views.iter().flat_map(RingView::paints).collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
mod tests {
    use kickback_core::TickSpan;
    use kickback_types::HurtType;

    use super::*;
    use crate::config::ComboSettings;

    fn combo(sequence: Vec<HurtRequirement>) -> Combo {
        let settings =
            ComboSettings::new(TickSpan::ticks(10), TickSpan::ticks(50), TickSpan::ticks(150))
                .unwrap();
        Combo::new(sequence, settings).unwrap()
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn idle_rings_are_intact_and_nested() {
        let c = combo(vec![
            HurtRequirement::Single(HurtType::Red),
            HurtRequirement::Single(HurtType::Green),
            HurtRequirement::Single(HurtType::Blue),
        ]);
        let palette = RingPalette::default();
        let views = ring_views(&c, &palette);
        assert_eq!(views.len(), 3);
        assert!(views.iter().all(|v| v.phase == RingPhase::Intact));
        assert!(close(views[0].fill_radius, 1.0));
        assert!(close(views[0].inner_radius, 2.0 / 3.0));
        assert!(close(views[1].fill_radius, 2.0 / 3.0));
        assert!(close(views[2].inner_radius, 0.0));
        assert_eq!(views[1].color0, palette.types.green);
    }

    #[test]
    fn long_sequences_narrow_every_ring() {
        let c = combo(vec![HurtRequirement::Single(HurtType::Red); 4]);
        let views = ring_views(&c, &RingPalette::default());
        assert_eq!(views.len(), 4);
        for (index, view) in views.iter().enumerate() {
            let outer = 1.0 - 0.25 * index as f32;
            assert!(close(view.fill_radius, outer));
            assert!(close(view.inner_radius, outer - 0.25));
            assert!(view.fill_radius > view.inner_radius);
        }
        assert!(close(views[3].inner_radius, 0.0));
    }

    #[test]
    fn regenerating_ring_fills_with_progress() {
        let mut c = combo(vec![
            HurtRequirement::Single(HurtType::Red),
            HurtRequirement::Single(HurtType::Green),
        ]);
        c.on_hurt(HurtType::Red, 0);
        c.step(1);
        let palette = RingPalette::default();

        let views = ring_views(&c, &palette);
        assert_eq!(views[0].phase, RingPhase::Regenerating { fraction: 0.0 });
        assert!(close(views[0].fill_radius, views[0].inner_radius));
        assert_eq!(views[0].color0, palette.regen);
        assert_eq!(views[1].color0, palette.types.green.scaled(0.0));

        for tick in 2..=26 {
            c.step(tick);
        }
        // 25 of 50 ticks elapsed
        let views = ring_views(&c, &palette);
        assert!(matches!(
            views[0].phase,
            RingPhase::Regenerating { fraction } if close(fraction, 0.5)
        ));
        let midpoint = (1.0 + views[0].inner_radius) / 2.0;
        assert!(close(views[0].fill_radius, midpoint));
    }

    #[test]
    fn earlier_rings_are_consumed() {
        let mut c = combo(vec![
            HurtRequirement::Single(HurtType::Red),
            HurtRequirement::Single(HurtType::Green),
            HurtRequirement::Single(HurtType::Blue),
        ]);
        c.on_hurt(HurtType::Red, 0);
        c.on_hurt(HurtType::Green, 0);
        c.step(1);
        assert_eq!(ring_phase(&c, 0), RingPhase::Consumed);
        assert!(matches!(ring_phase(&c, 1), RingPhase::Regenerating { .. }));
        assert_eq!(ring_phase(&c, 2), RingPhase::Intact);
        let views = ring_views(&c, &RingPalette::default());
        assert_eq!(views[0].color0, Color::BLACK);
    }

    #[test]
    fn split_ring_paints_both_colors() {
        let c = combo(vec![HurtRequirement::Split {
            left: HurtType::Red,
            right: HurtType::Blue,
        }]);
        let palette = RingPalette::default();
        let views = ring_views(&c, &palette);
        assert_eq!(views[0].color0, palette.types.red);
        assert_eq!(views[0].color1, palette.types.blue);
    }

    #[test]
    fn paints_cover_every_param_of_every_ring() {
        let c = combo(vec![
            HurtRequirement::Single(HurtType::Red),
            HurtRequirement::Single(HurtType::Blue),
        ]);
        let paints = ring_paints(&ring_views(&c, &RingPalette::default()));
        assert_eq!(paints.len(), 8);
        assert_eq!(paints[0].param, RingParam::OuterRadius);
        assert_eq!(paints[7].ring, 1);
        assert_eq!(paints[7].param, RingParam::Color1);
    }
}
