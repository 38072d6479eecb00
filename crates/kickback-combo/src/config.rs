//! Tick-denominated combo settings.
//!
//! [`ComboSettings`] bundles every tunable of the combo state machine in
//! ticks so the per-tick code never touches real time. The game constructs
//! it from the `combo` section of `kickback-config.yaml` at startup and
//! hands a copy to each mob.

use kickback_core::config::{ComboConfig, RingColors};
use kickback_core::{TickRate, TickSpan};

use crate::error::ComboError;

/// Combo timing in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComboSettings {
    /// How long an unmatched hit stays buffered (default: 200 ms).
    pub hurt_buffer: TickSpan,

    /// Regen duration of a ring (default: 1 s).
    pub regen: TickSpan,

    /// Longest regen any ring may have; ring thickness is `regen / max_total`
    /// (default: 3 s).
    pub max_total: TickSpan,
}

impl ComboSettings {
    /// Build settings from explicit tick spans.
    ///
    /// # Errors
    ///
    /// Returns [`ComboError::InvalidTiming`] if `regen` is zero or longer
    /// than `max_total`.
    pub fn new(
        hurt_buffer: TickSpan,
        regen: TickSpan,
        max_total: TickSpan,
    ) -> Result<Self, ComboError> {
        if regen.is_zero() {
            return Err(ComboError::InvalidTiming {
                reason: "regen duration must be at least one tick".to_owned(),
            });
        }
        if max_total < regen {
            return Err(ComboError::InvalidTiming {
                reason: format!("max total {max_total} is shorter than regen {regen}"),
            });
        }
        Ok(Self {
            hurt_buffer,
            regen,
            max_total,
        })
    }

    /// Convert the `combo` config section at the given tick rate.
    ///
    /// # Errors
    ///
    /// Returns [`ComboError::Config`] for durations that cannot be expressed
    /// in ticks, or [`ComboError::InvalidTiming`] as for [`ComboSettings::new`].
    pub fn from_config(config: &ComboConfig, rate: TickRate) -> Result<Self, ComboError> {
        Self::new(
            config.hurt_buffer(rate),
            config.regen(rate)?,
            config.max_total(rate)?,
        )
    }
}

impl Default for ComboSettings {
    fn default() -> Self {
        // 200 ms, 1 s and 3 s at 60 ticks per second.
        Self {
            hurt_buffer: TickSpan::ticks(12),
            regen: TickSpan::ticks(60),
            max_total: TickSpan::ticks(180),
        }
    }
}

/// Ring colors plus the color of the ring currently regenerating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPalette {
    /// Colors per hit type.
    pub types: RingColors,
    /// Color of the regenerating ring.
    pub regen: kickback_types::Color,
}

impl RingPalette {
    /// Build a palette from configured colors, using white for the
    /// regenerating ring.
    pub const fn new(types: RingColors) -> Self {
        Self {
            types,
            regen: kickback_types::Color::rgb(1.0, 1.0, 1.0),
        }
    }
}

impl Default for RingPalette {
    fn default() -> Self {
        Self::new(RingColors::default())
    }
}
