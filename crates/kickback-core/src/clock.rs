//! Tick clock and tick-denominated durations.
//!
//! The clock is the single source of truth for simulation time. The host
//! advances it exactly once per fixed simulation step; everything that
//! waits (task timers, combo buffers, regen rings) is measured in ticks.
//!
//! # Design Principles
//!
//! - The tick counter only ever moves forward by exactly one, using checked
//!   arithmetic (no silent overflow).
//! - Real-time durations are converted to ticks once, at construction, by
//!   rounding to the nearest tick at the fixed [`TickRate`]. The rate is
//!   immutable after startup.

use std::time::Duration;

/// A simulation step number. Tick 0 is the state before the first advance.
pub type Tick = u64;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid time configuration (e.g. zero ticks per second).
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },

    /// A duration could not be expressed in ticks.
    #[error("invalid duration: {reason}")]
    InvalidDuration {
        /// Explanation of what is wrong with the duration.
        reason: String,
    },
}

/// A span of simulation time expressed as a whole number of ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TickSpan(u64);

impl TickSpan {
    /// The empty span.
    pub const ZERO: Self = Self(0);

    /// Create a span from an explicit tick count.
    pub const fn ticks(count: u64) -> Self {
        Self(count)
    }

    /// Number of ticks in the span.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether the span covers no ticks at all.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl core::fmt::Display for TickSpan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ticks", self.0)
    }
}

/// Fixed number of simulation steps per real-time second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRate {
    per_second: u32,
}

impl TickRate {
    /// Create a tick rate.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `per_second` is zero.
    pub fn new(per_second: u32) -> Result<Self, ClockError> {
        if per_second == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "ticks_per_second must be at least 1".to_owned(),
            });
        }
        Ok(Self { per_second })
    }

    /// Ticks per second.
    pub const fn per_second(self) -> u32 {
        self.per_second
    }

    /// Convert a real-time duration to the nearest whole number of ticks.
    ///
    /// Saturates at `u64::MAX` ticks for absurdly long durations.
    pub fn span(self, duration: Duration) -> TickSpan {
        let scaled = duration
            .as_nanos()
            .saturating_mul(u128::from(self.per_second))
            .saturating_add(NANOS_PER_SECOND / 2);
        let ticks = scaled.checked_div(NANOS_PER_SECOND).unwrap_or(0);
        TickSpan(u64::try_from(ticks).unwrap_or(u64::MAX))
    }

    /// Convert milliseconds to the nearest whole number of ticks.
    pub fn millis(self, millis: u64) -> TickSpan {
        self.span(Duration::from_millis(millis))
    }

    /// Convert fractional seconds to the nearest whole number of ticks.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDuration`] if `seconds` is negative,
    /// not finite, or too large to represent.
    pub fn seconds(self, seconds: f64) -> Result<TickSpan, ClockError> {
        let duration =
            Duration::try_from_secs_f64(seconds).map_err(|e| ClockError::InvalidDuration {
                reason: format!("{seconds} seconds: {e}"),
            })?;
        Ok(self.span(duration))
    }

    /// Convert a count of animation frames at `frame_rate` frames per second
    /// to the nearest whole number of ticks.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDuration`] if `frame_rate` is zero.
    pub fn anim_frames(self, frames: u32, frame_rate: u32) -> Result<TickSpan, ClockError> {
        if frame_rate == 0 {
            return Err(ClockError::InvalidDuration {
                reason: "animation frame rate must be at least 1".to_owned(),
            });
        }
        // round(frames * tps / rate) == (2 * frames * tps + rate) / (2 * rate)
        let numerator = u64::from(frames)
            .saturating_mul(u64::from(self.per_second))
            .saturating_mul(2)
            .saturating_add(u64::from(frame_rate));
        let denominator = u64::from(frame_rate).saturating_mul(2);
        Ok(TickSpan(numerator.checked_div(denominator).unwrap_or(0)))
    }
}

/// Monotonic simulation clock.
///
/// The clock starts at tick 0 and is advanced by the host once per fixed
/// step. It is reset only on an explicit game restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickClock {
    /// Current tick number.
    tick: Tick,

    /// Fixed step rate used for duration conversion.
    rate: TickRate,
}

impl TickClock {
    /// Create a clock at tick 0.
    pub const fn new(rate: TickRate) -> Self {
        Self { tick: 0, rate }
    }

    /// Create a clock at an explicit tick (useful for testing and
    /// state restoration).
    pub const fn from_parts(tick: Tick, rate: TickRate) -> Self {
        Self { tick, rate }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<Tick, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Return the current tick number.
    pub const fn now(&self) -> Tick {
        self.tick
    }

    /// Return the fixed step rate.
    pub const fn rate(&self) -> TickRate {
        self.rate
    }

    /// Ticks elapsed since `start`, saturating at zero for future ticks.
    pub const fn elapsed_since(&self, start: Tick) -> u64 {
        self.tick.saturating_sub(start)
    }

    /// Rewind to tick 0 for a game restart.
    pub const fn reset(&mut self) {
        self.tick = 0;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rate(per_second: u32) -> TickRate {
        TickRate::new(per_second).unwrap()
    }

    #[test]
    fn clock_starts_at_tick_zero() {
        let clock = TickClock::new(rate(60));
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn every_advance_adds_exactly_one() {
        let mut clock = TickClock::new(rate(60));
        for expected in 1..=500 {
            let before = clock.now();
            let after = clock.advance().unwrap();
            assert_eq!(after, before + 1);
            assert_eq!(clock.now(), expected);
        }
    }

    #[test]
    fn advance_reports_overflow() {
        let mut clock = TickClock::from_parts(u64::MAX, rate(60));
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(TickRate::new(0).is_err());
    }

    #[test]
    fn millis_round_to_nearest_tick() {
        let r = rate(60);
        assert_eq!(r.millis(200), TickSpan::ticks(12));
        assert_eq!(r.millis(10), TickSpan::ticks(1));
        assert_eq!(r.millis(5), TickSpan::ticks(0));
        assert_eq!(r.millis(5000), TickSpan::ticks(300));
    }

    #[test]
    fn seconds_round_to_nearest_tick() {
        let r = rate(50);
        assert_eq!(r.seconds(1.0).unwrap(), TickSpan::ticks(50));
        assert_eq!(r.seconds(0.5).unwrap(), TickSpan::ticks(25));
        assert_eq!(r.seconds(0.0).unwrap(), TickSpan::ZERO);
    }

    #[test]
    fn negative_seconds_are_rejected() {
        assert!(rate(60).seconds(-1.0).is_err());
        assert!(rate(60).seconds(f64::NAN).is_err());
    }

    #[test]
    fn anim_frames_convert_through_frame_rate() {
        let r = rate(60);
        assert_eq!(r.anim_frames(12, 24).unwrap(), TickSpan::ticks(30));
        assert_eq!(r.anim_frames(1, 24).unwrap(), TickSpan::ticks(3));
        assert!(r.anim_frames(1, 0).is_err());
    }

    #[test]
    fn reset_rewinds_to_zero() {
        let mut clock = TickClock::new(rate(60));
        clock.advance().unwrap();
        clock.advance().unwrap();
        assert_eq!(clock.elapsed_since(1), 1);
        clock.reset();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.elapsed_since(5), 0);
    }
}
