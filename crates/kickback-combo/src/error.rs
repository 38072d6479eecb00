//! Error types for the kickback-combo crate.
//!
//! Building a combo or parsing a mob code can fail; stepping a combo never
//! does. Misses are reported through [`ComboStep`](crate::combo::ComboStep),
//! not as errors.

/// Errors that can occur when building a combo state machine.
#[derive(Debug, thiserror::Error)]
pub enum ComboError {
    /// A combo needs at least one requirement.
    #[error("hurt sequence is empty")]
    EmptySequence,

    /// A timing parameter is unusable.
    #[error("invalid combo timing: {reason}")]
    InvalidTiming {
        /// Description of what is wrong with the timing.
        reason: String,
    },

    /// The configured durations could not be converted to ticks.
    #[error("combo config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: kickback_core::config::ConfigError,
    },
}

/// Errors that can occur when parsing a mob code such as `rRG,G,BB`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    /// The code is empty or only whitespace.
    #[error("mob code is empty")]
    Empty,

    /// The code has a death-bomb prefix but no requirements.
    #[error("mob code `{code}` has no requirement slots")]
    NoRequirements {
        /// The offending code.
        code: String,
    },

    /// A slot between commas is empty.
    #[error("mob code slot {slot} is empty")]
    EmptySlot {
        /// Zero-based slot index.
        slot: usize,
    },

    /// A slot has more than two type letters.
    #[error("mob code slot {slot} `{text}` has more than two letters")]
    SlotTooLong {
        /// Zero-based slot index.
        slot: usize,
        /// The slot text.
        text: String,
    },

    /// A letter is not a known hit type.
    #[error("unknown hurt letter `{letter}` in mob code slot {slot}")]
    UnknownLetter {
        /// The offending character.
        letter: char,
        /// Zero-based slot index.
        slot: usize,
    },
}
