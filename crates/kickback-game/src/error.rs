//! Error types for the `kickback-game` crate.
//!
//! Building the gameplay objects can fail on bad configuration or a bad
//! encounter script. Once built, nothing in this crate fails: a bad mob code
//! met at runtime disables that one actor with a warning instead.

use kickback_combo::{CodeError, ComboError};
use kickback_core::config::ConfigError;

/// Errors that can occur when parsing an encounter script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncounterError {
    /// An object map entry holds a mob code that does not parse.
    #[error("object `{glyph}` has invalid mob code `{code}`: {source}")]
    InvalidObject {
        /// Grid character of the entry.
        glyph: char,
        /// The offending code text.
        code: String,
        /// Why the code did not parse.
        source: CodeError,
    },

    /// A wave's delay line is not a whole number of seconds.
    #[error("line {line}: wave delay `{text}` is not a whole number of seconds: {reason}")]
    InvalidDelay {
        /// One-based line number.
        line: usize,
        /// The offending line.
        text: String,
        /// Why the number did not parse.
        reason: String,
    },

    /// The script ended before a wave's grid was complete.
    #[error("wave {wave} has {found} of {expected} grid lines")]
    TruncatedWave {
        /// Zero-based wave index.
        wave: usize,
        /// Grid lines present.
        found: usize,
        /// Grid lines required.
        expected: usize,
    },
}

/// Errors that can occur when building gameplay objects.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The encounter script could not be parsed.
    #[error("encounter error: {source}")]
    Encounter {
        /// The underlying encounter error.
        #[from]
        source: EncounterError,
    },

    /// Combo timing could not be built.
    #[error("combo error: {source}")]
    Combo {
        /// The underlying combo error.
        #[from]
        source: ComboError,
    },

    /// A configured mob code is invalid.
    #[error("mob code error: {source}")]
    Code {
        /// The underlying code error.
        #[from]
        source: CodeError,
    },

    /// A configuration value could not be converted.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The mob roster ran out of identifiers.
    #[error("mob identifiers exhausted")]
    IdsExhausted,
}
