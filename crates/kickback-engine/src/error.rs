//! Error types for the kickback engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during startup and the host loop.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: kickback_core::config::ConfigError,
    },

    /// The session could not be assembled from config.
    #[error("game error: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: kickback_game::GameError,
    },

    /// The host loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: kickback_core::runner::RunnerError,
    },
}
