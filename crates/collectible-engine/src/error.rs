//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during session setup and execution.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: collectible_core::config::ConfigError,
    },

    /// Joining the replication hub failed.
    #[error("channel error: {source}")]
    Channel {
        /// The underlying channel error.
        #[from]
        source: collectible_core::ports::ChannelError,
    },

    /// Session runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: collectible_core::runner::RunnerError,
    },

    /// Exporting the final snapshot failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying log error.
        #[from]
        source: collectible_events::LogError,
    },
}
