//! Action sourcing and state snapshots for replicated collectibles.
//!
//! Every applied action is appended to an immutable log. Actions are the
//! source of truth -- the projections can be reconstructed at any time by
//! replaying them, which is also how a late-joining participant catches up.
//!
//! - [`log`] -- The [`ActionLog`]: append-only record with replay and verification.
//! - [`snapshot`] -- [`StateSnapshot`]: serializable point-in-time view for diagnostics.

pub mod log;
pub mod snapshot;

pub use log::{ActionLog, LoggedAction, ReplayCheck};
pub use snapshot::StateSnapshot;

/// Errors that can occur when recording or exporting the log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// An entry was appended with a tick earlier than the last entry's.
    #[error("tick went backwards: appending tick {tick} after tick {last_tick}")]
    TickRegression {
        /// The tick of the rejected entry.
        tick: u64,
        /// The tick of the most recent entry.
        last_tick: u64,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal log error: {0}")]
    InternalError(&'static str),

    /// Serializing a snapshot failed.
    #[error("snapshot serialization failed: {source}")]
    Serialization {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
