//! The action log: an append-only record of every folded envelope.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted.
//! - **Fold-complete**: only envelopes that changed state are recorded, so
//!   replaying the log through a fresh dispatcher reproduces the live
//!   projections exactly.
//! - **Tick-ordered**: entry ticks never decrease.

use std::collections::BTreeMap;

use collectible_state::ReplicatedState;
use collectible_types::{ActionEnvelope, ActionKind};
use tracing::warn;

use crate::LogError;

/// One recorded envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoggedAction {
    /// Zero-based position in the log.
    pub index: u64,
    /// Local tick on which the envelope was folded.
    pub tick: u64,
    /// The envelope exactly as received.
    pub envelope: ActionEnvelope,
}

/// Result of comparing a replayed state with a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayCheck {
    /// Replay reproduces the live projections.
    Consistent,
    /// Replay disagrees with the live projections.
    Diverged {
        /// Whether the item projections agree.
        items_match: bool,
        /// Whether the score projections agree.
        scores_match: bool,
        /// Whether the placement projections agree.
        placements_match: bool,
    },
}

/// Append-only log of folded envelopes for one participant.
#[derive(Debug, Default)]
pub struct ActionLog {
    entries: Vec<LoggedAction>,
}

impl ActionLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an envelope folded on `tick`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::TickRegression`] if `tick` is earlier than the
    /// last entry's tick.
    pub fn append(&mut self, tick: u64, envelope: ActionEnvelope) -> Result<&LoggedAction, LogError> {
        if let Some(last) = self.entries.last() {
            if tick < last.tick {
                warn!(tick, last_tick = last.tick, "Rejecting out-of-order log append");
                return Err(LogError::TickRegression {
                    tick,
                    last_tick: last.tick,
                });
            }
        }

        let index = u64::try_from(self.entries.len()).unwrap_or(u64::MAX);
        self.entries.push(LoggedAction {
            index,
            tick,
            envelope,
        });

        // Return a reference to the entry we just pushed.
        self.entries
            .last()
            .ok_or(LogError::InternalError("failed to retrieve entry after append"))
    }

    /// Iterate over all entries in append order.
    pub fn iter(&self) -> impl Iterator<Item = &LoggedAction> {
        self.entries.iter()
    }

    /// Entries folded on or after `tick`.
    pub fn since(&self, tick: u64) -> impl Iterator<Item = &LoggedAction> {
        self.entries.iter().filter(move |entry| entry.tick >= tick)
    }

    /// Count of entries per action kind.
    pub fn count_by_kind(&self) -> BTreeMap<ActionKind, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            let count = counts.entry(entry.envelope.action.kind()).or_insert(0_usize);
            *count = count.saturating_add(1);
        }
        counts
    }

    /// Rebuild the projections by folding every entry into a fresh state.
    pub fn replay(&self) -> ReplicatedState {
        let mut state = ReplicatedState::new();
        for entry in &self.entries {
            state.apply(&entry.envelope);
        }
        state
    }

    /// Replay the log and compare the result with `live`.
    pub fn verify_against(&self, live: &ReplicatedState) -> ReplayCheck {
        let replayed = self.replay();
        let items_match = replayed.items() == live.items();
        let scores_match = replayed.scores() == live.scores();
        let placements_match = replayed.placements() == live.placements();

        if items_match && scores_match && placements_match {
            ReplayCheck::Consistent
        } else {
            warn!(
                items_match,
                scores_match, placements_match, "Replay diverged from live state"
            );
            ReplayCheck::Diverged {
                items_match,
                scores_match,
                placements_match,
            }
        }
    }
}
