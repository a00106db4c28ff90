//! The `ScoreState` projection: per-participant collection counts.

use std::collections::BTreeMap;

use collectible_types::{DestroyAction, UserId};
use serde::{Deserialize, Serialize};

/// Collection counts keyed by participant.
///
/// Absent keys read as zero. Counts only ever grow: there is no decrement,
/// no reset, and no entry removal during a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    scores: BTreeMap<UserId, u64>,
}

impl ScoreState {
    /// Create an empty projection.
    pub const fn new() -> Self {
        Self {
            scores: BTreeMap::new(),
        }
    }

    /// Credit the collector named by a destroy. Returns the new count.
    ///
    /// Every call increments; dropping redelivered actions is the
    /// dispatcher's job, not this receptor's.
    pub fn apply_destroy(&mut self, action: &DestroyAction) -> u64 {
        let entry = self.scores.entry(action.user_id).or_insert(0);
        *entry = entry.saturating_add(1);
        *entry
    }

    /// Current count for a participant (0 when unknown).
    pub fn current_score(&self, user: UserId) -> u64 {
        self.scores.get(&user).copied().unwrap_or(0)
    }

    /// Iterate `(user, count)` pairs in user order.
    pub fn iter(&self) -> impl Iterator<Item = (UserId, u64)> + '_ {
        self.scores.iter().map(|(user, count)| (*user, *count))
    }

    /// Number of participants with a non-zero count.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nobody has collected anything yet.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Sum of every participant's count.
    pub fn total(&self) -> u64 {
        self.scores
            .values()
            .fold(0_u64, |acc, count| acc.saturating_add(*count))
    }
}
