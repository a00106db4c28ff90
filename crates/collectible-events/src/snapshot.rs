//! Point-in-time snapshots of a participant's projections.
//!
//! Snapshots are diagnostic: late joiners catch up by replaying the full
//! action history, never by loading a snapshot.

use collectible_state::{ItemState, PlacementState, ReplicatedState, ScoreState};
use serde::{Deserialize, Serialize};

use crate::LogError;

/// A serializable copy of every projection at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Local tick the snapshot was taken on.
    pub tick: u64,
    /// State version at the time of the snapshot.
    pub version: u64,
    /// Live items.
    pub items: ItemState,
    /// Collection counts.
    pub scores: ScoreState,
    /// Placement of live items.
    pub placements: PlacementState,
}

impl StateSnapshot {
    /// Capture the projections of `state`.
    pub fn capture(tick: u64, state: &ReplicatedState) -> Self {
        Self {
            tick,
            version: state.version(),
            items: state.items().clone(),
            scores: state.scores().clone(),
            placements: state.placements().clone(),
        }
    }

    /// Whether the snapshot's projections equal those of `state`.
    pub fn matches(&self, state: &ReplicatedState) -> bool {
        &self.items == state.items()
            && &self.scores == state.scores()
            && &self.placements == state.placements()
    }

    /// Render as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, LogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
