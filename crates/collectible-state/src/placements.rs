//! The `PlacementState` projection: where each live item sits.
//!
//! Folded from the same actions as [`ItemState`](crate::ItemState) so the
//! binder can place an entity without reaching back into the action log.

use std::collections::BTreeMap;

use collectible_types::{DestroyAction, EntityHandle, Position, Rotation, SpawnAction};
use serde::{Deserialize, Serialize};

/// Parent and local transform of a live item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Scene root the item is attached to.
    pub parent: EntityHandle,
    /// Position relative to the parent.
    pub position: Position,
    /// Orientation relative to the parent.
    pub rotation: Rotation,
}

impl From<&SpawnAction> for Placement {
    fn from(action: &SpawnAction) -> Self {
        Self {
            parent: action.parent_handle,
            position: action.position,
            rotation: action.rotation,
        }
    }
}

/// Placement of every live item, keyed by handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementState {
    placements: BTreeMap<EntityHandle, Placement>,
}

impl PlacementState {
    /// Create an empty projection.
    pub const fn new() -> Self {
        Self {
            placements: BTreeMap::new(),
        }
    }

    /// Record (or replace) the placement carried by a spawn.
    pub fn apply_spawn(&mut self, action: &SpawnAction) {
        self.placements
            .insert(action.entity_handle, Placement::from(action));
    }

    /// Forget the placement of a destroyed item.
    pub fn apply_destroy(&mut self, action: &DestroyAction) {
        self.placements.remove(&action.entity_handle);
    }

    /// Placement of a live item.
    pub fn get(&self, handle: EntityHandle) -> Option<&Placement> {
        self.placements.get(&handle)
    }

    /// Iterate over every tracked handle.
    pub fn handles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.placements.keys().copied()
    }

    /// Number of tracked placements.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether no placement is tracked.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
