//! The `ItemState` projection: currently live, uncollected items.

use std::collections::BTreeMap;

use collectible_types::{DestroyAction, EntityHandle, ItemColor, SpawnAction};
use serde::{Deserialize, Serialize};

/// Effect of folding a spawn into [`ItemState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnEffect {
    /// The handle was not live; a new entry was created.
    Inserted,
    /// The handle was already live and its colour was overwritten.
    ///
    /// This is a protocol violation upstream (the authority spawned a handle
    /// twice) but it is absorbed here rather than failing the simulation.
    Overwrote {
        /// The colour the entry held before the overwrite.
        previous: ItemColor,
    },
}

/// Mapping of live item handles to their colours.
///
/// Entries are created only by [`apply_spawn`](Self::apply_spawn) and
/// removed only by [`apply_destroy`](Self::apply_destroy).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    items: BTreeMap<EntityHandle, ItemColor>,
}

impl ItemState {
    /// Create an empty projection.
    pub const fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Fold a spawn into the projection.
    pub fn apply_spawn(&mut self, action: &SpawnAction) -> SpawnEffect {
        match self.items.insert(action.entity_handle, action.color) {
            None => SpawnEffect::Inserted,
            Some(previous) => SpawnEffect::Overwrote { previous },
        }
    }

    /// Fold a destroy into the projection.
    ///
    /// Returns whether an entry was removed. A destroy for an absent handle
    /// (duplicate or out-of-order delivery) leaves the projection unchanged.
    pub fn apply_destroy(&mut self, action: &DestroyAction) -> bool {
        self.items.remove(&action.entity_handle).is_some()
    }

    /// Enumerate all live `(handle, colour)` pairs in handle order.
    pub fn snapshot(&self) -> impl Iterator<Item = (EntityHandle, ItemColor)> + '_ {
        self.items.iter().map(|(handle, color)| (*handle, *color))
    }

    /// Colour of a live item, if present.
    pub fn get(&self, handle: EntityHandle) -> Option<ItemColor> {
        self.items.get(&handle).copied()
    }

    /// Whether the handle is live.
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.items.contains_key(&handle)
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no item is live.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
