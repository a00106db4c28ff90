//! The replicated action vocabulary.
//!
//! Actions are immutable, typed messages describing one intended world
//! mutation. They are the only way the item and score projections change;
//! every participant folds the same actions in the same per-sender order,
//! so the projections can always be rebuilt by replaying the log.
//!
//! Two kinds exist:
//!
//! | Kind | Producer | Effect |
//! |------|----------|--------|
//! | [`SpawnAction`] | authority spawn policy | item becomes live |
//! | [`DestroyAction`] | the collecting participant | item removed, collector credited |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActionKind, ItemColor};
use crate::ids::{ActionId, EntityHandle, PeerId, UserId};
use crate::transform::{Position, Rotation};

/// Spawn a new collectible item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SpawnAction {
    /// Fresh handle of the new item.
    pub entity_handle: EntityHandle,
    /// Handle of the scene root the item is placed under.
    pub parent_handle: EntityHandle,
    /// Item colour.
    pub color: ItemColor,
    /// Position relative to the parent.
    pub position: Position,
    /// Orientation relative to the parent.
    pub rotation: Rotation,
}

/// Collect and destroy a live item, crediting the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DestroyAction {
    /// Handle of the collected item.
    pub entity_handle: EntityHandle,
    /// The participant credited with the collection.
    #[serde(rename = "userID")]
    pub user_id: UserId,
}

/// Tagged union of every action kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Action {
    /// See [`SpawnAction`].
    Spawn(SpawnAction),
    /// See [`DestroyAction`].
    Destroy(DestroyAction),
}

impl Action {
    /// The discriminant of this action.
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Spawn(_) => ActionKind::Spawn,
            Self::Destroy(_) => ActionKind::Destroy,
        }
    }

    /// The item handle this action targets.
    pub const fn entity_handle(&self) -> EntityHandle {
        match self {
            Self::Spawn(spawn) => spawn.entity_handle,
            Self::Destroy(destroy) => destroy.entity_handle,
        }
    }
}

impl From<SpawnAction> for Action {
    fn from(action: SpawnAction) -> Self {
        Self::Spawn(action)
    }
}

impl From<DestroyAction> for Action {
    fn from(action: DestroyAction) -> Self {
        Self::Destroy(action)
    }
}

/// An action as it travels between processes.
///
/// `sequence` is assigned by the sender and strictly increases per sender;
/// receivers use it to observe per-sender FIFO delivery. `id` is globally
/// unique and lets a receiver drop a redelivered envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ActionEnvelope {
    /// Unique identifier of this dispatch.
    pub id: ActionId,
    /// The process that dispatched the action.
    pub sender: PeerId,
    /// Per-sender sequence number, starting at 1.
    pub sequence: u64,
    /// Wall-clock time of dispatch (diagnostic only, never ordered on).
    pub dispatched_at: DateTime<Utc>,
    /// The action payload.
    pub action: Action,
}

impl ActionEnvelope {
    /// Wrap an action for dispatch with a fresh [`ActionId`].
    pub fn new(sender: PeerId, sequence: u64, action: impl Into<Action>) -> Self {
        Self {
            id: ActionId::new(),
            sender,
            sequence,
            dispatched_at: Utc::now(),
            action: action.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spawn() -> SpawnAction {
        SpawnAction {
            entity_handle: EntityHandle::new(),
            parent_handle: EntityHandle::new(),
            color: ItemColor::Red,
            position: Position::new(0.0, 0.5, 0.0),
            rotation: Rotation::IDENTITY,
        }
    }

    #[test]
    fn action_reports_kind_and_handle() {
        let spawn = sample_spawn();
        let action = Action::from(spawn);
        assert_eq!(action.kind(), ActionKind::Spawn);
        assert_eq!(action.entity_handle(), spawn.entity_handle);

        let destroy = Action::from(DestroyAction {
            entity_handle: spawn.entity_handle,
            user_id: UserId::new(),
        });
        assert_eq!(destroy.kind(), ActionKind::Destroy);
        assert_eq!(destroy.entity_handle(), spawn.entity_handle);
    }

    #[test]
    fn action_is_tagged_on_the_wire() {
        let json = serde_json::to_value(Action::from(sample_spawn())).unwrap_or_default();
        assert_eq!(json.get("type").and_then(|t| t.as_str()), Some("spawn"));
        assert_eq!(json.get("color").and_then(|t| t.as_str()), Some("red"));
        assert!(json.get("entityHandle").is_some());
    }

    #[test]
    fn destroy_uses_user_id_field_name() {
        let destroy = Action::from(DestroyAction {
            entity_handle: EntityHandle::new(),
            user_id: UserId::new(),
        });
        let json = serde_json::to_value(destroy).unwrap_or_default();
        assert_eq!(json.get("type").and_then(|t| t.as_str()), Some("destroy"));
        assert!(json.get("userID").is_some());
    }

    #[test]
    fn envelopes_get_distinct_ids() {
        let sender = PeerId::new();
        let a = ActionEnvelope::new(sender, 1, sample_spawn());
        let b = ActionEnvelope::new(sender, 2, sample_spawn());
        assert_ne!(a.id, b.id);
        assert_eq!(a.sender, b.sender);
    }
}
