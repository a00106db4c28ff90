//! Trigger-to-action bridge.
//!
//! Runs on every participant. The engine reports every overlap it sees,
//! including overlaps by other participants' avatars, so the bridge only
//! turns an overlap into a collect action when the overlapping entity is
//! the local avatar.

use collectible_types::DestroyAction;
use tracing::{debug, info};

use crate::binder::EntityBinder;
use crate::ports::{IdentityProvider, Overlap};

/// What the bridge did with one overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeDecision {
    /// The overlapping entity is not the local avatar.
    Foreign,
    /// The trigger does not belong to a bound collectible.
    Unbound,
    /// A collection was already reported for this item.
    AlreadyReported,
    /// Dispatch this destroy action.
    Collect(DestroyAction),
}

/// Gate from local trigger overlaps to destroy actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerBridge;

impl TriggerBridge {
    /// Create a bridge.
    pub const fn new() -> Self {
        Self
    }

    /// Decide what to do with one overlap.
    pub fn on_overlap(
        self,
        overlap: Overlap,
        identity: &dyn IdentityProvider,
        binder: &mut EntityBinder,
    ) -> BridgeDecision {
        if identity.local_avatar() != Some(overlap.other) {
            return BridgeDecision::Foreign;
        }

        let Some(handle) = binder.handle_for(overlap.trigger) else {
            debug!(trigger = %overlap.trigger, "Overlap on an unbound trigger");
            return BridgeDecision::Unbound;
        };

        if !binder.mark_collected(handle) {
            return BridgeDecision::AlreadyReported;
        }

        let user_id = identity.local_user();
        info!(%handle, %user_id, "Local avatar collected item");
        BridgeDecision::Collect(DestroyAction {
            entity_handle: handle,
            user_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use collectible_state::ReplicatedState;
    use collectible_types::{
        ActionEnvelope, EntityHandle, ItemColor, PeerId, Position, Rotation, SpawnAction, UserId,
    };
    use glam::Vec3;

    use super::*;
    use crate::headless::HeadlessScene;
    use crate::ports::{CollectibleSpec, LocalEntity, LocalIdentity};

    struct Fixture {
        binder: EntityBinder,
        item: LocalEntity,
        handle: EntityHandle,
        mine: LocalEntity,
        theirs: LocalEntity,
        identity: LocalIdentity,
    }

    fn fixture() -> Fixture {
        let root = EntityHandle::new();
        let mut scene = HeadlessScene::with_anchor(root, "collectible-anchor");
        let mut state = ReplicatedState::new();
        let handle = EntityHandle::new();
        state.apply(&ActionEnvelope::new(
            PeerId::new(),
            1,
            SpawnAction {
                entity_handle: handle,
                parent_handle: root,
                color: ItemColor::Red,
                position: Position::new(0.0, 0.5, 0.0),
                rotation: Rotation::IDENTITY,
            },
        ));
        let mut binder = EntityBinder::new(CollectibleSpec::default());
        binder.reconcile(state.items(), state.placements(), &mut scene);

        let item = binder.get(handle).unwrap().entity;
        let mine = scene.spawn_avatar(Vec3::ZERO);
        let theirs = scene.spawn_avatar(Vec3::ZERO);
        Fixture {
            binder,
            item,
            handle,
            mine,
            theirs,
            identity: LocalIdentity::new(UserId::new(), Some(mine)),
        }
    }

    #[test]
    fn local_avatar_collects() {
        let mut fx = fixture();
        let decision = TriggerBridge::new().on_overlap(
            Overlap {
                trigger: fx.item,
                other: fx.mine,
            },
            &fx.identity,
            &mut fx.binder,
        );
        assert_eq!(
            decision,
            BridgeDecision::Collect(DestroyAction {
                entity_handle: fx.handle,
                user_id: fx.identity.user,
            })
        );
    }

    #[test]
    fn foreign_avatar_is_ignored() {
        let mut fx = fixture();
        let decision = TriggerBridge::new().on_overlap(
            Overlap {
                trigger: fx.item,
                other: fx.theirs,
            },
            &fx.identity,
            &mut fx.binder,
        );
        assert_eq!(decision, BridgeDecision::Foreign);

        // The foreign overlap does not consume the item.
        assert!(fx.binder.mark_collected(fx.handle));
    }

    #[test]
    fn no_avatar_means_no_collection() {
        let mut fx = fixture();
        let identity = LocalIdentity::new(UserId::new(), None);
        let decision = TriggerBridge::new().on_overlap(
            Overlap {
                trigger: fx.item,
                other: fx.mine,
            },
            &identity,
            &mut fx.binder,
        );
        assert_eq!(decision, BridgeDecision::Foreign);
    }

    #[test]
    fn second_overlap_is_not_reported() {
        let mut fx = fixture();
        let bridge = TriggerBridge::new();
        let overlap = Overlap {
            trigger: fx.item,
            other: fx.mine,
        };
        assert!(matches!(
            bridge.on_overlap(overlap, &fx.identity, &mut fx.binder),
            BridgeDecision::Collect(_)
        ));
        assert_eq!(
            bridge.on_overlap(overlap, &fx.identity, &mut fx.binder),
            BridgeDecision::AlreadyReported
        );
    }

    #[test]
    fn unbound_trigger_is_ignored() {
        let mut fx = fixture();
        let decision = TriggerBridge::new().on_overlap(
            Overlap {
                trigger: LocalEntity(9_999),
                other: fx.mine,
            },
            &fx.identity,
            &mut fx.binder,
        );
        assert_eq!(decision, BridgeDecision::Unbound);
    }
}
