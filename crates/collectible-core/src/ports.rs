//! Collaborator ports: the narrow contracts the core calls through.
//!
//! The core never renders, simulates physics, authenticates, or moves
//! bytes across a network. Those capabilities belong to the engine runtime
//! and are reached only through the traits in this module:
//!
//! - [`IdentityProvider`] -- who the local participant is and which entity
//!   it controls.
//! - [`ActionChannel`] -- authority flag, fire-and-forget dispatch, and
//!   per-sender FIFO delivery of encoded action frames.
//! - [`SceneEngine`] -- entity lifecycle, component attachment, named-object
//!   and scene-root lookup, fresh handles, and trigger overlaps.
//!
//! Only [`LocalEntity`] values cross these seams on the engine side. They
//! are process-local and must never be placed in an action.

use collectible_types::{EntityHandle, ItemColor, PeerId, UserId};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::BinderConfig;

// ---------------------------------------------------------------------------
// Local entities
// ---------------------------------------------------------------------------

/// Process-local index of an engine entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalEntity(pub u64);

impl core::fmt::Display for LocalEntity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Supplies the local participant's identity.
pub trait IdentityProvider {
    /// Identity credited when the local participant collects an item.
    fn local_user(&self) -> UserId;

    /// Entity controlled by the local participant, if one exists yet.
    fn local_avatar(&self) -> Option<LocalEntity>;
}

/// Fixed identity for sessions where the avatar never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalIdentity {
    /// The local user.
    pub user: UserId,
    /// The locally controlled avatar.
    pub avatar: Option<LocalEntity>,
}

impl LocalIdentity {
    /// Create an identity for `user` controlling `avatar`.
    pub const fn new(user: UserId, avatar: Option<LocalEntity>) -> Self {
        Self { user, avatar }
    }
}

impl IdentityProvider for LocalIdentity {
    fn local_user(&self) -> UserId {
        self.user
    }

    fn local_avatar(&self) -> Option<LocalEntity> {
        self.avatar
    }
}

// ---------------------------------------------------------------------------
// Replication channel
// ---------------------------------------------------------------------------

/// Errors raised by a replication channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel has been disconnected from its hub.
    #[error("peer {peer} is not connected")]
    Disconnected {
        /// The disconnected peer.
        peer: PeerId,
    },

    /// A second participant asked to be the authority.
    #[error("session already has an authority ({existing})")]
    AuthorityTaken {
        /// The peer already holding authority.
        existing: PeerId,
    },

    /// Shared hub state was poisoned by a panicking holder.
    #[error("replication hub unavailable: {reason}")]
    HubUnavailable {
        /// Description of the poisoning.
        reason: String,
    },
}

/// Replication and authority channel for one participant.
///
/// Implementations deliver every dispatched frame to every participant,
/// including the sender, preserving dispatch order per sender.
///
/// Delivery back to the sender is required. The authority counts each
/// dispatched spawn against the live cap until its own echo is folded, so
/// a channel that drops self-delivery stalls spawning at the cap.
pub trait ActionChannel {
    /// Identity of this participant on the channel.
    fn peer_id(&self) -> PeerId;

    /// Whether this participant makes binding spawn decisions.
    fn is_authority(&self) -> bool;

    /// Hand an encoded frame to the transport. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if the transport cannot accept frames.
    fn dispatch(&mut self, frame: Vec<u8>) -> Result<(), ChannelError>;

    /// Take every frame delivered since the last call, in delivery order.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if the transport cannot be read.
    fn drain_inbound(&mut self) -> Result<Vec<Vec<u8>>, ChannelError>;
}

// ---------------------------------------------------------------------------
// Scene engine
// ---------------------------------------------------------------------------

/// Errors raised by the scene collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The entity does not exist in the scene.
    #[error("unknown {0}")]
    UnknownEntity(LocalEntity),

    /// Parenting would make an entity its own ancestor.
    #[error("parenting {child} under {parent} would create a cycle")]
    ParentCycle {
        /// The entity being parented.
        child: LocalEntity,
        /// The requested parent.
        parent: LocalEntity,
    },
}

/// Rigid body mode of a materialized entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigidBody {
    /// Never moved by the physics step.
    Fixed,
    /// Moved by the physics step.
    Dynamic,
}

/// Components attached to every materialized collectible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectibleSpec {
    /// Whether the entity is rendered.
    pub visible: bool,
    /// Rigid body mode.
    pub rigid_body: RigidBody,
    /// Tag identifying the entity as a collectible.
    pub tag: String,
    /// Radius of the overlap trigger sphere.
    pub trigger_radius: f32,
    /// Radius of the collision sphere, independent of the visual mesh.
    pub collider_radius: f32,
    /// Uniform scale of the visual mesh.
    pub visual_scale: f32,
    /// Whether the entity casts shadows.
    pub cast_shadows: bool,
}

impl CollectibleSpec {
    /// Tag attached to every collectible entity.
    pub const TAG: &'static str = "collectible";

    /// Build the component set from binder configuration.
    pub fn from_config(config: &BinderConfig) -> Self {
        Self {
            visible: true,
            rigid_body: RigidBody::Fixed,
            tag: Self::TAG.to_owned(),
            trigger_radius: config.trigger_radius,
            collider_radius: config.collider_radius,
            visual_scale: config.visual_scale,
            cast_shadows: config.cast_shadows,
        }
    }
}

impl Default for CollectibleSpec {
    fn default() -> Self {
        Self::from_config(&BinderConfig::default())
    }
}

/// "Entity `other` entered the trigger volume of entity `trigger`."
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Overlap {
    /// Entity owning the trigger volume.
    pub trigger: LocalEntity,
    /// Entity that entered it.
    pub other: LocalEntity,
}

/// Scene and engine collaborator.
pub trait SceneEngine {
    /// Create an empty entity at the scene origin.
    fn create_entity(&mut self) -> LocalEntity;

    /// Destroy an entity and release its components. Returns whether it
    /// existed.
    fn destroy_entity(&mut self, entity: LocalEntity) -> bool;

    /// Parent `entity` under `parent` with a local transform.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError`] if either entity is unknown or the parenting
    /// would create a cycle.
    fn set_parent_and_transform(
        &mut self,
        entity: LocalEntity,
        parent: LocalEntity,
        position: Vec3,
        rotation: Quat,
    ) -> Result<(), SceneError>;

    /// Attach the visual, physical, and trigger components of a collectible.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownEntity`] if the entity does not exist.
    fn attach_collectible(
        &mut self,
        entity: LocalEntity,
        spec: &CollectibleSpec,
    ) -> Result<(), SceneError>;

    /// Set the colour of the entity's visual material.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownEntity`] if the entity does not exist.
    fn set_material_color(
        &mut self,
        entity: LocalEntity,
        color: ItemColor,
    ) -> Result<(), SceneError>;

    /// Find an entity by its well-known name.
    fn find_named(&self, name: &str) -> Option<LocalEntity>;

    /// Walk up from `entity` to its owning scene root.
    fn scene_root_of(&self, entity: LocalEntity) -> Option<LocalEntity>;

    /// Replicated handle of an entity, if it has one.
    fn handle_of(&self, entity: LocalEntity) -> Option<EntityHandle>;

    /// Local entity registered under a replicated handle.
    fn entity_for_handle(&self, handle: EntityHandle) -> Option<LocalEntity>;

    /// Generate a globally unique handle.
    fn fresh_handle(&mut self) -> EntityHandle;

    /// Take the overlaps that began since the last call.
    fn drain_overlaps(&mut self) -> Vec<Overlap>;
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn collectible_spec_follows_config() {
        let spec = CollectibleSpec::default();
        assert!(spec.visible);
        assert_eq!(spec.rigid_body, RigidBody::Fixed);
        assert_eq!(spec.tag, "collectible");
        assert_eq!(spec.trigger_radius, 0.5);
        assert!(spec.collider_radius < spec.trigger_radius);
        assert!(spec.cast_shadows);
    }

    #[test]
    fn local_identity_reports_avatar() {
        let user = UserId::new();
        let identity = LocalIdentity::new(user, Some(LocalEntity(3)));
        assert_eq!(identity.local_user(), user);
        assert_eq!(identity.local_avatar(), Some(LocalEntity(3)));
        assert_eq!(LocalEntity(3).to_string(), "entity#3");
    }
}
