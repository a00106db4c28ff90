//! Replicated projections folded from collectible actions.
//!
//! Every participant holds the same projections and mutates them only by
//! folding received actions, so state is always derivable by replaying the
//! action log. Nothing here blocks, locks, or talks to the network.
//!
//! # Architecture
//!
//! - [`items`] -- [`ItemState`]: live item handle to colour.
//! - [`scores`] -- [`ScoreState`]: participant to collection count.
//! - [`placements`] -- [`PlacementState`]: live item handle to parent and transform.
//! - [`validation`] -- semantic checks run before folding.
//! - [`replicated`] -- [`ReplicatedState`], the validating dispatcher.
//!
//! # Usage
//!
//! ```
//! use collectible_state::{ApplyOutcome, ReplicatedState};
//! use collectible_types::{
//!     ActionEnvelope, DestroyAction, EntityHandle, ItemColor, PeerId, Position, Rotation,
//!     SpawnAction, UserId,
//! };
//!
//! let authority = PeerId::new();
//! let collector = PeerId::new();
//! let handle = EntityHandle::new();
//! let user = UserId::new();
//! let mut state = ReplicatedState::new();
//!
//! let spawn = SpawnAction {
//!     entity_handle: handle,
//!     parent_handle: EntityHandle::new(),
//!     color: ItemColor::Red,
//!     position: Position::new(0.0, 0.5, 0.0),
//!     rotation: Rotation::IDENTITY,
//! };
//! assert_eq!(state.apply(&ActionEnvelope::new(authority, 1, spawn)), ApplyOutcome::Applied);
//!
//! let destroy = DestroyAction { entity_handle: handle, user_id: user };
//! state.apply(&ActionEnvelope::new(collector, 1, destroy));
//!
//! assert!(state.items().is_empty());
//! assert_eq!(state.scores().current_score(user), 1);
//! ```

pub mod items;
pub mod placements;
pub mod replicated;
pub mod scores;
pub mod validation;

// Re-export primary types at crate root.
pub use items::{ItemState, SpawnEffect};
pub use placements::{Placement, PlacementState};
pub use replicated::{ApplyOutcome, ReplicatedState};
pub use scores::ScoreState;
pub use validation::{RejectionReason, validate_action};

use collectible_types::{EntityHandle, UserId};

// ---------------------------------------------------------------------------
// Invariant violations
// ---------------------------------------------------------------------------

/// A cross-store inconsistency reported by [`ReplicatedState::audit`].
///
/// Folding through the dispatcher never produces one; a violation means
/// the stores were rebuilt from a corrupted log or snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateViolation {
    /// A placement exists for a handle that is not live.
    #[error("placement tracked for non-live item {0}")]
    PlacementWithoutItem(EntityHandle),

    /// A live item has no placement.
    #[error("live item {0} has no placement")]
    ItemWithoutPlacement(EntityHandle),

    /// A participant has a stored count of zero.
    #[error("participant {0} has a zero score entry")]
    ZeroScore(UserId),
}
