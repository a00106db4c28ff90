//! Semantic validation of decoded actions.
//!
//! The wire codec already guarantees structural shape and the closed colour
//! set. This stage checks what serde cannot: nil identifiers and
//! degenerate transforms. A rejected action is dropped by the receiver and
//! never mutates state.

use collectible_types::{Action, DestroyAction, SpawnAction};
use serde::{Deserialize, Serialize};

/// Rotations whose squared norm falls below this are treated as degenerate.
const MIN_ROTATION_NORM_SQUARED: f32 = 1e-6;

/// Why an envelope was rejected by a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum RejectionReason {
    /// An entity or parent handle was nil.
    #[error("malformed entity handle")]
    MalformedHandle,
    /// The collector identity was nil.
    #[error("malformed user identity")]
    MalformedIdentity,
    /// Position or rotation was non-finite, or the rotation was degenerate.
    #[error("malformed transform")]
    MalformedTransform,
    /// The envelope carried sequence 0; senders number from 1.
    #[error("malformed sequence number")]
    MalformedSequence,
}

/// Validate an action before it is folded.
pub fn validate_action(action: &Action) -> Result<(), RejectionReason> {
    match action {
        Action::Spawn(spawn) => validate_spawn(spawn),
        Action::Destroy(destroy) => validate_destroy(destroy),
    }
}

fn validate_spawn(action: &SpawnAction) -> Result<(), RejectionReason> {
    if action.entity_handle.is_nil() || action.parent_handle.is_nil() {
        return Err(RejectionReason::MalformedHandle);
    }
    if !action.position.is_finite() || !action.rotation.is_finite() {
        return Err(RejectionReason::MalformedTransform);
    }
    if action.rotation.norm_squared() < MIN_ROTATION_NORM_SQUARED {
        return Err(RejectionReason::MalformedTransform);
    }
    Ok(())
}

fn validate_destroy(action: &DestroyAction) -> Result<(), RejectionReason> {
    if action.entity_handle.is_nil() {
        return Err(RejectionReason::MalformedHandle);
    }
    if action.user_id.is_nil() {
        return Err(RejectionReason::MalformedIdentity);
    }
    Ok(())
}
