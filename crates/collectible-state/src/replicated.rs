//! The dispatcher: the single mutation path into the replicated stores.
//!
//! [`ReplicatedState::apply`] validates an envelope, drops redelivery, and
//! folds the action into every projection through its receptor. Nothing
//! else in the workspace holds a mutable reference to a store.
//!
//! Redelivery is detected per sender by sequence number, and a rejected
//! envelope still consumes its sequence. Each sender keeps
//! a watermark below which every sequence has been delivered, plus the few
//! sequences that arrived ahead of a gap, so bookkeeping stays bounded by
//! the number of senders and outstanding gaps rather than growing with the
//! session.
//!
//! # Outcomes
//!
//! | Outcome | Meaning | State changed |
//! |---------|---------|---------------|
//! | `Applied` | normal spawn or destroy | yes |
//! | `Overwrote` | spawn for an already-live handle | yes |
//! | `StaleDestroy` | destroy for an absent handle; collector still credited | scores only |
//! | `Duplicate` | sender sequence already delivered | no |
//! | `Rejected` | failed validation | no |

use std::collections::{BTreeMap, BTreeSet};

use collectible_types::{Action, ActionEnvelope, DestroyAction, ItemColor, PeerId, SpawnAction};
use tracing::{debug, warn};

use crate::StateViolation;
use crate::items::{ItemState, SpawnEffect};
use crate::placements::PlacementState;
use crate::scores::ScoreState;
use crate::validation::{RejectionReason, validate_action};

/// Result of offering one envelope to [`ReplicatedState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The action was folded normally.
    Applied,
    /// A spawn replaced the colour of an already-live handle.
    Overwrote {
        /// The colour before the overwrite.
        previous: ItemColor,
    },
    /// A destroy named a handle that is not live.
    StaleDestroy,
    /// The sender's sequence was applied before; the envelope was dropped.
    Duplicate,
    /// The envelope failed validation and was dropped.
    Rejected(RejectionReason),
}

impl ApplyOutcome {
    /// Whether folding this envelope changed any projection.
    pub const fn changed_state(&self) -> bool {
        matches!(
            self,
            Self::Applied | Self::Overwrote { .. } | Self::StaleDestroy
        )
    }
}

/// Delivered sequences of one sender.
#[derive(Debug, Clone, Default)]
struct SenderWindow {
    /// Every sequence up to and including this one has been delivered.
    through: u64,
    /// Delivered sequences above `through`, waiting for the gap to close.
    ahead: BTreeSet<u64>,
}

impl SenderWindow {
    fn contains(&self, sequence: u64) -> bool {
        sequence <= self.through || self.ahead.contains(&sequence)
    }

    /// Record `sequence` as delivered. Returns whether it was the next
    /// expected sequence.
    fn record(&mut self, sequence: u64) -> bool {
        let expected = self.through.saturating_add(1);
        if sequence != expected {
            self.ahead.insert(sequence);
            return false;
        }
        self.through = sequence;
        while let Some(next) = self.through.checked_add(1) {
            if !self.ahead.remove(&next) {
                break;
            }
            self.through = next;
        }
        true
    }
}

/// All projections held by one participant, plus delivery bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ReplicatedState {
    items: ItemState,
    scores: ScoreState,
    placements: PlacementState,
    /// Delivered sequences per sender.
    delivered: BTreeMap<PeerId, SenderWindow>,
    /// Envelopes folded so far.
    applied: usize,
    /// Bumped on every state change.
    version: u64,
}

impl ReplicatedState {
    /// Create empty projections.
    pub const fn new() -> Self {
        Self {
            items: ItemState::new(),
            scores: ScoreState::new(),
            placements: PlacementState::new(),
            delivered: BTreeMap::new(),
            applied: 0,
            version: 0,
        }
    }

    /// Live items.
    pub const fn items(&self) -> &ItemState {
        &self.items
    }

    /// Collection counts.
    pub const fn scores(&self) -> &ScoreState {
        &self.scores
    }

    /// Placement of live items.
    pub const fn placements(&self) -> &PlacementState {
        &self.placements
    }

    /// Monotonic change counter. Unchanged version means unchanged state.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Number of distinct envelopes folded so far.
    pub const fn applied_count(&self) -> usize {
        self.applied
    }

    /// Sequences held above a delivery gap, across all senders.
    ///
    /// Zero whenever every sender's envelopes have arrived without gaps.
    pub fn out_of_order_pending(&self) -> usize {
        self.delivered
            .values()
            .map(|window| window.ahead.len())
            .fold(0, usize::saturating_add)
    }

    /// Validate, deduplicate, and fold one envelope.
    pub fn apply(&mut self, envelope: &ActionEnvelope) -> ApplyOutcome {
        if envelope.sequence == 0 {
            warn!(
                action_id = %envelope.id,
                sender = %envelope.sender,
                "Dropping envelope with sequence 0"
            );
            return ApplyOutcome::Rejected(RejectionReason::MalformedSequence);
        }

        let window = self.delivered.entry(envelope.sender).or_default();
        if window.contains(envelope.sequence) {
            debug!(
                action_id = %envelope.id,
                sender = %envelope.sender,
                sequence = envelope.sequence,
                "Dropping redelivered action"
            );
            return ApplyOutcome::Duplicate;
        }

        // Rejected envelopes still consume their sequence so the window closes.
        let expected = window.through.saturating_add(1);
        if !window.record(envelope.sequence) {
            warn!(
                sender = %envelope.sender,
                sequence = envelope.sequence,
                expected,
                "Per-sender delivery order violated"
            );
        }

        if let Err(reason) = validate_action(&envelope.action) {
            warn!(
                action_id = %envelope.id,
                sender = %envelope.sender,
                kind = ?envelope.action.kind(),
                %reason,
                "Dropping malformed action"
            );
            return ApplyOutcome::Rejected(reason);
        }
        self.applied = self.applied.saturating_add(1);

        let outcome = match &envelope.action {
            Action::Spawn(spawn) => self.fold_spawn(spawn),
            Action::Destroy(destroy) => self.fold_destroy(destroy),
        };
        self.version = self.version.saturating_add(1);
        outcome
    }

    /// Check cross-store invariants. An empty list means consistent.
    pub fn audit(&self) -> Vec<StateViolation> {
        let mut violations = Vec::new();

        for handle in self.placements.handles() {
            if !self.items.contains(handle) {
                violations.push(StateViolation::PlacementWithoutItem(handle));
            }
        }
        for (handle, _) in self.items.snapshot() {
            if self.placements.get(handle).is_none() {
                violations.push(StateViolation::ItemWithoutPlacement(handle));
            }
        }
        for (user, count) in self.scores.iter() {
            if count == 0 {
                violations.push(StateViolation::ZeroScore(user));
            }
        }

        violations
    }

    fn fold_spawn(&mut self, action: &SpawnAction) -> ApplyOutcome {
        let effect = self.items.apply_spawn(action);
        self.placements.apply_spawn(action);

        match effect {
            SpawnEffect::Inserted => {
                debug!(
                    handle = %action.entity_handle,
                    color = %action.color,
                    "Item spawned"
                );
                ApplyOutcome::Applied
            }
            SpawnEffect::Overwrote { previous } => {
                warn!(
                    handle = %action.entity_handle,
                    %previous,
                    color = %action.color,
                    "Spawn for an already-live handle; overwriting"
                );
                ApplyOutcome::Overwrote { previous }
            }
        }
    }

    fn fold_destroy(&mut self, action: &DestroyAction) -> ApplyOutcome {
        let removed = self.items.apply_destroy(action);
        self.placements.apply_destroy(action);
        let score = self.scores.apply_destroy(action);

        debug!(
            handle = %action.entity_handle,
            user = %action.user_id,
            score,
            removed,
            "Item collected"
        );

        if removed {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::StaleDestroy
        }
    }
}

#[cfg(test)]
mod tests {
    use collectible_types::{EntityHandle, Position, Rotation, UserId};
    use uuid::Uuid;

    use super::*;

    struct Sender {
        peer: PeerId,
        next: u64,
    }

    impl Sender {
        fn new() -> Self {
            Self {
                peer: PeerId::new(),
                next: 0,
            }
        }

        fn send(&mut self, action: impl Into<Action>) -> ActionEnvelope {
            self.next = self.next.saturating_add(1);
            ActionEnvelope::new(self.peer, self.next, action)
        }
    }

    fn spawn(handle: EntityHandle, color: ItemColor) -> SpawnAction {
        SpawnAction {
            entity_handle: handle,
            parent_handle: EntityHandle::new(),
            color,
            position: Position::new(0.0, 0.5, 0.0),
            rotation: Rotation::IDENTITY,
        }
    }

    #[test]
    fn spawn_collect_scenario() {
        let mut authority = Sender::new();
        let mut collector = Sender::new();
        let mut state = ReplicatedState::new();
        let h1 = EntityHandle::new();
        let u1 = UserId::new();

        let outcome = state.apply(&authority.send(spawn(h1, ItemColor::Red)));
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(state.items().get(h1), Some(ItemColor::Red));
        assert!(state.placements().get(h1).is_some());

        let destroy = collector.send(DestroyAction {
            entity_handle: h1,
            user_id: u1,
        });
        assert_eq!(state.apply(&destroy), ApplyOutcome::Applied);
        assert!(state.items().is_empty());
        assert!(state.placements().is_empty());
        assert_eq!(state.scores().current_score(u1), 1);

        // Redelivery of the very same envelope is dropped.
        let version = state.version();
        assert_eq!(state.apply(&destroy), ApplyOutcome::Duplicate);
        assert_eq!(state.scores().current_score(u1), 1);
        assert_eq!(state.version(), version);
        assert!(state.audit().is_empty());
    }

    #[test]
    fn distinct_stale_destroy_still_credits_collector() {
        let mut peer = Sender::new();
        let mut state = ReplicatedState::new();
        let u1 = UserId::new();

        let outcome = state.apply(&peer.send(DestroyAction {
            entity_handle: EntityHandle::new(),
            user_id: u1,
        }));
        assert_eq!(outcome, ApplyOutcome::StaleDestroy);
        assert!(outcome.changed_state());
        assert!(state.items().is_empty());
        assert_eq!(state.scores().current_score(u1), 1);
    }

    #[test]
    fn rejected_actions_do_not_change_state() {
        let mut peer = Sender::new();
        let mut state = ReplicatedState::new();

        let outcome = state.apply(&peer.send(DestroyAction {
            entity_handle: EntityHandle::new(),
            user_id: UserId::from(Uuid::nil()),
        }));
        assert_eq!(
            outcome,
            ApplyOutcome::Rejected(RejectionReason::MalformedIdentity)
        );
        assert!(!outcome.changed_state());
        assert_eq!(state.version(), 0);
        assert!(state.scores().is_empty());
        assert_eq!(state.applied_count(), 0);
    }

    #[test]
    fn duplicate_live_spawn_overwrites() {
        let mut authority = Sender::new();
        let mut state = ReplicatedState::new();
        let h = EntityHandle::new();

        state.apply(&authority.send(spawn(h, ItemColor::Blue)));
        let outcome = state.apply(&authority.send(spawn(h, ItemColor::Orange)));

        assert_eq!(
            outcome,
            ApplyOutcome::Overwrote {
                previous: ItemColor::Blue
            }
        );
        assert_eq!(state.items().len(), 1);
        assert_eq!(state.items().get(h), Some(ItemColor::Orange));
        assert!(state.audit().is_empty());
    }

    #[test]
    fn out_of_order_delivery_is_still_applied() {
        let mut authority = Sender::new();
        let mut state = ReplicatedState::new();
        let first = authority.send(spawn(EntityHandle::new(), ItemColor::Green));
        let second = authority.send(spawn(EntityHandle::new(), ItemColor::Yellow));

        assert_eq!(state.apply(&second), ApplyOutcome::Applied);
        assert_eq!(state.apply(&first), ApplyOutcome::Applied);
        assert_eq!(state.items().len(), 2);
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn delivery_bookkeeping_stays_bounded() {
        let mut authority = Sender::new();
        let mut state = ReplicatedState::new();

        for _ in 0..500 {
            let handle = EntityHandle::new();
            state.apply(&authority.send(spawn(handle, ItemColor::Red)));
            state.apply(&authority.send(DestroyAction {
                entity_handle: handle,
                user_id: UserId::new(),
            }));
        }
        assert_eq!(state.applied_count(), 1000);
        assert_eq!(state.out_of_order_pending(), 0);
        assert_eq!(state.delivered.len(), 1);
    }

    #[test]
    fn gap_closes_and_redelivery_across_it_is_dropped() {
        let mut authority = Sender::new();
        let mut state = ReplicatedState::new();
        let first = authority.send(spawn(EntityHandle::new(), ItemColor::Blue));
        let second = authority.send(spawn(EntityHandle::new(), ItemColor::Pink));
        let third = authority.send(spawn(EntityHandle::new(), ItemColor::Brown));

        state.apply(&third);
        assert_eq!(state.out_of_order_pending(), 1);
        assert_eq!(state.apply(&third), ApplyOutcome::Duplicate);

        state.apply(&first);
        state.apply(&second);
        assert_eq!(state.out_of_order_pending(), 0);
        assert_eq!(state.items().len(), 3);

        for envelope in [&first, &second, &third] {
            assert_eq!(state.apply(envelope), ApplyOutcome::Duplicate);
        }
        assert_eq!(state.version(), 3);
    }

    #[test]
    fn rejected_envelope_does_not_hold_a_gap_open() {
        let mut peer = Sender::new();
        let mut state = ReplicatedState::new();

        let bad = peer.send(DestroyAction {
            entity_handle: EntityHandle::new(),
            user_id: UserId::from(Uuid::nil()),
        });
        assert!(matches!(state.apply(&bad), ApplyOutcome::Rejected(_)));
        state.apply(&peer.send(spawn(EntityHandle::new(), ItemColor::Green)));
        assert_eq!(state.out_of_order_pending(), 0);
    }

    #[test]
    fn sequence_zero_is_rejected() {
        let mut state = ReplicatedState::new();
        let envelope = ActionEnvelope::new(
            PeerId::new(),
            0,
            spawn(EntityHandle::new(), ItemColor::Yellow),
        );
        assert_eq!(
            state.apply(&envelope),
            ApplyOutcome::Rejected(RejectionReason::MalformedSequence)
        );
        assert!(state.items().is_empty());
    }
}
