//! Authority spawn policy.
//!
//! Evaluated once per tick. On the authoritative process it keeps the live
//! item count at the configured cap by producing a [`SpawnAction`] with a
//! random colour, a random position in a square region, and a uniformly
//! random orientation. Every other process gets [`SpawnDecision::NotAuthority`].
//!
//! A dispatched spawn counts against the cap until its own echo is folded
//! and [`SpawnPolicy::acknowledge`] is called, so a slow channel cannot
//! push the live count past the cap.

use std::collections::BTreeSet;
use std::f32::consts::TAU;

use collectible_state::ItemState;
use collectible_types::{EntityHandle, ItemColor, Position, Rotation, SpawnAction};
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::SpawnConfig;
use crate::ports::SceneEngine;

/// Outcome of one policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnDecision {
    /// This process is not the authority.
    NotAuthority,
    /// The live item cap is reached.
    AtCapacity {
        /// Live items at evaluation time.
        live: usize,
        /// Spawns dispatched but not yet folded back.
        pending: usize,
    },
    /// The anchor or its scene root could not be resolved; retry next tick.
    AnchorUnresolved,
    /// A spawn action should be dispatched.
    Spawned(SpawnAction),
}

/// Seeded spawn policy for the authoritative process.
#[derive(Debug, Clone)]
pub struct SpawnPolicy {
    config: SpawnConfig,
    rng: StdRng,
    /// Handles dispatched and awaiting their echo.
    pending: BTreeSet<EntityHandle>,
}

impl SpawnPolicy {
    /// Create a policy drawing from an RNG seeded with `seed`.
    pub fn new(config: SpawnConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            pending: BTreeSet::new(),
        }
    }

    /// The policy configuration.
    pub const fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Spawns dispatched but not yet acknowledged.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Release a pending spawn once its echo has been folded, or once its
    /// dispatch failed. Returns whether `handle` was pending.
    pub fn acknowledge(&mut self, handle: EntityHandle) -> bool {
        self.pending.remove(&handle)
    }

    /// Decide whether to spawn this tick.
    pub fn evaluate(
        &mut self,
        is_authority: bool,
        items: &ItemState,
        scene: &mut dyn SceneEngine,
    ) -> SpawnDecision {
        if !is_authority {
            return SpawnDecision::NotAuthority;
        }

        let live = items.len();
        let pending = self.pending.len();
        if live.saturating_add(pending) >= self.config.max_live_items {
            return SpawnDecision::AtCapacity { live, pending };
        }

        let Some(color) = ItemColor::ALL.choose(&mut self.rng).copied() else {
            return SpawnDecision::AtCapacity { live, pending };
        };

        let Some(parent_handle) = scene
            .find_named(&self.config.anchor_name)
            .and_then(|anchor| scene.scene_root_of(anchor))
            .and_then(|root| scene.handle_of(root))
        else {
            debug!(anchor = %self.config.anchor_name, "Spawn anchor not resolved; retrying next tick");
            return SpawnDecision::AnchorUnresolved;
        };

        let action = SpawnAction {
            entity_handle: scene.fresh_handle(),
            parent_handle,
            color,
            position: Position::from(self.random_position()),
            rotation: Rotation::from(self.random_orientation()),
        };
        self.pending.insert(action.entity_handle);
        SpawnDecision::Spawned(action)
    }

    /// Uniform point in the square region at the configured height.
    fn random_position(&mut self) -> Vec3 {
        let extent = if self.config.half_extent.is_finite() {
            self.config.half_extent.abs()
        } else {
            0.0
        };
        let x = self.rng.random_range(-extent..=extent);
        let z = self.rng.random_range(-extent..=extent);
        Vec3::new(x, self.config.height, z)
    }

    /// Uniform unit quaternion (Shoemake's subgroup algorithm).
    fn random_orientation(&mut self) -> Quat {
        let u1: f32 = self.rng.random();
        let u2: f32 = self.rng.random();
        let u3: f32 = self.rng.random();

        let a = (1.0 - u1).sqrt();
        let b = u1.sqrt();
        let (sin2, cos2) = (TAU * u2).sin_cos();
        let (sin3, cos3) = (TAU * u3).sin_cos();

        Quat::from_xyzw(a * sin2, a * cos2, b * sin3, b * cos3).normalize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use collectible_types::EntityHandle;

    use super::*;
    use crate::headless::HeadlessScene;

    fn scene_with_anchor() -> (HeadlessScene, EntityHandle) {
        let root = EntityHandle::new();
        (HeadlessScene::with_anchor(root, "collectible-anchor"), root)
    }

    fn spawned(decision: SpawnDecision) -> SpawnAction {
        match decision {
            SpawnDecision::Spawned(action) => action,
            other => panic!("expected a spawn, got {other:?}"),
        }
    }

    /// Evaluate against an empty store and release the spawn at once, as if
    /// its echo had been collected before the next tick.
    fn spawn_and_release(policy: &mut SpawnPolicy, scene: &mut HeadlessScene) -> SpawnAction {
        let action = spawned(policy.evaluate(true, &ItemState::new(), scene));
        assert!(policy.acknowledge(action.entity_handle));
        action
    }

    #[test]
    fn non_authority_never_spawns() {
        let (mut scene, _) = scene_with_anchor();
        let mut policy = SpawnPolicy::new(SpawnConfig::default(), 1);
        let decision = policy.evaluate(false, &ItemState::new(), &mut scene);
        assert_eq!(decision, SpawnDecision::NotAuthority);
    }

    #[test]
    fn spawns_under_anchor_root_within_region() {
        let (mut scene, root) = scene_with_anchor();
        let mut policy = SpawnPolicy::new(SpawnConfig::default(), 7);

        for _ in 0..200 {
            let action = spawn_and_release(&mut policy, &mut scene);
            assert_eq!(action.parent_handle, root);
            assert!(action.position.x.abs() <= 10.0);
            assert!(action.position.z.abs() <= 10.0);
            assert_eq!(action.position.y, 0.5);
            assert!((action.rotation.norm_squared() - 1.0).abs() < 1e-4);
            assert!(ItemColor::ALL.contains(&action.color));
        }
    }

    #[test]
    fn handles_are_fresh() {
        let (mut scene, _) = scene_with_anchor();
        let mut policy = SpawnPolicy::new(SpawnConfig::default(), 3);
        let a = spawn_and_release(&mut policy, &mut scene);
        let b = spawn_and_release(&mut policy, &mut scene);
        assert_ne!(a.entity_handle, b.entity_handle);
    }

    #[test]
    fn at_capacity_does_nothing() {
        let (mut scene, root) = scene_with_anchor();
        let mut policy = SpawnPolicy::new(SpawnConfig::default(), 5);
        let mut items = ItemState::new();
        items.apply_spawn(&SpawnAction {
            entity_handle: EntityHandle::new(),
            parent_handle: root,
            color: ItemColor::Red,
            position: Position::new(0.0, 0.5, 0.0),
            rotation: Rotation::IDENTITY,
        });

        let decision = policy.evaluate(true, &items, &mut scene);
        assert_eq!(
            decision,
            SpawnDecision::AtCapacity {
                live: 1,
                pending: 0
            }
        );
    }

    #[test]
    fn unechoed_spawn_holds_the_cap() {
        let (mut scene, _) = scene_with_anchor();
        let mut policy = SpawnPolicy::new(SpawnConfig::default(), 5);

        let action = spawned(policy.evaluate(true, &ItemState::new(), &mut scene));
        assert_eq!(policy.pending(), 1);
        for _ in 0..3 {
            assert_eq!(
                policy.evaluate(true, &ItemState::new(), &mut scene),
                SpawnDecision::AtCapacity {
                    live: 0,
                    pending: 1
                }
            );
        }

        assert!(policy.acknowledge(action.entity_handle));
        assert!(!policy.acknowledge(action.entity_handle));
        assert_eq!(policy.pending(), 0);
        spawned(policy.evaluate(true, &ItemState::new(), &mut scene));
    }

    #[test]
    fn missing_anchor_defers() {
        let mut scene = HeadlessScene::new();
        let mut policy = SpawnPolicy::new(SpawnConfig::default(), 5);
        let decision = policy.evaluate(true, &ItemState::new(), &mut scene);
        assert_eq!(decision, SpawnDecision::AnchorUnresolved);

        // Anchor present but not under a scene root.
        let orphan = scene.create_entity();
        scene.add_named("collectible-anchor", orphan, Vec3::ZERO);
        let decision = policy.evaluate(true, &ItemState::new(), &mut scene);
        assert_eq!(decision, SpawnDecision::AnchorUnresolved);
    }

    #[test]
    fn same_seed_same_choices() {
        let (mut scene_a, _) = scene_with_anchor();
        let (mut scene_b, _) = scene_with_anchor();
        let mut a = SpawnPolicy::new(SpawnConfig::default(), 11);
        let mut b = SpawnPolicy::new(SpawnConfig::default(), 11);

        for _ in 0..10 {
            let x = spawn_and_release(&mut a, &mut scene_a);
            let y = spawn_and_release(&mut b, &mut scene_b);
            assert_eq!(x.color, y.color);
            assert_eq!(x.position, y.position);
            assert_eq!(x.rotation, y.rotation);
        }
    }

    #[test]
    fn colours_cover_the_set() {
        let (mut scene, _) = scene_with_anchor();
        let mut policy = SpawnPolicy::new(SpawnConfig::default(), 13);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..400 {
            seen.insert(spawn_and_release(&mut policy, &mut scene).color);
        }
        assert_eq!(seen.len(), ItemColor::ALL.len());
    }
}
