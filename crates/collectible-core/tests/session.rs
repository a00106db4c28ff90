//! Integration tests for multi-participant sessions.
//!
//! Tests wire real participants through a [`LoopbackHub`] with one
//! [`HeadlessScene`] per participant, and drive avatars by hand instead of
//! with bots so every collection is deterministic.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use collectible_core::config::SessionConfig;
use collectible_core::headless::HeadlessScene;
use collectible_core::loopback::{LoopbackChannel, LoopbackHub};
use collectible_core::participant::{Participant, TickSummary};
use collectible_core::ports::{ActionChannel, LocalEntity, LocalIdentity, SceneEngine};
use collectible_core::spawn::SpawnDecision;
use collectible_events::ReplayCheck;
use collectible_types::{
    EntityHandle, ItemColor, Position, Rotation, SpawnAction, UserId, encode,
};
use glam::Vec3;

type TestParticipant = Participant<LoopbackChannel, HeadlessScene, LocalIdentity>;

const ANCHOR: &str = "collectible-anchor";
const PARKED: Vec3 = Vec3::new(100.0, 0.5, 100.0);

/// A session whose avatars are mirrored into every participant's scene.
struct World {
    hub: LoopbackHub,
    root: EntityHandle,
    config: SessionConfig,
    participants: Vec<TestParticipant>,
    users: Vec<UserId>,
    /// `avatars[k][i]`: participant `i`'s avatar in participant `k`'s scene.
    avatars: Vec<Vec<LocalEntity>>,
}

impl World {
    fn new(hub: LoopbackHub) -> Self {
        Self {
            hub,
            root: EntityHandle::new(),
            config: SessionConfig::default(),
            participants: Vec::new(),
            users: Vec::new(),
            avatars: Vec::new(),
        }
    }

    /// Add a participant; existing scenes get a mirror of its avatar.
    fn join(&mut self, authority: bool) -> usize {
        let index = self.participants.len();
        for (k, participant) in self.participants.iter_mut().enumerate() {
            let mirror = participant.scene_mut().spawn_avatar(PARKED);
            self.avatars[k].push(mirror);
        }

        let mut scene = HeadlessScene::with_anchor(self.root, ANCHOR);
        let row: Vec<LocalEntity> = (0..=index).map(|_| scene.spawn_avatar(PARKED)).collect();
        let user = UserId::new();
        let participant = Participant::new(
            format!("p{index}"),
            &self.config,
            self.hub.join(authority).unwrap(),
            scene,
            LocalIdentity::new(user, Some(row[index])),
        );

        self.participants.push(participant);
        self.users.push(user);
        self.avatars.push(row);
        index
    }

    /// Run one tick on every participant, in join order.
    fn round(&mut self) -> Vec<TickSummary> {
        self.participants
            .iter_mut()
            .map(|p| p.run_tick().unwrap())
            .collect()
    }

    /// Move participant `i`'s avatar in every scene.
    fn move_avatar(&mut self, i: usize, position: Vec3) {
        for (k, participant) in self.participants.iter_mut().enumerate() {
            participant
                .scene_mut()
                .move_entity(self.avatars[k][i], position)
                .unwrap();
        }
    }

    /// World position of the single collectible in participant `k`'s scene.
    fn item_position(&self, k: usize) -> Option<Vec3> {
        let positions = self.participants[k].scene().collectible_positions();
        positions.first().map(|(_, p)| *p)
    }

    fn assert_converged(&self) {
        let reference = self.participants[0].state();
        for participant in &self.participants {
            let state = participant.state();
            assert_eq!(state.items(), reference.items());
            assert_eq!(state.scores(), reference.scores());
            assert_eq!(state.placements(), reference.placements());
            assert!(state.audit().is_empty());
            assert_eq!(
                participant.log().verify_against(state),
                ReplayCheck::Consistent
            );

            let live: Vec<EntityHandle> = state.items().snapshot().map(|(h, _)| h).collect();
            let bound: Vec<EntityHandle> = participant.binder().handles().collect();
            assert_eq!(live, bound);
        }
    }
}

fn red_at_origin(handle: EntityHandle, parent: EntityHandle) -> SpawnAction {
    SpawnAction {
        entity_handle: handle,
        parent_handle: parent,
        color: ItemColor::Red,
        position: Position::new(0.0, 0.5, 0.0),
        rotation: Rotation::IDENTITY,
    }
}

#[test]
fn spawn_collect_and_redelivered_destroy() {
    let mut world = World::new(LoopbackHub::new());
    let host = world.join(true);
    let u1 = world.join(false);
    let h1 = EntityHandle::new();

    // Authority dispatches the spawn before its first tick.
    let spawn = red_at_origin(h1, world.root);
    world.participants[host].dispatch(spawn).unwrap();

    let round = world.round();
    assert_eq!(
        round[host].spawn,
        SpawnDecision::AtCapacity {
            live: 1,
            pending: 0
        }
    );
    for participant in &world.participants {
        let items: Vec<_> = participant.state().items().snapshot().collect();
        assert_eq!(items, vec![(h1, ItemColor::Red)]);
        assert_eq!(participant.binder().len(), 1);
        assert_eq!(participant.scene().collectible_count(), 1);
    }

    // U1 walks onto the item and dispatches the destroy.
    world.move_avatar(u1, Vec3::new(0.0, 0.5, 0.0));
    let round = world.round();
    assert_eq!(round[u1].collected, vec![h1]);
    assert!(round[host].collected.is_empty());

    // The host folds the destroy on its next tick, before spawning again.
    world.move_avatar(u1, PARKED);
    let round = world.round();
    let host_state = world.participants[host].state();
    assert!(round[host].received.applied >= 1);
    assert!(!host_state.items().contains(h1));
    assert_eq!(host_state.scores().current_score(world.users[u1]), 1);
    assert!(world.participants[host].binder().get(h1).is_none());

    // Redeliver the exact destroy envelope through another peer.
    let destroy = world.participants[host]
        .log()
        .iter()
        .map(|entry| entry.envelope)
        .find(|envelope| {
            envelope.action.entity_handle() == h1
                && envelope.action.kind() == collectible_types::ActionKind::Destroy
        })
        .unwrap();
    let mut replayer = world.hub.join(false).unwrap();
    replayer.dispatch(encode(&destroy).unwrap()).unwrap();

    let round = world.round();
    assert_eq!(round[host].received.duplicates, 1);
    for participant in &world.participants {
        assert_eq!(
            participant.state().scores().current_score(world.users[u1]),
            1
        );
        assert!(!participant.state().items().contains(h1));
    }
    world.assert_converged();
}

#[test]
fn at_most_one_live_item() {
    let mut world = World::new(LoopbackHub::new());
    world.join(true);
    let collector = world.join(false);
    world.join(false);

    let mut collections = 0_u64;
    for _ in 0..200 {
        if let Some(position) = world.item_position(collector) {
            world.move_avatar(collector, position);
        } else {
            world.move_avatar(collector, PARKED);
        }
        for summary in world.round() {
            assert!(summary.live_items <= 1);
            collections += u64::try_from(summary.collected.len()).unwrap();
        }
        for participant in &world.participants {
            assert!(participant.state().items().len() <= 1);
            assert!(participant.binder().len() <= 1);
        }
    }

    assert!(collections > 10);
    world.move_avatar(collector, PARKED);
    for _ in 0..3 {
        world.round();
    }
    world.assert_converged();

    let scores = world.participants[0].state().scores();
    assert_eq!(scores.current_score(world.users[collector]), collections);
    assert_eq!(scores.len(), 1);
}

#[test]
fn only_the_overlapping_participant_collects() {
    let mut world = World::new(LoopbackHub::new());
    let host = world.join(true);
    let a = world.join(false);
    let b = world.join(false);

    // Let the first spawn reach every participant and be bound.
    world.round();
    world.round();
    let position = world.item_position(b).unwrap();

    // Only A's avatar moves, but every scene sees the overlap.
    world.move_avatar(a, position);
    let round = world.round();

    assert_eq!(round[a].collected.len(), 1);
    assert!(round[b].collected.is_empty());
    assert!(round[host].collected.is_empty());

    world.move_avatar(a, PARKED);
    world.round();
    world.round();
    let scores = world.participants[b].state().scores();
    assert_eq!(scores.current_score(world.users[a]), 1);
    assert_eq!(scores.current_score(world.users[b]), 0);
    assert_eq!(scores.current_score(world.users[host]), 0);
}

#[test]
fn late_joiner_replays_history() {
    let mut world = World::new(LoopbackHub::new());
    world.join(true);
    let collector = world.join(false);

    for _ in 0..60 {
        if let Some(position) = world.item_position(collector) {
            world.move_avatar(collector, position);
        }
        world.round();
    }
    world.move_avatar(collector, PARKED);
    world.round();
    world.round();
    assert!(world.participants[0].state().scores().total() > 0);

    let late = world.join(false);
    let summary = world.participants[late].run_tick().unwrap();
    assert!(summary.received.frames > 0);
    assert_eq!(summary.received.malformed, 0);

    let authority = world.participants[0].state();
    let joiner = world.participants[late].state();
    assert_eq!(joiner.items(), authority.items());
    assert_eq!(joiner.scores(), authority.scores());
    assert_eq!(
        world.participants[late].binder().len(),
        joiner.items().len()
    );

    world.round();
    world.assert_converged();
}

#[test]
fn redelivering_transport_does_not_overcount() {
    let mut world = World::new(LoopbackHub::with_redelivery());
    world.join(true);
    let collector = world.join(false);

    let mut collections = 0_u64;
    let mut duplicates = 0_usize;
    for _ in 0..80 {
        if let Some(position) = world.item_position(collector) {
            world.move_avatar(collector, position);
        } else {
            world.move_avatar(collector, PARKED);
        }
        for summary in world.round() {
            collections += u64::try_from(summary.collected.len()).unwrap();
            duplicates += summary.received.duplicates;
        }
    }
    world.move_avatar(collector, PARKED);
    for _ in 0..3 {
        world.round();
    }

    assert!(collections > 0);
    assert!(duplicates > 0);
    assert_eq!(
        world.participants[0]
            .state()
            .scores()
            .current_score(world.users[collector]),
        collections
    );
    world.assert_converged();
}

#[test]
fn missing_anchor_defers_spawning() {
    let hub = LoopbackHub::new();
    let mut scene = HeadlessScene::new();
    let avatar = scene.spawn_avatar(PARKED);
    let mut host = Participant::new(
        "anchorless",
        &SessionConfig::default(),
        hub.join(true).unwrap(),
        scene,
        LocalIdentity::new(UserId::new(), Some(avatar)),
    );

    for _ in 0..3 {
        let summary = host.run_tick().unwrap();
        assert_eq!(summary.spawn, SpawnDecision::AnchorUnresolved);
    }

    // The anchor appears later; the next tick spawns.
    let root = host.scene_mut().add_scene_root(EntityHandle::new(), "root");
    host.scene_mut().add_named(ANCHOR, root, Vec3::ZERO);
    let summary = host.run_tick().unwrap();
    assert!(matches!(summary.spawn, SpawnDecision::Spawned(_)));
    assert!(host.channel().is_authority());
    assert_eq!(host.scene().find_named(ANCHOR), Some(LocalEntity(2)));
}
