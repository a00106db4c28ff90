//! In-memory scene engine for headless sessions and tests.
//!
//! [`HeadlessScene`] keeps an entity tree with local transforms, records
//! the components the binder attaches, and detects trigger overlaps by
//! comparing avatar positions against each collectible's trigger sphere.
//! It renders nothing and resolves no physics.

use std::collections::{BTreeMap, BTreeSet};

use collectible_types::{EntityHandle, ItemColor};
use glam::{Quat, Vec3};
use tracing::debug;

use crate::ports::{CollectibleSpec, LocalEntity, Overlap, SceneEngine, SceneError};

/// Parent chains longer than this are treated as broken.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone)]
struct Node {
    name: Option<String>,
    parent: Option<LocalEntity>,
    position: Vec3,
    rotation: Quat,
    handle: Option<EntityHandle>,
    scene_root: bool,
    avatar: bool,
    collectible: Option<CollectibleSpec>,
    color: Option<ItemColor>,
}

impl Node {
    const fn empty() -> Self {
        Self {
            name: None,
            parent: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            handle: None,
            scene_root: false,
            avatar: false,
            collectible: None,
            color: None,
        }
    }
}

/// Entity tree standing in for a real engine scene.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: BTreeMap<LocalEntity, Node>,
    next_entity: u64,
    created: u64,
    /// Pairs overlapping as of the last [`SceneEngine::drain_overlaps`].
    overlapping: BTreeSet<Overlap>,
}

impl HeadlessScene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scene with one root registered under `root` and a named
    /// anchor object beneath it.
    pub fn with_anchor(root: EntityHandle, anchor_name: &str) -> Self {
        let mut scene = Self::new();
        let root_entity = scene.add_scene_root(root, "scene-root");
        scene.add_named(anchor_name, root_entity, Vec3::ZERO);
        scene
    }

    /// Add a scene root reachable by its replicated handle.
    pub fn add_scene_root(&mut self, handle: EntityHandle, name: &str) -> LocalEntity {
        let entity = self.allocate();
        self.nodes.insert(
            entity,
            Node {
                name: Some(name.to_owned()),
                handle: Some(handle),
                scene_root: true,
                ..Node::empty()
            },
        );
        entity
    }

    /// Add a named object under `parent`.
    pub fn add_named(&mut self, name: &str, parent: LocalEntity, position: Vec3) -> LocalEntity {
        let entity = self.allocate();
        self.nodes.insert(
            entity,
            Node {
                name: Some(name.to_owned()),
                parent: Some(parent),
                position,
                ..Node::empty()
            },
        );
        entity
    }

    /// Add an avatar-controlled entity at a world position.
    pub fn spawn_avatar(&mut self, position: Vec3) -> LocalEntity {
        let entity = self.allocate();
        self.nodes.insert(
            entity,
            Node {
                position,
                avatar: true,
                ..Node::empty()
            },
        );
        entity
    }

    /// Move an unparented entity to a world position.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownEntity`] if the entity does not exist.
    pub fn move_entity(&mut self, entity: LocalEntity, position: Vec3) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&entity)
            .ok_or(SceneError::UnknownEntity(entity))?;
        node.position = position;
        Ok(())
    }

    /// World-space position of an entity.
    pub fn world_position(&self, entity: LocalEntity) -> Option<Vec3> {
        let mut node = self.nodes.get(&entity)?;
        let mut position = node.position;
        for _ in 0..MAX_DEPTH {
            let Some(parent) = node.parent else {
                return Some(position);
            };
            node = self.nodes.get(&parent)?;
            position = node.rotation.mul_vec3(position) + node.position;
        }
        None
    }

    /// World positions of every materialized collectible.
    pub fn collectible_positions(&self) -> Vec<(LocalEntity, Vec3)> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.collectible.is_some())
            .filter_map(|(entity, _)| Some((*entity, self.world_position(*entity)?)))
            .collect()
    }

    /// Number of entities carrying collectible components.
    pub fn collectible_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.collectible.is_some())
            .count()
    }

    /// Colour applied to an entity's material.
    pub fn material_color(&self, entity: LocalEntity) -> Option<ItemColor> {
        self.nodes.get(&entity)?.color
    }

    /// Collectible components attached to an entity.
    pub fn collectible_spec(&self, entity: LocalEntity) -> Option<&CollectibleSpec> {
        self.nodes.get(&entity)?.collectible.as_ref()
    }

    /// Whether the entity exists.
    pub fn contains(&self, entity: LocalEntity) -> bool {
        self.nodes.contains_key(&entity)
    }

    /// Total entities ever created.
    pub const fn entities_created(&self) -> u64 {
        self.created
    }

    fn allocate(&mut self) -> LocalEntity {
        let entity = LocalEntity(self.next_entity);
        self.next_entity = self.next_entity.saturating_add(1);
        self.created = self.created.saturating_add(1);
        entity
    }

    fn is_ancestor(&self, candidate: LocalEntity, of: LocalEntity) -> bool {
        let mut current = Some(of);
        for _ in 0..MAX_DEPTH {
            let Some(entity) = current else {
                return false;
            };
            if entity == candidate {
                return true;
            }
            current = self.nodes.get(&entity).and_then(|node| node.parent);
        }
        true
    }

    fn current_overlaps(&self) -> BTreeSet<Overlap> {
        let avatars: Vec<(LocalEntity, Vec3)> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.avatar)
            .filter_map(|(entity, _)| Some((*entity, self.world_position(*entity)?)))
            .collect();

        let mut overlaps = BTreeSet::new();
        for (trigger, node) in &self.nodes {
            let Some(spec) = &node.collectible else {
                continue;
            };
            let Some(center) = self.world_position(*trigger) else {
                continue;
            };
            for (avatar, position) in &avatars {
                if position.distance(center) <= spec.trigger_radius {
                    overlaps.insert(Overlap {
                        trigger: *trigger,
                        other: *avatar,
                    });
                }
            }
        }
        overlaps
    }
}

impl SceneEngine for HeadlessScene {
    fn create_entity(&mut self) -> LocalEntity {
        let entity = self.allocate();
        self.nodes.insert(entity, Node::empty());
        entity
    }

    fn destroy_entity(&mut self, entity: LocalEntity) -> bool {
        let existed = self.nodes.remove(&entity).is_some();
        if existed {
            self.overlapping.retain(|o| o.trigger != entity && o.other != entity);
            for node in self.nodes.values_mut() {
                if node.parent == Some(entity) {
                    node.parent = None;
                }
            }
        }
        existed
    }

    fn set_parent_and_transform(
        &mut self,
        entity: LocalEntity,
        parent: LocalEntity,
        position: Vec3,
        rotation: Quat,
    ) -> Result<(), SceneError> {
        if !self.nodes.contains_key(&parent) {
            return Err(SceneError::UnknownEntity(parent));
        }
        if self.is_ancestor(entity, parent) {
            return Err(SceneError::ParentCycle {
                child: entity,
                parent,
            });
        }
        let node = self
            .nodes
            .get_mut(&entity)
            .ok_or(SceneError::UnknownEntity(entity))?;
        node.parent = Some(parent);
        node.position = position;
        node.rotation = rotation;
        Ok(())
    }

    fn attach_collectible(
        &mut self,
        entity: LocalEntity,
        spec: &CollectibleSpec,
    ) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&entity)
            .ok_or(SceneError::UnknownEntity(entity))?;
        node.collectible = Some(spec.clone());
        Ok(())
    }

    fn set_material_color(
        &mut self,
        entity: LocalEntity,
        color: ItemColor,
    ) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&entity)
            .ok_or(SceneError::UnknownEntity(entity))?;
        node.color = Some(color);
        Ok(())
    }

    fn find_named(&self, name: &str) -> Option<LocalEntity> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name.as_deref() == Some(name))
            .map(|(entity, _)| *entity)
    }

    fn scene_root_of(&self, entity: LocalEntity) -> Option<LocalEntity> {
        let mut current = entity;
        for _ in 0..MAX_DEPTH {
            let node = self.nodes.get(&current)?;
            if node.scene_root {
                return Some(current);
            }
            current = node.parent?;
        }
        None
    }

    fn handle_of(&self, entity: LocalEntity) -> Option<EntityHandle> {
        self.nodes.get(&entity)?.handle
    }

    fn entity_for_handle(&self, handle: EntityHandle) -> Option<LocalEntity> {
        self.nodes
            .iter()
            .find(|(_, node)| node.handle == Some(handle))
            .map(|(entity, _)| *entity)
    }

    fn fresh_handle(&mut self) -> EntityHandle {
        EntityHandle::new()
    }

    fn drain_overlaps(&mut self) -> Vec<Overlap> {
        let current = self.current_overlaps();
        let entered: Vec<Overlap> = current.difference(&self.overlapping).copied().collect();
        for overlap in &entered {
            debug!(trigger = %overlap.trigger, other = %overlap.other, "Trigger overlap began");
        }
        self.overlapping = current;
        entered
    }
}
