//! Reactive entity binder: keeps live entities in step with `ItemState`.
//!
//! Each reactive pass diffs the live item set against the handles already
//! bound and drives create, update, and destroy calls from that diff. An
//! overwritten item is recolored and moved in place.
//! Running a pass against an unchanged state is a no-op.
//!
//! The handle to local-entity table is private. Other components hold
//! handles only; the trigger bridge asks [`EntityBinder::handle_for`] to
//! translate the entity an overlap names.

use std::collections::BTreeMap;

use collectible_state::{ItemState, Placement, PlacementState};
use collectible_types::{EntityHandle, ItemColor};
use tracing::{debug, info, warn};

use crate::ports::{CollectibleSpec, LocalEntity, SceneEngine, SceneError};

/// A live entity bound to an item handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundItem {
    /// The materialized entity.
    pub entity: LocalEntity,
    /// Colour currently applied to its material.
    pub color: ItemColor,
    /// Parent and local transform currently applied to the entity.
    pub placement: Placement,
    /// Whether a collection has already been reported for it.
    pub collected: bool,
}

/// What one reactive pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Handles materialized this pass.
    pub created: Vec<EntityHandle>,
    /// Handles whose entity was released this pass.
    pub removed: Vec<EntityHandle>,
    /// Handles whose material colour changed in place.
    pub recolored: Vec<EntityHandle>,
    /// Handles whose entity was re-parented or moved in place.
    pub moved: Vec<EntityHandle>,
    /// Live handles left unbound until a later pass.
    pub deferred: Vec<EntityHandle>,
}

impl BindReport {
    /// Whether the pass touched any entity.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.removed.is_empty()
            && self.recolored.is_empty()
            && self.moved.is_empty()
    }
}

/// Owner of every collectible entity on this process.
#[derive(Debug)]
pub struct EntityBinder {
    spec: CollectibleSpec,
    bound: BTreeMap<EntityHandle, BoundItem>,
    by_entity: BTreeMap<LocalEntity, EntityHandle>,
}

impl EntityBinder {
    /// Create a binder that materializes entities with `spec`.
    pub const fn new(spec: CollectibleSpec) -> Self {
        Self {
            spec,
            bound: BTreeMap::new(),
            by_entity: BTreeMap::new(),
        }
    }

    /// Bring bound entities in line with the live items.
    pub fn reconcile(
        &mut self,
        items: &ItemState,
        placements: &PlacementState,
        scene: &mut dyn SceneEngine,
    ) -> BindReport {
        let mut report = BindReport::default();

        let stale: Vec<EntityHandle> = self
            .bound
            .keys()
            .copied()
            .filter(|handle| !items.contains(*handle))
            .collect();
        for handle in stale {
            if let Some(bound) = self.bound.remove(&handle) {
                self.by_entity.remove(&bound.entity);
                if !scene.destroy_entity(bound.entity) {
                    warn!(%handle, entity = %bound.entity, "Bound entity was already gone");
                }
                debug!(%handle, entity = %bound.entity, "Released collectible entity");
                report.removed.push(handle);
            }
        }

        for (handle, color) in items.snapshot() {
            let Some(placement) = placements.get(handle) else {
                warn!(%handle, "Live item has no placement; deferring");
                report.deferred.push(handle);
                continue;
            };

            if let Some(bound) = self.bound.get_mut(&handle) {
                if bound.color != color {
                    match scene.set_material_color(bound.entity, color) {
                        Ok(()) => {
                            bound.color = color;
                            report.recolored.push(handle);
                        }
                        Err(error) => {
                            warn!(%handle, %error, "Failed to recolor collectible");
                        }
                    }
                }
                if bound.placement != *placement {
                    match place(bound.entity, placement, scene) {
                        Ok(true) => {
                            bound.placement = *placement;
                            report.moved.push(handle);
                        }
                        Ok(false) => {
                            debug!(%handle, parent = %placement.parent, "New parent not resolved yet; deferring move");
                            report.deferred.push(handle);
                        }
                        Err(error) => {
                            warn!(%handle, %error, "Failed to move collectible; deferring");
                            report.deferred.push(handle);
                        }
                    }
                }
                continue;
            }

            match self.materialize(handle, color, placement, scene) {
                Ok(Some(entity)) => {
                    self.bound.insert(
                        handle,
                        BoundItem {
                            entity,
                            color,
                            placement: *placement,
                            collected: false,
                        },
                    );
                    self.by_entity.insert(entity, handle);
                    report.created.push(handle);
                }
                Ok(None) => {
                    debug!(%handle, parent = %placement.parent, "Parent not resolved yet; deferring");
                    report.deferred.push(handle);
                }
                Err(error) => {
                    warn!(%handle, %error, "Failed to materialize collectible; deferring");
                    report.deferred.push(handle);
                }
            }
        }

        if !report.is_noop() {
            info!(
                created = report.created.len(),
                removed = report.removed.len(),
                recolored = report.recolored.len(),
                moved = report.moved.len(),
                deferred = report.deferred.len(),
                bound = self.bound.len(),
                "Reactive pass applied"
            );
        }
        report
    }

    /// Record that a collection was reported for `handle`.
    ///
    /// Returns `true` the first time only, so each item is reported once
    /// no matter how many overlaps the engine emits.
    pub fn mark_collected(&mut self, handle: EntityHandle) -> bool {
        match self.bound.get_mut(&handle) {
            Some(bound) if !bound.collected => {
                bound.collected = true;
                true
            }
            _ => false,
        }
    }

    /// Handle bound to a local entity.
    pub fn handle_for(&self, entity: LocalEntity) -> Option<EntityHandle> {
        self.by_entity.get(&entity).copied()
    }

    /// The binding for `handle`.
    pub fn get(&self, handle: EntityHandle) -> Option<&BoundItem> {
        self.bound.get(&handle)
    }

    /// Iterate over bound handles in handle order.
    pub fn handles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.bound.keys().copied()
    }

    /// Number of bound entities.
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Create and configure the entity for one item.
    ///
    /// Returns `Ok(None)` when the parent handle has no local entity yet.
    fn materialize(
        &self,
        handle: EntityHandle,
        color: ItemColor,
        placement: &Placement,
        scene: &mut dyn SceneEngine,
    ) -> Result<Option<LocalEntity>, SceneError> {
        let Some(parent) = scene.entity_for_handle(placement.parent) else {
            return Ok(None);
        };

        let entity = scene.create_entity();
        let configured = scene
            .set_parent_and_transform(
                entity,
                parent,
                placement.position.to_vec3(),
                placement.rotation.to_quat(),
            )
            .and_then(|()| scene.attach_collectible(entity, &self.spec))
            .and_then(|()| scene.set_material_color(entity, color));

        if let Err(error) = configured {
            scene.destroy_entity(entity);
            return Err(error);
        }

        debug!(%handle, %entity, %parent, %color, "Materialized collectible entity");
        Ok(Some(entity))
    }
}

/// Re-parent and move an existing entity to `placement`.
///
/// Returns `Ok(false)` when the parent handle has no local entity yet.
fn place(
    entity: LocalEntity,
    placement: &Placement,
    scene: &mut dyn SceneEngine,
) -> Result<bool, SceneError> {
    let Some(parent) = scene.entity_for_handle(placement.parent) else {
        return Ok(false);
    };
    scene.set_parent_and_transform(
        entity,
        parent,
        placement.position.to_vec3(),
        placement.rotation.to_quat(),
    )?;
    debug!(%entity, %parent, "Moved collectible entity");
    Ok(true)
}
