//! World wrapper around hecs holding the track's trigger volumes

use hecs::Entity;

use super::components::{Aabb, Collider, Layer, Name, WaypointTrigger};
use crate::ai::{Contact, WaypointId};
use crate::core::ZoneTag;

/// Track world containing every obstacle and trigger volume
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn a tagged trigger volume
    pub fn spawn_volume(
        &mut self,
        name: impl Into<String>,
        bounds: Aabb,
        tag: ZoneTag,
        layer: u32,
    ) -> Entity {
        self.inner
            .spawn((Name::new(name), Collider { bounds }, tag, Layer(layer)))
    }

    /// Spawn the pickup volume of a waypoint
    pub fn spawn_waypoint_trigger(
        &mut self,
        name: impl Into<String>,
        bounds: Aabb,
        waypoint: WaypointId,
    ) -> Entity {
        self.inner.spawn((
            Name::new(name),
            Collider { bounds },
            ZoneTag::Waypoint,
            Layer(0),
            WaypointTrigger(waypoint),
        ))
    }

    /// Despawn an entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Bounds of a volume, `None` once the entity is gone
    pub fn bounds(&self, entity: Entity) -> Option<Aabb> {
        self.inner
            .get::<&Collider>(entity)
            .ok()
            .map(|collider| collider.bounds)
    }

    /// Tag of a volume (`Untagged` when it has none)
    pub fn tag(&self, entity: Entity) -> ZoneTag {
        self.inner
            .get::<&ZoneTag>(entity)
            .map(|tag| *tag)
            .unwrap_or(ZoneTag::Untagged)
    }

    /// Waypoint a trigger volume belongs to
    pub fn waypoint_of(&self, entity: Entity) -> Option<WaypointId> {
        self.inner
            .get::<&WaypointTrigger>(entity)
            .ok()
            .map(|trigger| trigger.0)
    }

    /// Debug name of a volume
    pub fn name(&self, entity: Entity) -> Option<String> {
        self.inner
            .get::<&Name>(entity)
            .ok()
            .map(|name| name.0.clone())
    }

    /// What a sensor sees when this volume enters or leaves it
    pub fn contact(&self, entity: Entity) -> Option<Contact> {
        let bounds = self.bounds(entity)?;
        let layer = self
            .inner
            .get::<&Layer>(entity)
            .map(|layer| layer.0)
            .unwrap_or(0);

        Some(Contact {
            entity,
            tag: self.tag(entity),
            layer,
            extent: bounds.size().x,
        })
    }

    /// All volumes whose bounds satisfy `overlaps`, in storage order
    pub fn overlapping(&self, mut overlaps: impl FnMut(&Aabb) -> bool) -> Vec<Entity> {
        self.inner
            .query::<&Collider>()
            .iter()
            .filter(|(_, collider)| overlaps(&collider.bounds))
            .map(|(entity, _)| entity)
            .collect()
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.inner.len())
            .finish()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
