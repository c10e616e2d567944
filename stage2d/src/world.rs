use std::collections::HashMap;

use crate::entities::Entity;

/// Unique identifier for an entity in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Get the underlying integer ID (useful for debugging).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Owns every entity in the scene.
///
/// The world only stores entities. Whether an entity is drawn, moved or collided is decided by
/// the registries in [`Compositor`](crate::render::Compositor) and
/// [`Scheduler`](crate::scheduler::Scheduler), which refer to entities by [`EntityId`].
pub struct World {
    next_id: u32,
    entities: HashMap<EntityId, Entity>,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: HashMap::new(),
        }
    }

    /// Store an entity and return its `EntityId`.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity, handing it back if it existed.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over all entities in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().map(|(&id, entity)| (id, entity))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Sprite;

    #[test]
    fn spawn_assigns_distinct_ids() {
        let mut world = World::new();
        let a = world.spawn(Entity::drawable(Sprite::default()));
        let b = world.spawn(Entity::drawable(Sprite::default()));
        assert_ne!(a, b);
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn despawn_returns_the_entity_once() {
        let mut world = World::new();
        let id = world.spawn(Entity::drawable(Sprite::default().with_layer(3)));
        let entity = world.despawn(id).expect("spawned");
        assert_eq!(entity.sprite.layer, 3);
        assert!(world.despawn(id).is_none());
        assert!(!world.contains(id));
        assert!(world.is_empty());
    }
}
