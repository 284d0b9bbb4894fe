//! SceneHost: transform/parenting callbacks, которые предоставляет host
//!
//! # Architecture
//!
//! Core не владеет иерархией трансформов. Mounter'ы и accessory state machine
//! ходят в host через этот trait:
//! - hierarchy: `parent` / `attach` (raw re-parent)
//! - local pose: `local_transform` / `set_local_transform`
//! - liveness: `is_alive` (out-of-band destruction detection)
//! - colliders: `collider_flags` / `set_collider_flags` (body parts)
//!
//! `impl SceneHost for World` - дефолтный host для Bevy:
//! `ChildOf` для иерархии, `Transform` для local pose,
//! rapier `ColliderDisabled`/`Sensor` для флагов коллайдера.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{ColliderDisabled, Sensor};

pub trait SceneHost {
    /// Node ещё существует (не уничтожен out-of-band)
    fn is_alive(&self, node: Entity) -> bool;

    fn parent(&self, node: Entity) -> Option<Entity>;

    /// Raw re-parent, local transform не трогаем
    fn attach(&mut self, node: Entity, parent: Option<Entity>);

    fn local_transform(&self, node: Entity) -> Transform;

    fn set_local_transform(&mut self, node: Entity, transform: Transform);

    fn despawn(&mut self, node: Entity);

    /// (collider enabled, detect collisions)
    fn collider_flags(&self, collider: Entity) -> (bool, bool);

    fn set_collider_flags(&mut self, collider: Entity, enabled: bool, detect_collisions: bool);

    /// World pose: композиция local transforms по цепочке parent'ов
    fn world_transform(&self, node: Entity) -> GlobalTransform {
        let local = self.local_transform(node);
        match self.parent(node) {
            Some(parent) => self.world_transform(parent).mul_transform(local),
            None => GlobalTransform::from(local),
        }
    }

    /// Re-parent с опциональным сохранением world pose
    fn set_parent(&mut self, node: Entity, parent: Option<Entity>, keep_world: bool) {
        if !keep_world {
            self.attach(node, parent);
            return;
        }

        let world = self.world_transform(node);
        self.attach(node, parent);
        let local = match parent {
            Some(parent) => world.reparented_to(&self.world_transform(parent)),
            None => world.compute_transform(),
        };
        self.set_local_transform(node, local);
    }

    /// Lowest common ancestor двух nodes (включая сами nodes)
    fn common_ancestor(&self, a: Entity, b: Entity) -> Option<Entity> {
        let mut chain_a = vec![a];
        let mut current = a;
        while let Some(parent) = self.parent(current) {
            chain_a.push(parent);
            current = parent;
        }

        let mut current = Some(b);
        while let Some(node) = current {
            if chain_a.contains(&node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }
}

impl SceneHost for World {
    fn is_alive(&self, node: Entity) -> bool {
        self.get_entity(node).is_ok()
    }

    fn parent(&self, node: Entity) -> Option<Entity> {
        self.get::<ChildOf>(node).map(|child_of| child_of.parent())
    }

    fn attach(&mut self, node: Entity, parent: Option<Entity>) {
        let Ok(mut entity) = self.get_entity_mut(node) else {
            return;
        };
        match parent {
            Some(parent) => {
                entity.insert(ChildOf(parent));
            }
            None => {
                entity.remove::<ChildOf>();
            }
        }
    }

    fn local_transform(&self, node: Entity) -> Transform {
        self.get::<Transform>(node).copied().unwrap_or_default()
    }

    fn set_local_transform(&mut self, node: Entity, transform: Transform) {
        if let Ok(mut entity) = self.get_entity_mut(node) {
            entity.insert(transform);
        }
    }

    fn despawn(&mut self, node: Entity) {
        if self.get_entity(node).is_ok() {
            World::despawn(self, node);
        }
    }

    fn collider_flags(&self, collider: Entity) -> (bool, bool) {
        let enabled = self.get::<ColliderDisabled>(collider).is_none();
        let detect_collisions = self.get::<Sensor>(collider).is_none();
        (enabled, detect_collisions)
    }

    fn set_collider_flags(&mut self, collider: Entity, enabled: bool, detect_collisions: bool) {
        let Ok(mut entity) = self.get_entity_mut(collider) else {
            return;
        };
        if enabled {
            entity.remove::<ColliderDisabled>();
        } else {
            entity.insert(ColliderDisabled);
        }
        if detect_collisions {
            entity.remove::<Sensor>();
        } else {
            entity.insert(Sensor);
        }
    }
}
