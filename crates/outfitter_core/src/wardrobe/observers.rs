//! Observer registration
//!
//! Подписки хранятся как `ObserverHandle` (id, не указатели).
//! Снятие external observer'а (`ObserverRegistry::remove`) оставляет stale handles
//! в списках подписок - их убирает deferred purge pass (`Wardrobe::purge_stale`),
//! а dispatch просто пропускает отсутствующие id.

use bevy::prelude::*;

use crate::accessory::{AccessoryStatus, DestroyType};
use crate::components::{MountPointType, Owner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u32);

/// Кто подписан на accessory / outfit / body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverHandle {
    /// Outfit отслеживает свои смонтированные accessory
    Outfit(Entity),
    /// AccessoryManager body отслеживает persisted accessory
    Manager(Entity),
    /// Application observer
    External(ObserverId),
}

pub trait AccessoryObserver: Send + Sync {
    fn on_state_change(
        &mut self,
        _accessory: Entity,
        _status: AccessoryStatus,
        _owner: Owner,
        _location: Option<MountPointType>,
    ) {
    }

    fn on_destroy(&mut self, _accessory: Entity, _destroy_type: DestroyType) {}
}

pub trait OutfitObserver: Send + Sync {
    fn on_accessory_mounted(&mut self, _outfit: Entity, _accessory: Entity) {}

    fn on_accessory_released(&mut self, _outfit: Entity, _accessory: Entity) {}

    fn on_destroy(&mut self, _outfit: Entity) {}
}

pub trait BodyObserver: Send + Sync {
    fn on_pre_outfit_change(&mut self, _body: Entity, _previous: Option<Entity>, _next: Option<Entity>) {}

    fn on_outfit_change(&mut self, _body: Entity, _previous: Option<Entity>, _current: Option<Entity>) {}
}

pub enum ExternalObserver {
    Accessory(Box<dyn AccessoryObserver>),
    Outfit(Box<dyn OutfitObserver>),
    Body(Box<dyn BodyObserver>),
}

#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u32,
    slots: Vec<(ObserverId, ExternalObserver)>,
}

impl ObserverRegistry {
    pub fn insert(&mut self, observer: ExternalObserver) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.slots.push((id, observer));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot_id, _)| *slot_id != id);
        self.slots.len() != before
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.slots.iter().any(|(slot_id, _)| *slot_id == id)
    }

    pub fn get_mut(&mut self, id: ObserverId) -> Option<&mut ExternalObserver> {
        self.slots
            .iter_mut()
            .find(|(slot_id, _)| *slot_id == id)
            .map(|(_, observer)| observer)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Добавить handle в список подписок (без дублей)
pub(crate) fn subscribe(list: &mut Vec<ObserverHandle>, handle: ObserverHandle) {
    if !list.contains(&handle) {
        list.push(handle);
    }
}

pub(crate) fn unsubscribe(list: &mut Vec<ObserverHandle>, handle: ObserverHandle) {
    list.retain(|h| *h != handle);
}
