//! Wardrobe: arena всех accessory / outfit / body
//!
//! # Architecture
//!
//! ```text
//! Wardrobe (Resource)
//!   ├─ accessories: Entity → Accessory (state machine)
//!   ├─ outfits:     Entity → Outfit    (mount authority)
//!   ├─ bodies:      Entity → Body      (AccessoryManager, current outfit)
//!   ├─ mounters:    MounterId → Box<dyn AccessoryMounter>
//!   ├─ observers:   ObserverId → ExternalObserver
//!   └─ outbox:      FIFO очередь Notification
//! ```
//!
//! Публичная операция = мутация + `flush()`. Handlers (outfit, manager)
//! сами ничего не flush'ат, только кладут в outbox, поэтому порядок FIFO
//! сохраняется даже при каскадах.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::accessory::{Accessory, AccessorySettings, AccessoryStatus, DestroyType, MountContext};
use crate::body::Body;
use crate::components::{BodyCoverage, MountPoint, Owner};
use crate::logger::{log, log_error, log_warning};
use crate::mounting::{AccessoryMounter, MounterId, MounterRegistry};
use crate::outfit::{Outfit, OutfitDefinition};
use crate::scene::SceneHost;

pub mod events;
pub mod observers;
pub mod systems;


pub use events::{Notification, Outbox, WardrobeEvent};
pub use observers::{
    AccessoryObserver, BodyObserver, ExternalObserver, ObserverHandle, ObserverId, ObserverRegistry,
    OutfitObserver,
};
pub use systems::{wardrobe_tick_system, OutfitterPlugin};

use observers::{subscribe, unsubscribe};

#[derive(Resource, Default)]
pub struct Wardrobe {
    pub(crate) accessories: HashMap<Entity, Accessory>,
    pub(crate) outfits: HashMap<Entity, Outfit>,
    pub(crate) bodies: HashMap<Entity, Body>,
    pub(crate) mounters: MounterRegistry,
    pub(crate) observers: ObserverRegistry,
    pub(crate) outbox: Outbox,
    /// Копии dispatched notifications для Bevy слоя, копятся только при `publishing`
    pub(crate) published: Vec<Notification>,
    pub(crate) publishing: bool,
}

impl Wardrobe {
    // ========================================================================
    // Registration (explicit Initialize)
    // ========================================================================

    pub fn register_accessory(&mut self, node: Entity, settings: AccessorySettings) -> bool {
        if self.accessories.contains_key(&node) {
            log_error(&format!("Wardrobe: accessory {:?} already registered", node));
            return false;
        }
        for id in &settings.mounters {
            if !self.mounters.contains(*id) {
                log_warning(&format!("Wardrobe: accessory {:?} references unknown mounter {:?}", node, id));
            }
        }
        self.accessories.insert(node, Accessory::new(node, settings));
        log(&format!("Wardrobe: accessory {:?} registered", node));
        true
    }

    pub fn register_outfit(&mut self, node: Entity, definition: OutfitDefinition) -> bool {
        if self.outfits.contains_key(&node) {
            log_error(&format!("Wardrobe: outfit {:?} already registered", node));
            return false;
        }
        self.outfits.insert(node, Outfit::initialize(node, definition));
        log(&format!("Wardrobe: outfit {:?} registered", node));
        true
    }

    /// `default_motion_root` = None → motion root самого body node
    pub fn register_body(&mut self, node: Entity, default_motion_root: Option<Entity>) -> bool {
        if self.bodies.contains_key(&node) {
            log_error(&format!("Wardrobe: body {:?} already registered", node));
            return false;
        }
        self.bodies
            .insert(node, Body::new(node, default_motion_root.unwrap_or(node)));
        log(&format!("Wardrobe: body {:?} registered", node));
        true
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn accessory(&self, node: Entity) -> Option<&Accessory> {
        self.accessories.get(&node)
    }

    pub fn accessory_status(&self, node: Entity) -> Option<AccessoryStatus> {
        self.accessories.get(&node).map(|a| a.status())
    }

    pub fn outfit(&self, node: Entity) -> Option<&Outfit> {
        self.outfits.get(&node)
    }

    /// Pure mutators outfit'а (blocked flags, coverage blocks, limited flag)
    pub fn outfit_mut(&mut self, node: Entity) -> Option<&mut Outfit> {
        self.outfits.get_mut(&node)
    }

    pub fn body(&self, node: Entity) -> Option<&Body> {
        self.bodies.get(&node)
    }

    /// Accessory entities в детерминированном порядке
    pub fn accessory_ids(&self) -> Vec<Entity> {
        let mut ids: Vec<Entity> = self.accessories.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn outfit_ids(&self) -> Vec<Entity> {
        let mut ids: Vec<Entity> = self.outfits.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn body_ids(&self) -> Vec<Entity> {
        let mut ids: Vec<Entity> = self.bodies.keys().copied().collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Mounters
    // ========================================================================

    pub fn add_mounter(&mut self, mounter: Box<dyn AccessoryMounter>) -> MounterId {
        let name = mounter.name().to_string();
        let id = self.mounters.add(mounter);
        log(&format!("Wardrobe: mounter '{}' added as {:?}", name, id));
        id
    }

    /// Снять mounter. Ссылки на `id` становятся stale: in-flight mount'ы
    /// этого mounter'а будут released на следующем tick.
    pub fn remove_mounter(&mut self, id: MounterId) -> bool {
        match self.mounters.remove(id) {
            Some(mounter) => {
                log(&format!("Wardrobe: mounter '{}' ({:?}) removed", mounter.name(), id));
                true
            }
            None => false,
        }
    }

    pub fn mounters(&self) -> &MounterRegistry {
        &self.mounters
    }

    // ========================================================================
    // External observers
    // ========================================================================

    pub fn add_accessory_observer(
        &mut self,
        accessory: Entity,
        observer: Box<dyn AccessoryObserver>,
    ) -> Option<ObserverId> {
        if !self.accessories.contains_key(&accessory) {
            log_error(&format!("Wardrobe: observer for unknown accessory {:?}", accessory));
            return None;
        }
        let id = self.observers.insert(ExternalObserver::Accessory(observer));
        let accessory = self.accessories.get_mut(&accessory)?;
        subscribe(&mut accessory.observers, ObserverHandle::External(id));
        Some(id)
    }

    pub fn add_outfit_observer(&mut self, outfit: Entity, observer: Box<dyn OutfitObserver>) -> Option<ObserverId> {
        if !self.outfits.contains_key(&outfit) {
            log_error(&format!("Wardrobe: observer for unknown outfit {:?}", outfit));
            return None;
        }
        let id = self.observers.insert(ExternalObserver::Outfit(observer));
        let outfit = self.outfits.get_mut(&outfit)?;
        subscribe(&mut outfit.observers, ObserverHandle::External(id));
        Some(id)
    }

    pub fn add_body_observer(&mut self, body: Entity, observer: Box<dyn BodyObserver>) -> Option<ObserverId> {
        if !self.bodies.contains_key(&body) {
            log_error(&format!("Wardrobe: observer for unknown body {:?}", body));
            return None;
        }
        let id = self.observers.insert(ExternalObserver::Body(observer));
        let body = self.bodies.get_mut(&body)?;
        subscribe(&mut body.observers, ObserverHandle::External(id));
        Some(id)
    }

    /// Unsubscribe. Handles в списках подписок чистит `purge_stale`.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    // ========================================================================
    // Raw accessory API
    // ========================================================================

    /// Прогнать `f` над accessory с контекстом (mounters + scene + outbox)
    pub(crate) fn with_accessory<R>(
        &mut self,
        scene: &mut dyn SceneHost,
        node: Entity,
        f: impl FnOnce(&mut Accessory, &mut MountContext) -> R,
    ) -> Option<R> {
        let accessory = self.accessories.get_mut(&node)?;
        let mut ctx = MountContext {
            mounters: &mut self.mounters,
            scene,
            outbox: &mut self.outbox,
        };
        Some(f(accessory, &mut ctx))
    }

    /// Mount вне outfit authority (без restriction checks)
    pub fn mount_accessory(
        &mut self,
        scene: &mut dyn SceneHost,
        accessory: Entity,
        location: &MountPoint,
        owner: Owner,
        priority: Option<MounterId>,
        additional: BodyCoverage,
    ) -> bool {
        let mounted = self
            .with_accessory(scene, accessory, |acc, ctx| {
                acc.mount(ctx, Some(location), owner, priority, additional)
            })
            .unwrap_or_else(|| {
                log_error(&format!("Wardrobe: mount of unknown accessory {:?}", accessory));
                false
            });
        self.flush();
        mounted
    }

    pub fn store_accessory(
        &mut self,
        scene: &mut dyn SceneHost,
        accessory: Entity,
        owner: Owner,
        container: Entity,
    ) -> bool {
        let stored = self
            .with_accessory(scene, accessory, |acc, ctx| acc.store(ctx, owner, container))
            .unwrap_or(false);
        self.flush();
        stored
    }

    pub fn release_accessory(&mut self, scene: &mut dyn SceneHost, accessory: Entity) -> bool {
        let released = self
            .with_accessory(scene, accessory, |acc, ctx| acc.release(ctx))
            .unwrap_or(false);
        self.flush();
        released
    }

    /// Завершить in-flight mount немедленно
    pub fn complete_mount(&mut self, scene: &mut dyn SceneHost, accessory: Entity) -> bool {
        let completed = self
            .with_accessory(scene, accessory, |acc, ctx| {
                acc.complete_mount(ctx);
                acc.status() == AccessoryStatus::Mounted
            })
            .unwrap_or(false);
        self.flush();
        completed
    }

    pub fn set_accessory_coverage(&mut self, accessory: Entity, coverage: BodyCoverage) -> bool {
        match self.accessories.get_mut(&accessory) {
            Some(acc) => acc.set_coverage(&self.mounters, coverage),
            None => {
                log_error(&format!("Wardrobe: coverage change on unknown accessory {:?}", accessory));
                false
            }
        }
    }

    /// Destroy: observers получают `on_destroy` до teardown.
    ///
    /// `Destroy` despawn'ит node, `Bake` оставляет node как статическую геометрию.
    /// В обоих случаях остаётся tombstone со статусом `Destroyed` до `purge_stale`.
    pub fn destroy_accessory(&mut self, scene: &mut dyn SceneHost, accessory: Entity, destroy_type: DestroyType) -> bool {
        let started = self
            .with_accessory(scene, accessory, |acc, ctx| acc.begin_destroy(ctx, destroy_type))
            .unwrap_or(false);
        if !started {
            log_error(&format!("Wardrobe: accessory {:?} is unknown or already destroyed", accessory));
            return false;
        }
        self.flush();

        if let Some(acc) = self.accessories.get_mut(&accessory) {
            acc.finish_destroy();
        }
        match destroy_type {
            DestroyType::Destroy => scene.despawn(accessory),
            DestroyType::Bake => {
                if scene.is_alive(accessory) {
                    scene.set_parent(accessory, None, true);
                }
            }
        }
        log(&format!("Wardrobe: accessory {:?} destroyed ({:?})", accessory, destroy_type));
        true
    }

    // ========================================================================
    // Frame driving
    // ========================================================================

    /// Продвинуть все Mounting accessory на `delta_secs` (порядок по Entity)
    pub fn tick(&mut self, scene: &mut dyn SceneHost, delta_secs: f32) {
        let mut mounting: Vec<Entity> = self
            .accessories
            .values()
            .filter(|a| a.status() == AccessoryStatus::Mounting)
            .map(|a| a.node())
            .collect();
        mounting.sort();

        for node in mounting {
            self.with_accessory(scene, node, |acc, ctx| acc.advance(ctx, delta_secs, false));
        }
        self.flush();
    }

    /// Deferred purge pass
    ///
    /// - accessory, чей node уничтожен out-of-band → error log, Destroyed, purge
    /// - outfit / body с мёртвым node → teardown
    /// - tombstones и stale observer handles удаляются
    ///
    /// Возвращает число purged объектов.
    pub fn purge_stale(&mut self, scene: &mut dyn SceneHost) -> usize {
        let mut purged = 0;

        // Tombstones после destroy_accessory
        self.accessories
            .retain(|_, acc| acc.status() != AccessoryStatus::Destroyed);

        let dead_accessories: Vec<Entity> = self
            .accessory_ids()
            .into_iter()
            .filter(|node| !scene.is_alive(*node))
            .collect();
        for node in dead_accessories {
            log_error(&format!("Wardrobe: accessory {:?} destroyed out of band, purging", node));
            self.with_accessory(scene, node, |acc, ctx| acc.begin_destroy(ctx, DestroyType::Destroy));
            self.flush();
            self.accessories.remove(&node);
            purged += 1;
        }

        let dead_outfits: Vec<Entity> = self
            .outfit_ids()
            .into_iter()
            .filter(|node| !scene.is_alive(*node))
            .collect();
        for node in dead_outfits {
            log_error(&format!("Wardrobe: outfit {:?} destroyed out of band, purging", node));
            self.destroy_outfit(scene, node);
            purged += 1;
        }

        let dead_bodies: Vec<Entity> = self
            .body_ids()
            .into_iter()
            .filter(|node| !scene.is_alive(*node))
            .collect();
        for node in dead_bodies {
            log_error(&format!("Wardrobe: body {:?} destroyed out of band, purging", node));
            self.teardown_body(scene, node);
            purged += 1;
        }

        self.purge_stale_handles();
        purged
    }

    fn purge_stale_handles(&mut self) {
        let outfits = &self.outfits;
        let bodies = &self.bodies;
        let observers = &self.observers;
        let live = |handle: &ObserverHandle| match handle {
            ObserverHandle::Outfit(outfit) => outfits.contains_key(outfit),
            ObserverHandle::Manager(body) => bodies.contains_key(body),
            ObserverHandle::External(id) => observers.contains(*id),
        };
        for accessory in self.accessories.values_mut() {
            accessory.observers.retain(|h| live(h));
        }

        // У outfit / body подписчики только external
        let observers = &self.observers;
        for outfit in self.outfits.values_mut() {
            outfit.observers.retain(|h| !matches!(h, ObserverHandle::External(id) if !observers.contains(*id)));
        }
        for body in self.bodies.values_mut() {
            body.observers.retain(|h| !matches!(h, ObserverHandle::External(id) if !observers.contains(*id)));
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Раздать накопленные notifications подписчикам (FIFO).
    /// Handlers могут докладывать новые, они обрабатываются в этом же цикле.
    pub fn flush(&mut self) {
        while let Some(notification) = self.outbox.pop_front() {
            self.route(notification);
            if self.publishing {
                self.published.push(notification);
            }
        }
    }

    /// Включить сбор notifications для `drain_published`.
    /// Включает `OutfitterPlugin`; host без plugin'а ничего не копит.
    pub fn set_publishing(&mut self, enabled: bool) {
        self.publishing = enabled;
        if !enabled {
            self.published.clear();
        }
    }

    pub fn is_publishing(&self) -> bool {
        self.publishing
    }

    /// Забрать notifications, прошедшие dispatch (для Bevy event слоя)
    pub fn drain_published(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.published)
    }

    fn route(&mut self, notification: Notification) {
        let handles = match notification {
            Notification::AccessoryStateChanged { accessory, .. }
            | Notification::AccessoryDestroying { accessory, .. } => self
                .accessories
                .get(&accessory)
                .map(|a| a.observers.clone()),
            Notification::OutfitAccessoryMounted { outfit, .. }
            | Notification::OutfitAccessoryReleased { outfit, .. }
            | Notification::OutfitDestroying { outfit } => {
                self.outfits.get(&outfit).map(|o| o.observers.clone())
            }
            Notification::BodyOutfitChanging { body, .. } | Notification::BodyOutfitChanged { body, .. } => {
                self.bodies.get(&body).map(|b| b.observers.clone())
            }
        };

        for handle in handles.unwrap_or_default() {
            match handle {
                ObserverHandle::Outfit(outfit) => self.on_outfit_accessory_event(outfit, notification),
                ObserverHandle::Manager(body) => self.on_manager_event(body, notification),
                ObserverHandle::External(id) => self.notify_external(id, notification),
            }
        }
    }

    fn notify_external(&mut self, id: ObserverId, notification: Notification) {
        // Отсутствующий id (снят, но ещё не purged) - пропускаем
        let Some(observer) = self.observers.get_mut(id) else {
            return;
        };

        match (observer, notification) {
            (
                ExternalObserver::Accessory(o),
                Notification::AccessoryStateChanged {
                    accessory,
                    status,
                    owner,
                    location,
                },
            ) => o.on_state_change(accessory, status, owner, location),
            (
                ExternalObserver::Accessory(o),
                Notification::AccessoryDestroying {
                    accessory,
                    destroy_type,
                },
            ) => o.on_destroy(accessory, destroy_type),
            (ExternalObserver::Outfit(o), Notification::OutfitAccessoryMounted { outfit, accessory }) => {
                o.on_accessory_mounted(outfit, accessory)
            }
            (ExternalObserver::Outfit(o), Notification::OutfitAccessoryReleased { outfit, accessory }) => {
                o.on_accessory_released(outfit, accessory)
            }
            (ExternalObserver::Outfit(o), Notification::OutfitDestroying { outfit }) => o.on_destroy(outfit),
            (ExternalObserver::Body(o), Notification::BodyOutfitChanging { body, previous, next }) => {
                o.on_pre_outfit_change(body, previous, next)
            }
            (ExternalObserver::Body(o), Notification::BodyOutfitChanged { body, previous, current }) => {
                o.on_outfit_change(body, previous, current)
            }
            _ => {}
        }
    }

    pub(crate) fn subscribe_accessory(&mut self, accessory: Entity, handle: ObserverHandle) {
        if let Some(acc) = self.accessories.get_mut(&accessory) {
            subscribe(&mut acc.observers, handle);
        }
    }

    pub(crate) fn unsubscribe_accessory(&mut self, accessory: Entity, handle: ObserverHandle) {
        if let Some(acc) = self.accessories.get_mut(&accessory) {
            unsubscribe(&mut acc.observers, handle);
        }
    }
}

/// Доступ к `Wardrobe` + `World` как `SceneHost` одновременно
pub trait WardrobeWorldExt {
    fn wardrobe_scope<R>(&mut self, f: impl FnOnce(&mut Wardrobe, &mut World) -> R) -> R;
}

impl WardrobeWorldExt for World {
    fn wardrobe_scope<R>(&mut self, f: impl FnOnce(&mut Wardrobe, &mut World) -> R) -> R {
        if !self.contains_resource::<Wardrobe>() {
            self.init_resource::<Wardrobe>();
        }
        self.resource_scope(|world, mut wardrobe: Mut<Wardrobe>| f(&mut wardrobe, world))
    }
}
