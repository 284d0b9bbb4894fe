//! Body: персистентный владелец swappable outfit'а
//!
//! # Outfit swap
//!
//! ```text
//! set_outfit(next)
//!   ├─ BodyOutfitChanging (pre)
//!   ├─ owner outfit'ов переключается
//!   ├─ persisted accessory (в порядке вставки):
//!   │     mount_to_outfit(next) ── fail ──▶ store под body node
//!   └─ BodyOutfitChanged (post)
//! ```
//!
//! Mount/store, которые делает сам manager, идут под ignore token:
//! manager не реагирует на собственные события, только на внешние.

use bevy::prelude::*;

use crate::accessory::AccessoryStatus;
use crate::components::Owner;
use crate::logger::{log, log_error, log_info, log_warning};
use crate::outfit::MountResult;
use crate::scene::SceneHost;
use crate::wardrobe::events::Notification;
use crate::wardrobe::observers::ObserverHandle;
use crate::wardrobe::Wardrobe;

pub mod manager;


pub use manager::{AccessoryManager, AccessoryMountInfo};

#[derive(Debug)]
pub struct Body {
    node: Entity,
    default_motion_root: Entity,
    outfit: Option<Entity>,
    pub(crate) accessories: AccessoryManager,
    pub(crate) observers: Vec<ObserverHandle>,
}

impl Body {
    pub(crate) fn new(node: Entity, default_motion_root: Entity) -> Self {
        Self {
            node,
            default_motion_root,
            outfit: None,
            accessories: AccessoryManager::default(),
            observers: Vec::new(),
        }
    }

    pub fn node(&self) -> Entity {
        self.node
    }

    pub fn default_motion_root(&self) -> Entity {
        self.default_motion_root
    }

    pub fn outfit(&self) -> Option<Entity> {
        self.outfit
    }

    pub fn accessories(&self) -> &AccessoryManager {
        &self.accessories
    }

    pub fn observers(&self) -> &[ObserverHandle] {
        &self.observers
    }
}

impl Wardrobe {
    // ========================================================================
    // Outfit
    // ========================================================================

    /// Сменить текущий outfit (None → без outfit'а, accessory уходят в storage)
    pub fn set_outfit(&mut self, scene: &mut dyn SceneHost, body: Entity, outfit: Option<Entity>) -> bool {
        let Some(previous) = self.bodies.get(&body).map(|b| b.outfit) else {
            log_error(&format!("Body {:?}: not registered", body));
            return false;
        };
        if let Some(next) = outfit {
            match self.outfits.get(&next).map(|o| o.owner()) {
                None => {
                    log_error(&format!("Body {:?}: outfit {:?} not registered", body, next));
                    return false;
                }
                Some(Some(other)) if other != body => {
                    log_error(&format!("Body {:?}: outfit {:?} already worn by {:?}", body, next, other));
                    return false;
                }
                Some(_) => {}
            }
        }
        if previous == outfit {
            return true;
        }

        self.outbox.push_back(Notification::BodyOutfitChanging {
            body,
            previous,
            next: outfit,
        });
        self.flush();

        if let Some(prev) = previous.and_then(|p| self.outfits.get_mut(&p)) {
            prev.set_owner(None);
        }
        if let Some(next) = outfit.and_then(|n| self.outfits.get_mut(&n)) {
            next.set_owner(Some(body));
        }
        if let Some(b) = self.bodies.get_mut(&body) {
            b.outfit = outfit;
        }
        log_info(&format!("Body {:?}: outfit {:?} → {:?}", body, previous, outfit));

        self.apply_persisted(scene, body);

        self.outbox.push_back(Notification::BodyOutfitChanged {
            body,
            previous,
            current: outfit,
        });
        self.flush();
        true
    }

    pub fn release_outfit(&mut self, scene: &mut dyn SceneHost, body: Entity) -> bool {
        self.set_outfit(scene, body, None)
    }

    /// Motion root текущего outfit'а, без outfit'а - default root body
    pub fn body_motion_root(&self, body: Entity) -> Option<Entity> {
        let b = self.bodies.get(&body)?;
        let from_outfit = b
            .outfit
            .and_then(|o| self.outfits.get(&o))
            .map(|o| o.motion_root());
        Some(from_outfit.unwrap_or(b.default_motion_root))
    }

    // ========================================================================
    // AccessoryManager operations
    // ========================================================================

    /// Добавить persisted accessory
    ///
    /// Возвращает только `Success`, `Stored` или `FailedOnError`:
    /// обычный отказ outfit'а - это `Stored` (или `FailedOnError` при `must_mount`).
    pub fn add_accessory(
        &mut self,
        scene: &mut dyn SceneHost,
        body: Entity,
        info: AccessoryMountInfo,
        must_mount: bool,
    ) -> MountResult {
        let Some(outfit) = self.bodies.get(&body).map(|b| b.outfit) else {
            log_error(&format!("Body {:?}: not registered", body));
            return MountResult::FailedOnError;
        };
        if !self.validate_info(&*scene, body, &info) {
            return MountResult::FailedOnError;
        }
        if self.bodies.get(&body).is_some_and(|b| b.accessories.contains(info.accessory)) {
            log_error(&format!("Body {:?}: accessory {:?} already added", body, info.accessory));
            return MountResult::FailedOnError;
        }

        self.set_ignore(body, Some(info.accessory));
        let result = match outfit {
            None if must_mount => {
                log(&format!("Body {:?}: no outfit, {:?} must mount", body, info.accessory));
                MountResult::FailedOnError
            }
            None => self.store_in_manager(scene, body, info.accessory),
            Some(outfit) => match self.mount_to_outfit_inner(
                scene,
                outfit,
                info.accessory,
                info.location_type,
                info.ignore_restrictions,
                info.mounter,
                info.additional_coverage,
            ) {
                MountResult::Success => MountResult::Success,
                MountResult::FailedOnError => MountResult::FailedOnError,
                refused if must_mount => {
                    log(&format!("Body {:?}: {:?} must mount, got {:?}", body, info.accessory, refused));
                    MountResult::FailedOnError
                }
                _ => self.store_in_manager(scene, body, info.accessory),
            },
        };

        if matches!(result, MountResult::Success | MountResult::Stored) {
            if let Some(b) = self.bodies.get_mut(&body) {
                b.accessories.push(info);
            }
            self.subscribe_accessory(info.accessory, ObserverHandle::Manager(body));
        }
        self.flush();
        self.set_ignore(body, None);
        result
    }

    /// Обновить настройки persisted accessory. При наличии outfit'а remount всегда.
    pub fn modify_accessory(&mut self, scene: &mut dyn SceneHost, body: Entity, info: AccessoryMountInfo) -> MountResult {
        let tracked = self
            .bodies
            .get(&body)
            .is_some_and(|b| b.accessories.contains(info.accessory));
        if !tracked {
            log_error(&format!("Body {:?}: modify of unknown accessory {:?}", body, info.accessory));
            return MountResult::FailedOnError;
        }
        if !self.validate_info(&*scene, body, &info) {
            return MountResult::FailedOnError;
        }

        if let Some(b) = self.bodies.get_mut(&body) {
            b.accessories.replace(info);
        }
        // Без outfit'а mount_or_store перепарковывает под body: Stored подтверждён фактическим store
        self.mount_or_store(scene, body, &info)
    }

    /// false если accessory не отслеживается
    pub fn remove_accessory(&mut self, scene: &mut dyn SceneHost, body: Entity, accessory: Entity) -> bool {
        let removed = self
            .bodies
            .get_mut(&body)
            .and_then(|b| b.accessories.remove(accessory));
        if removed.is_none() {
            return false;
        }
        self.unsubscribe_accessory(accessory, ObserverHandle::Manager(body));
        self.with_accessory(scene, accessory, |acc, ctx| acc.release(ctx));
        self.flush();
        log(&format!("Body {:?}: accessory {:?} removed", body, accessory));
        true
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Misuse checks: accessory зарегистрирован и жив (в wardrobe и в scene), priority mounter не stale
    fn validate_info(&self, scene: &dyn SceneHost, body: Entity, info: &AccessoryMountInfo) -> bool {
        match self.accessories.get(&info.accessory) {
            None => {
                log_error(&format!("Body {:?}: accessory {:?} not registered", body, info.accessory));
                return false;
            }
            Some(acc) if acc.status() == AccessoryStatus::Destroyed => {
                log_error(&format!("Body {:?}: accessory {:?} is destroyed", body, info.accessory));
                return false;
            }
            Some(_) => {}
        }
        if !scene.is_alive(info.accessory) {
            log_error(&format!(
                "Body {:?}: accessory {:?} destroyed out of band",
                body, info.accessory
            ));
            return false;
        }
        if let Some(id) = info.mounter {
            if !self.mounters.contains(id) {
                log_error(&format!("Body {:?}: priority mounter {:?} is stale", body, id));
                return false;
            }
        }
        true
    }

    fn set_ignore(&mut self, body: Entity, accessory: Option<Entity>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.accessories.ignore = accessory;
        }
    }

    /// Переприменить все persisted accessory к текущему outfit'у (порядок вставки)
    fn apply_persisted(&mut self, scene: &mut dyn SceneHost, body: Entity) {
        self.purge_destroyed_entries(scene, body);

        let items = self
            .bodies
            .get(&body)
            .map(|b| b.accessories.items())
            .unwrap_or_default();
        for info in &items {
            self.mount_or_store(scene, body, info);
        }
    }

    /// Mount в текущий outfit, при отказе - store. Под ignore token, с flush.
    fn mount_or_store(&mut self, scene: &mut dyn SceneHost, body: Entity, info: &AccessoryMountInfo) -> MountResult {
        let outfit = self.bodies.get(&body).and_then(|b| b.outfit);

        self.set_ignore(body, Some(info.accessory));
        let result = match outfit {
            Some(outfit) => match self.mount_to_outfit_inner(
                scene,
                outfit,
                info.accessory,
                info.location_type,
                info.ignore_restrictions,
                info.mounter,
                info.additional_coverage,
            ) {
                MountResult::Success => MountResult::Success,
                MountResult::FailedOnError => {
                    self.store_in_manager(scene, body, info.accessory);
                    MountResult::FailedOnError
                }
                _ => self.store_in_manager(scene, body, info.accessory),
            },
            None => self.store_in_manager(scene, body, info.accessory),
        };
        self.flush();
        self.set_ignore(body, None);
        result
    }

    /// Припарковать под body node (zero local offset)
    fn store_in_manager(&mut self, scene: &mut dyn SceneHost, body: Entity, accessory: Entity) -> MountResult {
        let stored = self
            .with_accessory(scene, accessory, |acc, ctx| acc.store(ctx, Owner::Manager(body), body))
            .unwrap_or(false);
        if stored {
            MountResult::Stored
        } else {
            log_error(&format!("Body {:?}: failed to store {:?}", body, accessory));
            MountResult::FailedOnError
        }
    }

    /// Entries, чьи accessory уничтожены out-of-band → error log + purge
    fn purge_destroyed_entries(&mut self, scene: &mut dyn SceneHost, body: Entity) {
        let items = self
            .bodies
            .get(&body)
            .map(|b| b.accessories.items())
            .unwrap_or_default();

        for info in items {
            let alive = scene.is_alive(info.accessory)
                && self
                    .accessories
                    .get(&info.accessory)
                    .is_some_and(|a| a.status() != AccessoryStatus::Destroyed);
            if alive {
                continue;
            }
            log_error(&format!("Body {:?}: persisted accessory {:?} was destroyed, purging", body, info.accessory));
            if let Some(b) = self.bodies.get_mut(&body) {
                b.accessories.remove(info.accessory);
            }
            self.unsubscribe_accessory(info.accessory, ObserverHandle::Manager(body));
        }
    }

    /// Body node уничтожен: отпустить всё, что body держал
    pub(crate) fn teardown_body(&mut self, scene: &mut dyn SceneHost, body: Entity) {
        let Some(b) = self.bodies.remove(&body) else {
            return;
        };
        if let Some(outfit) = b.outfit.and_then(|o| self.outfits.get_mut(&o)) {
            outfit.set_owner(None);
        }
        for info in b.accessories.iter() {
            self.unsubscribe_accessory(info.accessory, ObserverHandle::Manager(body));
            let owned = self
                .accessories
                .get(&info.accessory)
                .is_some_and(|a| a.owner() == Owner::Manager(body));
            if owned {
                self.with_accessory(scene, info.accessory, |acc, ctx| acc.release(ctx));
            }
        }
        self.flush();
    }

    // ========================================================================
    // Observer handler
    // ========================================================================

    /// Manager как observer persisted accessory
    ///
    /// Свои события (ignore token) пропускаем. Внешняя смена состояния
    /// (другой owner забрал, release извне) → untrack.
    pub(crate) fn on_manager_event(&mut self, body: Entity, notification: Notification) {
        let Some(b) = self.bodies.get(&body) else {
            return;
        };

        let accessory = match notification {
            Notification::AccessoryStateChanged { accessory, .. } => {
                if b.accessories.ignore == Some(accessory) || !b.accessories.contains(accessory) {
                    return;
                }
                if self.is_consistent_with_manager(body, accessory) {
                    return;
                }
                log_warning(&format!(
                    "Body {:?}: accessory {:?} changed externally, untracking",
                    body, accessory
                ));
                accessory
            }
            Notification::AccessoryDestroying { accessory, .. } => {
                log(&format!("Body {:?}: persisted accessory {:?} destroying", body, accessory));
                accessory
            }
            _ => return,
        };

        if let Some(b) = self.bodies.get_mut(&body) {
            b.accessories.remove(accessory);
        }
        self.unsubscribe_accessory(accessory, ObserverHandle::Manager(body));
    }

    /// Stored у этого manager'а или attached к текущему outfit'у body
    fn is_consistent_with_manager(&self, body: Entity, accessory: Entity) -> bool {
        let (Some(b), Some(acc)) = (self.bodies.get(&body), self.accessories.get(&accessory)) else {
            return false;
        };
        match (acc.status(), acc.owner()) {
            (AccessoryStatus::Stored, Owner::Manager(owner)) => owner == body,
            (status, Owner::Outfit(outfit)) if status.is_attached() => b.outfit == Some(outfit),
            _ => false,
        }
    }
}
