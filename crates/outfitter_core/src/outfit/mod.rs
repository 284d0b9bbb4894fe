//! Outfit: mount authority
//!
//! Outfit владеет mount points / body parts и списком смонтированных accessory.
//! Все решения "можно ли сюда монтировать" принимаются здесь:
//!
//! ```text
//! limited? → coverage conflict? → mount point есть? → blocked? → priority mounter жив? → Accessory::mount
//! ```
//!
//! Любой отказ release'ит accessory (Unmanaged), half-mounted состояния нет.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::accessory::AccessoryStatus;
use crate::components::{BodyCoverage, BodyPart, BodyPartType, ColliderStatus, MountPoint, MountPointType, Owner};
use crate::logger::{log, log_error, log_info};
use crate::mounting::MounterId;
use crate::scene::SceneHost;
use crate::wardrobe::events::Notification;
use crate::wardrobe::observers::ObserverHandle;
use crate::wardrobe::Wardrobe;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod outfit_tests;

/// Результат mount/add операций
///
/// Единственный success/failure словарь на границе API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum MountResult {
    Success,
    /// Не смонтирован сейчас, но припаркован (не ошибка)
    Stored,
    OutfitIsLimited,
    CoverageBlocked,
    NoMountPoint,
    LocationBlocked,
    RejectedByAccessory,
    /// Misuse / invariant violation (логируется как error)
    FailedOnError,
}

impl MountResult {
    pub fn is_success(self) -> bool {
        self == MountResult::Success
    }
}

/// Конфигурация outfit'а при регистрации
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutfitDefinition {
    /// None → node самого outfit'а
    pub motion_root: Option<Entity>,
    pub mount_points: Vec<MountPoint>,
    pub body_parts: Vec<BodyPart>,
    /// Постоянная coverage, не привязанная к accessory
    pub coverage_blocks: BodyCoverage,
    pub accessories_limited: bool,
}

impl OutfitDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mount_point(mut self, mount_point: MountPoint) -> Self {
        self.mount_points.push(mount_point);
        self
    }

    pub fn with_body_part(mut self, body_part: BodyPart) -> Self {
        self.body_parts.push(body_part);
        self
    }

    pub fn with_motion_root(mut self, motion_root: Entity) -> Self {
        self.motion_root = Some(motion_root);
        self
    }

    pub fn with_coverage_blocks(mut self, coverage: BodyCoverage) -> Self {
        self.coverage_blocks = coverage;
        self
    }

    pub fn limited(mut self) -> Self {
        self.accessories_limited = true;
        self
    }
}

#[derive(Debug)]
pub struct Outfit {
    node: Entity,
    motion_root: Entity,
    mount_points: Vec<MountPoint>,
    body_parts: Vec<BodyPart>,
    coverage_blocks: BodyCoverage,
    accessories_limited: bool,
    owner: Option<Entity>,
    /// Смонтированные accessory в порядке монтирования
    accessories: Vec<Entity>,
    pub(crate) observers: Vec<ObserverHandle>,
}

impl Outfit {
    /// Initialize: context всех mount points / body parts указывает на outfit
    pub(crate) fn initialize(node: Entity, definition: OutfitDefinition) -> Self {
        let mut mount_points = definition.mount_points;
        for mount_point in &mut mount_points {
            mount_point.context = Some(node);
        }
        let mut body_parts = definition.body_parts;
        for part in &mut body_parts {
            part.context = Some(node);
        }

        Self {
            node,
            motion_root: definition.motion_root.unwrap_or(node),
            mount_points,
            body_parts,
            coverage_blocks: definition.coverage_blocks,
            accessories_limited: definition.accessories_limited,
            owner: None,
            accessories: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn node(&self) -> Entity {
        self.node
    }

    pub fn motion_root(&self) -> Entity {
        self.motion_root
    }

    pub fn mount_points(&self) -> &[MountPoint] {
        &self.mount_points
    }

    pub fn mount_point(&self, location_type: MountPointType) -> Option<&MountPoint> {
        self.mount_points
            .iter()
            .find(|mp| mp.location_type == location_type)
    }

    pub fn body_parts(&self) -> &[BodyPart] {
        &self.body_parts
    }

    pub fn coverage_blocks(&self) -> BodyCoverage {
        self.coverage_blocks
    }

    pub fn set_coverage_blocks(&mut self, coverage: BodyCoverage) {
        self.coverage_blocks = coverage;
    }

    pub fn accessories_limited(&self) -> bool {
        self.accessories_limited
    }

    pub fn set_accessories_limited(&mut self, limited: bool) {
        self.accessories_limited = limited;
    }

    /// Body, у которого этот outfit текущий
    pub fn owner(&self) -> Option<Entity> {
        self.owner
    }

    pub fn accessories(&self) -> &[Entity] {
        &self.accessories
    }

    pub fn is_tracked(&self, accessory: Entity) -> bool {
        self.accessories.contains(&accessory)
    }

    pub fn observers(&self) -> &[ObserverHandle] {
        &self.observers
    }

    /// Заблокировать / разблокировать mount point. Уже смонтированные accessory не трогаем.
    pub fn set_location_blocked(&mut self, location_type: MountPointType, blocked: bool) -> bool {
        match self
            .mount_points
            .iter_mut()
            .find(|mp| mp.location_type == location_type)
        {
            Some(mount_point) => {
                mount_point.is_blocked = blocked;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_owner(&mut self, owner: Option<Entity>) {
        self.owner = owner;
    }

    fn track(&mut self, accessory: Entity) {
        if !self.accessories.contains(&accessory) {
            self.accessories.push(accessory);
        }
    }

    fn untrack(&mut self, accessory: Entity) -> bool {
        let before = self.accessories.len();
        self.accessories.retain(|a| *a != accessory);
        self.accessories.len() != before
    }
}

impl Wardrobe {
    // ========================================================================
    // Coverage
    // ========================================================================

    /// Effective coverage = coverage blocks | coverage всех attached accessory
    pub fn outfit_coverage(&self, outfit: Entity) -> BodyCoverage {
        self.outfit_coverage_excluding(outfit, None)
    }

    fn outfit_coverage_excluding(&self, outfit: Entity, excluded: Option<Entity>) -> BodyCoverage {
        let Some(target) = self.outfits.get(&outfit) else {
            return BodyCoverage::NONE;
        };

        target
            .accessories
            .iter()
            .filter(|a| Some(**a) != excluded)
            .filter_map(|a| self.accessories.get(a))
            .filter(|a| a.status().is_attached() && a.owner() == Owner::Outfit(outfit))
            .fold(target.coverage_blocks, |acc, a| acc | a.current_coverage())
    }

    // ========================================================================
    // Mount / Release
    // ========================================================================

    pub fn mount_to_outfit(
        &mut self,
        scene: &mut dyn SceneHost,
        outfit: Entity,
        accessory: Entity,
        location_type: MountPointType,
        ignore_restrictions: bool,
        priority: Option<MounterId>,
        additional: BodyCoverage,
    ) -> MountResult {
        let result = self.mount_to_outfit_inner(
            scene,
            outfit,
            accessory,
            location_type,
            ignore_restrictions,
            priority,
            additional,
        );
        self.flush();
        result
    }

    /// Mount без flush (для каскадов manager'а)
    pub(crate) fn mount_to_outfit_inner(
        &mut self,
        scene: &mut dyn SceneHost,
        outfit: Entity,
        accessory: Entity,
        location_type: MountPointType,
        ignore_restrictions: bool,
        priority: Option<MounterId>,
        additional: BodyCoverage,
    ) -> MountResult {
        let Some(target) = self.outfits.get(&outfit) else {
            log_error(&format!("Outfit {:?}: not registered", outfit));
            return MountResult::FailedOnError;
        };
        let limited = target.accessories_limited;
        let location = target.mount_point(location_type).copied();

        let (ignore_limited, candidate) = match self.accessories.get(&accessory) {
            Some(acc) if acc.status() != AccessoryStatus::Destroyed => (
                acc.ignore_limited(),
                acc.coverage_for(&self.mounters, location_type, priority) | additional,
            ),
            Some(_) => {
                log_error(&format!("Outfit {:?}: accessory {:?} is destroyed", outfit, accessory));
                return MountResult::FailedOnError;
            }
            None => {
                log_error(&format!("Outfit {:?}: accessory {:?} not registered", outfit, accessory));
                return MountResult::FailedOnError;
            }
        };
        if !scene.is_alive(accessory) {
            log_error(&format!(
                "Outfit {:?}: accessory {:?} destroyed out of band",
                outfit, accessory
            ));
            return MountResult::FailedOnError;
        }

        if !ignore_restrictions && limited && !ignore_limited {
            return self.refuse_mount(scene, outfit, accessory, MountResult::OutfitIsLimited);
        }

        if !ignore_restrictions {
            // Свой прежний вклад не считаем: idempotent remount
            let occupied = self.outfit_coverage_excluding(outfit, Some(accessory));
            if occupied.intersects(candidate) {
                log(&format!(
                    "Outfit {:?}: coverage {} of {:?} conflicts with {}",
                    outfit,
                    candidate,
                    accessory,
                    occupied & candidate
                ));
                return self.refuse_mount(scene, outfit, accessory, MountResult::CoverageBlocked);
            }
        }

        let Some(location) = location else {
            return self.refuse_mount(scene, outfit, accessory, MountResult::NoMountPoint);
        };
        if location.is_blocked {
            return self.refuse_mount(scene, outfit, accessory, MountResult::LocationBlocked);
        }

        if let Some(id) = priority {
            if !self.mounters.contains(id) {
                log_error(&format!("Outfit {:?}: priority mounter {:?} is stale", outfit, id));
                return self.refuse_mount(scene, outfit, accessory, MountResult::FailedOnError);
            }
        }

        let mounted = self
            .with_accessory(scene, accessory, |acc, ctx| {
                acc.mount(ctx, Some(&location), Owner::Outfit(outfit), priority, additional)
            })
            .unwrap_or(false);
        if !mounted {
            return self.refuse_mount(scene, outfit, accessory, MountResult::RejectedByAccessory);
        }

        if let Some(target) = self.outfits.get_mut(&outfit) {
            target.track(accessory);
        }
        self.subscribe_accessory(accessory, ObserverHandle::Outfit(outfit));
        self.outbox
            .push_back(Notification::OutfitAccessoryMounted { outfit, accessory });
        MountResult::Success
    }

    fn refuse_mount(
        &mut self,
        scene: &mut dyn SceneHost,
        outfit: Entity,
        accessory: Entity,
        result: MountResult,
    ) -> MountResult {
        log(&format!("Outfit {:?}: mount of {:?} refused ({:?})", outfit, accessory, result));
        self.with_accessory(scene, accessory, |acc, ctx| acc.release(ctx));
        result
    }

    /// false если accessory не отслеживается этим outfit'ом
    pub fn release_from_outfit(&mut self, scene: &mut dyn SceneHost, outfit: Entity, accessory: Entity) -> bool {
        let released = self.release_from_outfit_inner(scene, outfit, accessory);
        self.flush();
        released
    }

    fn release_from_outfit_inner(&mut self, scene: &mut dyn SceneHost, outfit: Entity, accessory: Entity) -> bool {
        if !self.untrack_from_outfit(outfit, accessory) {
            return false;
        }
        self.with_accessory(scene, accessory, |acc, ctx| acc.release(ctx));
        self.outbox
            .push_back(Notification::OutfitAccessoryReleased { outfit, accessory });
        true
    }

    /// Release всех смонтированных accessory, возвращает их число
    pub fn release_all(&mut self, scene: &mut dyn SceneHost, outfit: Entity) -> usize {
        let tracked = self
            .outfits
            .get(&outfit)
            .map(|o| o.accessories.clone())
            .unwrap_or_default();

        let released = tracked
            .into_iter()
            .filter(|accessory| self.release_from_outfit_inner(scene, outfit, *accessory))
            .count();
        self.flush();
        released
    }

    /// Статус коллайдеров body parts (`part_type = None` → все). Возвращает число изменённых.
    pub fn set_body_part_status(
        &mut self,
        scene: &mut dyn SceneHost,
        outfit: Entity,
        part_type: Option<BodyPartType>,
        status: ColliderStatus,
    ) -> usize {
        let Some(target) = self.outfits.get(&outfit) else {
            log_error(&format!("Outfit {:?}: not registered", outfit));
            return 0;
        };

        let mut changed = 0;
        for part in target
            .body_parts
            .iter()
            .filter(|p| part_type.is_none_or(|t| p.part_type == t))
        {
            part.set_status(scene, status);
            changed += 1;
        }
        changed
    }

    /// Уничтожить outfit
    ///
    /// 1. observers → `on_destroy`
    /// 2. body-владелец остаётся без outfit'а (persisted accessory → stored)
    /// 3. оставшиеся accessory → released
    /// 4. node despawn
    pub fn destroy_outfit(&mut self, scene: &mut dyn SceneHost, outfit: Entity) -> bool {
        let Some(target) = self.outfits.get(&outfit) else {
            log_error(&format!("Outfit {:?}: destroy of unregistered outfit", outfit));
            return false;
        };
        let owner = target.owner;

        self.outbox.push_back(Notification::OutfitDestroying { outfit });
        self.flush();

        if let Some(body) = owner {
            if self.bodies.get(&body).is_some_and(|b| b.outfit() == Some(outfit)) {
                self.set_outfit(scene, body, None);
            }
        }
        self.release_all(scene, outfit);

        self.outfits.remove(&outfit);
        scene.despawn(outfit);
        log_info(&format!("Outfit {:?}: destroyed", outfit));
        true
    }

    // ========================================================================
    // Observer handler
    // ========================================================================

    /// Outfit как observer своих accessory: если accessory больше не
    /// "attached к этому outfit'у" - считаем это внешним release'ом.
    pub(crate) fn on_outfit_accessory_event(&mut self, outfit: Entity, notification: Notification) {
        let accessory = match notification {
            Notification::AccessoryStateChanged { accessory, .. } => {
                if self.is_attached_to(outfit, accessory) {
                    return;
                }
                accessory
            }
            Notification::AccessoryDestroying { accessory, .. } => accessory,
            _ => return,
        };

        if self.untrack_from_outfit(outfit, accessory) {
            log(&format!("Outfit {:?}: accessory {:?} detached externally", outfit, accessory));
            self.outbox
                .push_back(Notification::OutfitAccessoryReleased { outfit, accessory });
        }
    }

    /// Текущее состояние accessory соответствует "смонтирован в этот outfit"
    fn is_attached_to(&self, outfit: Entity, accessory: Entity) -> bool {
        let (Some(acc), Some(target)) = (self.accessories.get(&accessory), self.outfits.get(&outfit)) else {
            return false;
        };
        acc.status().is_attached()
            && acc.owner() == Owner::Outfit(outfit)
            && acc
                .current_location()
                .is_some_and(|loc| target.mount_points.iter().any(|mp| mp.node == loc.node))
    }

    /// Untrack + unsubscribe (без release и без notification)
    fn untrack_from_outfit(&mut self, outfit: Entity, accessory: Entity) -> bool {
        let removed = self
            .outfits
            .get_mut(&outfit)
            .is_some_and(|o| o.untrack(accessory));
        if removed {
            self.unsubscribe_accessory(accessory, ObserverHandle::Outfit(outfit));
        }
        removed
    }
}
