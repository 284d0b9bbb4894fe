//! Accessory: mountable unit и его state machine
//!
//! # Lifecycle
//!
//! ```text
//! Unmanaged ──mount──▶ Mounting ──update_mount=false──▶ Mounted
//!     ▲                   │  ▲                             │
//!     │                   │  └──────── remount ────────────┤
//!     └──── release ──────┴──────────── store ──▶ Stored ◀─┘
//!
//! любое (кроме Destroyed) ──destroy──▶ Destroyed (terminal)
//! ```
//!
//! Accessory не знает про Outfit/Body: owner - typed handle (`Owner`),
//! transform операции идут через `SceneHost`, уведомления - в outbox.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{BodyCoverage, MountPoint, MountPointType, Owner};
use crate::logger::{log, log_error, log_warning};
use crate::mounting::{MounterId, MounterRegistry};
use crate::scene::SceneHost;
use crate::wardrobe::events::{Notification, Outbox};
use crate::wardrobe::observers::ObserverHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum AccessoryStatus {
    /// Нет owner'а, нет location
    Unmanaged,
    /// Mounter strategy в процессе
    Mounting,
    /// Смонтирован, даёт coverage
    Mounted,
    /// Припаркован у owner'а, coverage = 0
    Stored,
    /// Terminal
    Destroyed,
}

impl AccessoryStatus {
    /// Mounting или Mounted (занимает mount point и coverage)
    pub fn is_attached(self) -> bool {
        matches!(self, AccessoryStatus::Mounting | AccessoryStatus::Mounted)
    }
}

/// Как уничтожается accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum DestroyType {
    /// Обычное уничтожение (node despawn)
    Destroy,
    /// Конвертация в статическую геометрию: node остаётся, management снимается
    Bake,
}

/// Статические параметры accessory (задаются при регистрации)
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorySettings {
    pub default_location: MountPointType,
    /// Intrinsic coverage (OR-ится с coverage mounter'а)
    pub coverage: BodyCoverage,
    /// Игнорирует "limited accessories" ограничение outfit'а
    pub ignore_limited: bool,
    /// Coverage можно менять в runtime (`Wardrobe::set_accessory_coverage`)
    pub is_coverage_dynamic: bool,
    /// Зарегистрированные mounter'ы в порядке приоритета
    pub mounters: Vec<MounterId>,
}

impl AccessorySettings {
    pub fn new(default_location: MountPointType, coverage: BodyCoverage, mounters: Vec<MounterId>) -> Self {
        Self {
            default_location,
            coverage,
            ignore_limited: false,
            is_coverage_dynamic: false,
            mounters,
        }
    }

    pub fn ignoring_limited(mut self) -> Self {
        self.ignore_limited = true;
        self
    }

    pub fn with_dynamic_coverage(mut self) -> Self {
        self.is_coverage_dynamic = true;
        self
    }
}

/// Всё, что нужно accessory для transition'ов
pub struct MountContext<'a> {
    pub mounters: &'a mut MounterRegistry,
    pub scene: &'a mut dyn SceneHost,
    pub outbox: &'a mut Outbox,
}

/// Attach record: какой mounter ведёт/вёл mount и какой additional coverage запрошен.
/// Живёт пока accessory Mounting/Mounted.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MountJob {
    mounter: MounterId,
    additional: BodyCoverage,
}

#[derive(Debug)]
pub struct Accessory {
    node: Entity,
    settings: AccessorySettings,
    status: AccessoryStatus,
    owner: Owner,
    location: Option<MountPoint>,
    current_coverage: BodyCoverage,
    job: Option<MountJob>,
    pub(crate) observers: Vec<ObserverHandle>,
}

impl Accessory {
    pub fn new(node: Entity, settings: AccessorySettings) -> Self {
        Self {
            node,
            settings,
            status: AccessoryStatus::Unmanaged,
            owner: Owner::None,
            location: None,
            current_coverage: BodyCoverage::NONE,
            job: None,
            observers: Vec::new(),
        }
    }

    pub fn node(&self) -> Entity {
        self.node
    }

    pub fn settings(&self) -> &AccessorySettings {
        &self.settings
    }

    pub fn status(&self) -> AccessoryStatus {
        self.status
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn current_location(&self) -> Option<&MountPoint> {
        self.location.as_ref()
    }

    pub fn current_coverage(&self) -> BodyCoverage {
        self.current_coverage
    }

    pub fn default_location(&self) -> MountPointType {
        self.settings.default_location
    }

    pub fn ignore_limited(&self) -> bool {
        self.settings.ignore_limited
    }

    pub fn is_coverage_dynamic(&self) -> bool {
        self.settings.is_coverage_dynamic
    }

    pub fn observers(&self) -> &[ObserverHandle] {
        &self.observers
    }

    /// Mounter, который будет использован для `location_type`:
    /// priority (если валиден и `can_mount`), иначе первый совместимый из settings
    pub fn select_mounter(
        &self,
        mounters: &MounterRegistry,
        location_type: MountPointType,
        priority: Option<MounterId>,
    ) -> Option<MounterId> {
        if let Some(id) = priority {
            if let Some(mounter) = mounters.get(id) {
                if mounter.can_mount(self, location_type) {
                    return Some(id);
                }
            }
        }

        self.settings.mounters.iter().copied().find(|id| {
            mounters
                .get(*id)
                .is_some_and(|mounter| mounter.can_mount(self, location_type))
        })
    }

    /// Coverage, которую accessory получит в `location_type` (без additional)
    pub fn coverage_for(
        &self,
        mounters: &MounterRegistry,
        location_type: MountPointType,
        priority: Option<MounterId>,
    ) -> BodyCoverage {
        let mounter_coverage = self
            .select_mounter(mounters, location_type, priority)
            .and_then(|id| mounters.get(id))
            .map(|mounter| mounter.coverage_for(location_type))
            .unwrap_or(BodyCoverage::NONE);
        self.settings.coverage | mounter_coverage
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Начать mount в `location`
    ///
    /// false (без изменения состояния): location отсутствует/заблокирован,
    /// accessory уничтожен, node accessory или location уже despawn'ут,
    /// ни один mounter не принимает пару.
    pub fn mount(
        &mut self,
        ctx: &mut MountContext,
        location: Option<&MountPoint>,
        owner: Owner,
        priority: Option<MounterId>,
        additional: BodyCoverage,
    ) -> bool {
        if self.status == AccessoryStatus::Destroyed {
            log_error(&format!("Accessory {:?}: mount on destroyed accessory", self.node));
            return false;
        }
        let Some(location) = location.copied() else {
            log_error(&format!("Accessory {:?}: mount without location", self.node));
            return false;
        };
        if location.is_blocked {
            log(&format!("Accessory {:?}: location {:?} is blocked", self.node, location.location_type));
            return false;
        }
        // Liveness до cancel_job: текущий mount не трогаем, если новый заведомо не начнётся
        if !ctx.scene.is_alive(self.node) {
            log_error(&format!("Accessory {:?}: node destroyed out of band", self.node));
            return false;
        }
        if !ctx.scene.is_alive(location.node) {
            log_error(&format!(
                "Accessory {:?}: mount point node {:?} ({:?}) is gone",
                self.node, location.node, location.location_type
            ));
            return false;
        }
        let Some(mounter_id) = self.select_mounter(ctx.mounters, location.location_type, priority) else {
            log(&format!(
                "Accessory {:?}: no mounter accepts {:?}",
                self.node, location.location_type
            ));
            return false;
        };

        // Предыдущий mount (remount) - отменяем до старта нового
        self.cancel_job(ctx);

        let coverage = self.coverage_for(ctx.mounters, location.location_type, Some(mounter_id)) | additional;

        let Some(mounter) = ctx.mounters.get_mut(mounter_id) else {
            return false;
        };
        if !mounter.initialize_mount(ctx.scene, self.node, &location) {
            // Прежний mount уже отменён, вернуть его нельзя
            log_warning(&format!(
                "Accessory {:?}: mounter '{}' failed to initialize at {:?}",
                self.node,
                mounter.name(),
                location.location_type
            ));
            self.reset(ctx);
            return false;
        }

        self.owner = owner;
        self.location = Some(location);
        self.current_coverage = coverage;
        self.status = AccessoryStatus::Mounting;
        self.job = Some(MountJob {
            mounter: mounter_id,
            additional,
        });

        // Первый шаг синхронно: snap mounter'ы завершаются сразу
        if !mounter.update_mount(ctx.scene, self.node, &location, false, 0.0) {
            self.status = AccessoryStatus::Mounted;
        }

        log(&format!(
            "Accessory {:?}: {:?} at {:?} via '{}' (coverage {})",
            self.node,
            self.status,
            location.location_type,
            mounter.name(),
            coverage
        ));
        self.emit_state(ctx.outbox);
        true
    }

    /// Продвинуть in-flight mount на `delta_secs` (или завершить сразу)
    pub fn advance(&mut self, ctx: &mut MountContext, delta_secs: f32, immediate_complete: bool) {
        if self.status != AccessoryStatus::Mounting {
            return;
        }
        let (Some(job), Some(location)) = (self.job, self.location) else {
            return;
        };

        let Some(mounter) = ctx.mounters.get_mut(job.mounter) else {
            log_error(&format!(
                "Accessory {:?}: mounter {:?} removed mid-mount, releasing",
                self.node, job.mounter
            ));
            self.job = None;
            self.reset(ctx);
            return;
        };

        if !mounter.update_mount(ctx.scene, self.node, &location, immediate_complete, delta_secs) {
            self.status = AccessoryStatus::Mounted;
            log(&format!("Accessory {:?}: mount completed at {:?}", self.node, location.location_type));
            self.emit_state(ctx.outbox);
        }
    }

    /// Завершить in-flight mount немедленно
    pub fn complete_mount(&mut self, ctx: &mut MountContext) {
        self.advance(ctx, 0.0, true);
    }

    /// Припарковать под `container` (zero local offset, coverage = 0)
    pub fn store(&mut self, ctx: &mut MountContext, owner: Owner, container: Entity) -> bool {
        if self.status == AccessoryStatus::Destroyed {
            log_error(&format!("Accessory {:?}: store on destroyed accessory", self.node));
            return false;
        }
        if !ctx.scene.is_alive(self.node) {
            log_error(&format!("Accessory {:?}: store of node destroyed out of band", self.node));
            return false;
        }
        if !ctx.scene.is_alive(container) {
            log_error(&format!("Accessory {:?}: store container {:?} is gone", self.node, container));
            return false;
        }

        self.cancel_job(ctx);

        ctx.scene.set_parent(self.node, Some(container), false);
        let mut local = ctx.scene.local_transform(self.node);
        local.translation = Vec3::ZERO;
        local.rotation = Quat::IDENTITY;
        ctx.scene.set_local_transform(self.node, local);

        self.owner = owner;
        self.location = None;
        self.current_coverage = BodyCoverage::NONE;
        self.status = AccessoryStatus::Stored;

        log(&format!("Accessory {:?}: stored under {:?}", self.node, container));
        self.emit_state(ctx.outbox);
        true
    }

    /// Вернуть в Unmanaged (owner/location/coverage сброшены)
    pub fn release(&mut self, ctx: &mut MountContext) -> bool {
        if self.status == AccessoryStatus::Destroyed {
            log_error(&format!("Accessory {:?}: release on destroyed accessory", self.node));
            return false;
        }
        if self.status == AccessoryStatus::Unmanaged && self.owner.is_none() {
            return true;
        }

        self.cancel_job(ctx);
        // World pose сохраняем, accessory остаётся на месте
        if ctx.scene.is_alive(self.node) {
            ctx.scene.set_parent(self.node, None, true);
        }
        self.reset(ctx);
        true
    }

    /// Pre-destruction: отменить mount и уведомить observers.
    /// Teardown делает `Wardrobe::destroy_accessory` после dispatch.
    pub(crate) fn begin_destroy(&mut self, ctx: &mut MountContext, destroy_type: DestroyType) -> bool {
        if self.status == AccessoryStatus::Destroyed {
            return false;
        }
        self.cancel_job(ctx);
        ctx.outbox.push_back(Notification::AccessoryDestroying {
            accessory: self.node,
            destroy_type,
        });
        true
    }

    pub(crate) fn finish_destroy(&mut self) {
        self.owner = Owner::None;
        self.location = None;
        self.current_coverage = BodyCoverage::NONE;
        self.job = None;
        self.status = AccessoryStatus::Destroyed;
        self.observers.clear();
    }

    /// Runtime смена intrinsic coverage (только при `is_coverage_dynamic`)
    ///
    /// Смонтированный accessory пересчитывает current coverage на месте,
    /// outfit conflict check при этом не повторяется.
    pub(crate) fn set_coverage(&mut self, mounters: &MounterRegistry, coverage: BodyCoverage) -> bool {
        if !self.settings.is_coverage_dynamic {
            log_error(&format!("Accessory {:?}: coverage is not dynamic", self.node));
            return false;
        }
        self.settings.coverage = coverage;

        if let (true, Some(job), Some(location)) = (self.status.is_attached(), self.job, self.location) {
            let mounter_coverage = mounters
                .get(job.mounter)
                .map(|mounter| mounter.coverage_for(location.location_type))
                .unwrap_or(BodyCoverage::NONE);
            self.current_coverage = coverage | mounter_coverage | job.additional;
        }
        true
    }

    /// Отменить in-flight mount (если есть), attach record сбрасывается
    fn cancel_job(&mut self, ctx: &mut MountContext) {
        let job = self.job.take();
        if self.status != AccessoryStatus::Mounting {
            return;
        }
        let (Some(job), Some(location)) = (job, self.location) else {
            return;
        };
        if let Some(mounter) = ctx.mounters.get_mut(job.mounter) {
            mounter.cancel_mount(ctx.scene, self.node, &location);
        }
    }

    fn reset(&mut self, ctx: &mut MountContext) {
        self.job = None;
        self.owner = Owner::None;
        self.location = None;
        self.current_coverage = BodyCoverage::NONE;
        self.status = AccessoryStatus::Unmanaged;
        log(&format!("Accessory {:?}: released", self.node));
        self.emit_state(ctx.outbox);
    }

    fn emit_state(&self, outbox: &mut Outbox) {
        outbox.push_back(Notification::AccessoryStateChanged {
            accessory: self.node,
            status: self.status,
            owner: self.owner,
            location: self.location.map(|l| l.location_type),
        });
    }
}
