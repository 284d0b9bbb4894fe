//! Mounter strategies: pluggable attach алгоритмы
//!
//! # Protocol
//!
//! 1. `can_mount` / `coverage_for` - pure, без side effects
//! 2. `initialize_mount` - setup (parenting convention + start pose), должен вернуть true
//! 3. `update_mount` - раз в tick, true пока in-progress, false на completion
//!    (на completion pose snap'ается точно в offset-adjusted target)
//! 4. `cancel_mount` - бросить in-progress mount без finalize, безопасно после `initialize_mount`
//!
//! Реализации:
//! - `SnapMounter` - мгновенный snap с фиксированным local offset
//! - `EasingMounter` - curve-based transfer, несколько accessory одновременно

use bevy::prelude::*;

use crate::accessory::Accessory;
use crate::components::{BodyCoverage, MountPoint, MountPointType};
use crate::scene::SceneHost;

pub mod curve;
pub mod easing;
pub mod snap;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod easing_tests;

pub use curve::NormalizedCurve;
pub use easing::{EasingMounter, MountSpace};
pub use snap::SnapMounter;

pub trait AccessoryMounter: Send + Sync {
    /// Имя для логов
    fn name(&self) -> &str;

    /// Coverage, которую получает accessory смонтированный в `location_type`
    fn coverage_for(&self, location_type: MountPointType) -> BodyCoverage;

    fn can_mount(&self, accessory: &Accessory, location_type: MountPointType) -> bool;

    fn initialize_mount(
        &mut self,
        scene: &mut dyn SceneHost,
        accessory: Entity,
        location: &MountPoint,
    ) -> bool;

    /// true → ещё in-progress, false → mount завершён
    fn update_mount(
        &mut self,
        scene: &mut dyn SceneHost,
        accessory: Entity,
        location: &MountPoint,
        immediate_complete: bool,
        delta_secs: f32,
    ) -> bool;

    fn cancel_mount(&mut self, scene: &mut dyn SceneHost, accessory: Entity, location: &MountPoint);

    /// Сколько accessory сейчас in-flight (per-accessory transient state)
    fn in_flight(&self) -> usize {
        0
    }
}

// ============================================================================
// Location targets (общие для всех стратегий)
// ============================================================================

/// Location type + coverage, которую стратегия выдаёт в этой локации
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationTarget {
    pub location_type: MountPointType,
    pub coverage: BodyCoverage,
}

impl LocationTarget {
    pub fn new(location_type: MountPointType, coverage: BodyCoverage) -> Self {
        Self {
            location_type,
            coverage,
        }
    }
}

/// Список поддерживаемых локаций стратегии
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationTargets(pub Vec<LocationTarget>);

impl LocationTargets {
    pub fn single(location_type: MountPointType, coverage: BodyCoverage) -> Self {
        Self(vec![LocationTarget::new(location_type, coverage)])
    }

    pub fn with(mut self, location_type: MountPointType, coverage: BodyCoverage) -> Self {
        self.0.push(LocationTarget::new(location_type, coverage));
        self
    }

    pub fn supports(&self, location_type: MountPointType) -> bool {
        self.0.iter().any(|t| t.location_type == location_type)
    }

    pub fn coverage_for(&self, location_type: MountPointType) -> BodyCoverage {
        self.0
            .iter()
            .find(|t| t.location_type == location_type)
            .map(|t| t.coverage)
            .unwrap_or(BodyCoverage::NONE)
    }
}

/// Offset-adjusted target pose (local к mount point), scale сохраняем текущий
pub(crate) fn offset_pose(offset_position: Vec3, offset_rotation: Quat, scale: Vec3) -> Transform {
    Transform {
        translation: offset_position,
        rotation: offset_rotation,
        scale,
    }
}

// ============================================================================
// MounterRegistry
// ============================================================================

/// Handle на зарегистрированный mounter
///
/// После `MounterRegistry::remove` handle становится stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MounterId(u32);

#[derive(Default)]
pub struct MounterRegistry {
    slots: Vec<Option<Box<dyn AccessoryMounter>>>,
}

impl MounterRegistry {
    pub fn add(&mut self, mounter: Box<dyn AccessoryMounter>) -> MounterId {
        self.slots.push(Some(mounter));
        MounterId(self.slots.len() as u32 - 1)
    }

    pub fn remove(&mut self, id: MounterId) -> Option<Box<dyn AccessoryMounter>> {
        self.slots.get_mut(id.0 as usize)?.take()
    }

    pub fn contains(&self, id: MounterId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: MounterId) -> Option<&dyn AccessoryMounter> {
        self.slots.get(id.0 as usize)?.as_deref()
    }

    pub fn get_mut(&mut self, id: MounterId) -> Option<&mut (dyn AccessoryMounter + 'static)> {
        self.slots.get_mut(id.0 as usize)?.as_deref_mut()
    }

    /// Количество живых mounter'ов
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_targets() {
        let targets = LocationTargets::single(MountPointType::Head, BodyCoverage::HAIR)
            .with(MountPointType::Back, BodyCoverage::BACK);

        assert!(targets.supports(MountPointType::Head));
        assert!(!targets.supports(MountPointType::LeftHand));
        assert_eq!(targets.coverage_for(MountPointType::Back), BodyCoverage::BACK);
        assert_eq!(targets.coverage_for(MountPointType::Chest), BodyCoverage::NONE);
    }

    #[test]
    fn test_registry_remove_leaves_stale_id() {
        let mut registry = MounterRegistry::default();
        let first = registry.add(Box::new(SnapMounter::new(LocationTargets::default())));
        let second = registry.add(Box::new(SnapMounter::new(LocationTargets::default())));
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(first).is_some());
        assert!(!registry.contains(first));
        assert!(registry.contains(second));
        assert_eq!(registry.len(), 1);

        // Повторный remove - no-op
        assert!(registry.remove(first).is_none());
    }
}
