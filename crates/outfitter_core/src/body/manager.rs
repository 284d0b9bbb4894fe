//! AccessoryManager: persisted accessory body'а
//!
//! Список `AccessoryMountInfo` переживает смену outfit'а. Порядок вставки =
//! приоритет: при swap раньше добавленные accessory первыми забирают
//! спорные mount points.

use bevy::prelude::*;

use crate::components::{BodyCoverage, MountPointType};
use crate::mounting::MounterId;

/// Как (пере)монтировать accessory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessoryMountInfo {
    pub accessory: Entity,
    pub location_type: MountPointType,
    /// Priority mounter (иначе первый совместимый из settings accessory)
    pub mounter: Option<MounterId>,
    pub additional_coverage: BodyCoverage,
    /// Пропустить limited / coverage проверки outfit'а
    pub ignore_restrictions: bool,
}

impl AccessoryMountInfo {
    pub fn new(accessory: Entity, location_type: MountPointType) -> Self {
        Self {
            accessory,
            location_type,
            mounter: None,
            additional_coverage: BodyCoverage::NONE,
            ignore_restrictions: false,
        }
    }

    pub fn with_mounter(mut self, mounter: MounterId) -> Self {
        self.mounter = Some(mounter);
        self
    }

    pub fn with_additional_coverage(mut self, coverage: BodyCoverage) -> Self {
        self.additional_coverage = coverage;
        self
    }

    pub fn ignoring_restrictions(mut self) -> Self {
        self.ignore_restrictions = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct AccessoryManager {
    items: Vec<AccessoryMountInfo>,
    /// Accessory, чьи события сейчас генерирует сам manager (mount/store в процессе)
    pub(crate) ignore: Option<Entity>,
}

impl AccessoryManager {
    pub fn contains(&self, accessory: Entity) -> bool {
        self.items.iter().any(|i| i.accessory == accessory)
    }

    pub fn info(&self, accessory: Entity) -> Option<&AccessoryMountInfo> {
        self.items.iter().find(|i| i.accessory == accessory)
    }

    /// В порядке приоритета (вставки)
    pub fn iter(&self) -> impl Iterator<Item = &AccessoryMountInfo> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn items(&self) -> Vec<AccessoryMountInfo> {
        self.items.clone()
    }

    pub(crate) fn push(&mut self, info: AccessoryMountInfo) -> bool {
        if self.contains(info.accessory) {
            return false;
        }
        self.items.push(info);
        true
    }

    /// Заменить настройки, позиция в списке (приоритет) сохраняется
    pub(crate) fn replace(&mut self, info: AccessoryMountInfo) -> bool {
        match self.items.iter_mut().find(|i| i.accessory == info.accessory) {
            Some(slot) => {
                *slot = info;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&mut self, accessory: Entity) -> Option<AccessoryMountInfo> {
        let index = self.items.iter().position(|i| i.accessory == accessory)?;
        Some(self.items.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(index: u32) -> AccessoryMountInfo {
        AccessoryMountInfo::new(Entity::from_raw(index), MountPointType::Head)
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut manager = AccessoryManager::default();
        assert!(manager.push(info(1)));
        assert!(!manager.push(info(1)));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_replace_keeps_priority_position() {
        let mut manager = AccessoryManager::default();
        manager.push(info(1));
        manager.push(info(2));
        manager.push(info(3));

        let updated = AccessoryMountInfo::new(Entity::from_raw(2), MountPointType::Back)
            .with_additional_coverage(BodyCoverage::BACK);
        assert!(manager.replace(updated));

        let order: Vec<_> = manager.iter().map(|i| i.accessory.index()).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(
            manager.info(Entity::from_raw(2)).map(|i| i.location_type),
            Some(MountPointType::Back)
        );

        assert!(!manager.replace(info(9)));
    }

    #[test]
    fn test_remove() {
        let mut manager = AccessoryManager::default();
        manager.push(info(1));
        manager.push(info(2));

        assert!(manager.remove(Entity::from_raw(1)).is_some());
        assert!(manager.remove(Entity::from_raw(1)).is_none());
        assert!(!manager.contains(Entity::from_raw(1)));
        assert!(manager.contains(Entity::from_raw(2)));
    }
}
