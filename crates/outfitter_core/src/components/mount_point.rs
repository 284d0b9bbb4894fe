//! Mount points: именованные attachment слоты на outfit'е

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Тип локации для монтирования accessory
///
/// Не иерархический: matching только по равенству.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Reflect)]
pub enum MountPointType {
    Root,
    Head,
    Face,
    Neck,
    Chest,
    Back,
    Hips,
    LeftHand,
    RightHand,
    LeftFoot,
    RightFoot,
    Custom(u8),
}

/// Mount point на outfit'е
///
/// - `node` - transform target (host entity)
/// - `is_blocked` - hint: новые accessory сюда не монтируются
/// - `context` - informational back-reference (обычно entity outfit'а)
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct MountPoint {
    pub location_type: MountPointType,
    pub node: Entity,
    pub is_blocked: bool,
    pub context: Option<Entity>,
}

impl MountPoint {
    pub fn new(location_type: MountPointType, node: Entity) -> Self {
        Self {
            location_type,
            node,
            is_blocked: false,
            context: None,
        }
    }

    /// Builder: сразу заблокированный mount point
    pub fn blocked(mut self) -> Self {
        self.is_blocked = true;
        self
    }
}
