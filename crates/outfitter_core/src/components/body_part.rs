//! Body parts: collider регионы outfit'а (hit zones, raycast targets)
//!
//! `ColliderStatus` не хранится: он всегда выводится из двух флагов host'а
//! (collider enabled + rigidbody detect collisions). Единственный мутатор - `set_status`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::scene::SceneHost;

/// Тип body part (для hit reactions, targeting)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum BodyPartType {
    Head,
    Torso,
    Pelvis,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    Custom(u8),
}

/// Статус коллайдера
///
/// | collider enabled | detect collisions | status        |
/// |------------------|-------------------|---------------|
/// | false            | *                 | Disabled      |
/// | true             | false             | RaycastOnly   |
/// | true             | true              | FullCollision |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum ColliderStatus {
    Disabled,
    RaycastOnly,
    FullCollision,
}

impl ColliderStatus {
    pub fn from_flags(collider_enabled: bool, detect_collisions: bool) -> Self {
        match (collider_enabled, detect_collisions) {
            (false, _) => ColliderStatus::Disabled,
            (true, false) => ColliderStatus::RaycastOnly,
            (true, true) => ColliderStatus::FullCollision,
        }
    }

    /// (collider enabled, detect collisions)
    pub fn to_flags(self) -> (bool, bool) {
        match self {
            ColliderStatus::Disabled => (false, false),
            ColliderStatus::RaycastOnly => (true, false),
            ColliderStatus::FullCollision => (true, true),
        }
    }
}

/// Body part на outfit'е
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct BodyPart {
    pub part_type: BodyPartType,
    /// Collider entity (host)
    pub collider: Entity,
    /// Informational back-reference (обычно entity outfit'а)
    pub context: Option<Entity>,
}

impl BodyPart {
    pub fn new(part_type: BodyPartType, collider: Entity) -> Self {
        Self {
            part_type,
            collider,
            context: None,
        }
    }

    /// Текущий статус (пересчитывается из флагов host'а)
    pub fn status(&self, scene: &dyn SceneHost) -> ColliderStatus {
        let (enabled, detect) = scene.collider_flags(self.collider);
        ColliderStatus::from_flags(enabled, detect)
    }

    pub fn set_status(&self, scene: &mut dyn SceneHost, status: ColliderStatus) {
        let (enabled, detect) = status.to_flags();
        scene.set_collider_flags(self.collider, enabled, detect);
    }
}
