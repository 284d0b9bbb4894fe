//! EasingMounter: curve-based перенос accessory к mount point'у
//!
//! # Numeric semantics
//!
//! - `t = elapsed / duration` (clamp [0,1])
//! - position: `end + (start - end) * (1 - position_curve(t))`
//! - rotation: shortest-path slerp(start, end, rotation_curve(t))
//! - completion (`elapsed >= duration` или immediate): pose snap'ается
//!   ТОЧНО в offset-adjusted target, не в curve-значение
//!
//! Ease state хранится per-accessory в списке → несколько mount'ов in-flight одновременно.

use bevy::prelude::*;

use super::{offset_pose, AccessoryMounter, LocationTargets, NormalizedCurve};
use crate::accessory::Accessory;
use crate::components::{BodyCoverage, MountPoint, MountPointType};
use crate::scene::SceneHost;

/// В каком пространстве идёт интерполяция
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountSpace {
    /// Accessory сразу child mount point'а, интерполируем local pose
    #[default]
    Location,
    /// Интерполируем в пространстве lowest common ancestor'а,
    /// на completion re-parent под mount point
    SharedAncestor,
}

/// Per-accessory ease state
#[derive(Debug, Clone, Copy)]
struct EaseState {
    accessory: Entity,
    space: Entity,
    elapsed: f32,
    start_position: Vec3,
    start_rotation: Quat,
}

pub struct EasingMounter {
    pub targets: LocationTargets,
    pub position_curve: NormalizedCurve,
    pub rotation_curve: NormalizedCurve,
    /// Длительность перехода (секунды)
    pub ease_duration: f32,
    pub position_offset: Vec3,
    pub rotation_offset: Quat,
    pub space: MountSpace,
    states: Vec<EaseState>,
}

impl EasingMounter {
    pub fn new(targets: LocationTargets, ease_duration: f32) -> Self {
        Self {
            targets,
            position_curve: NormalizedCurve::default(),
            rotation_curve: NormalizedCurve::default(),
            ease_duration,
            position_offset: Vec3::ZERO,
            rotation_offset: Quat::IDENTITY,
            space: MountSpace::default(),
            states: Vec::new(),
        }
    }

    /// Duration из `OutfitterConfig::default_ease_duration`
    pub fn with_defaults(targets: LocationTargets, config: &crate::config::OutfitterConfig) -> Self {
        Self::new(targets, config.default_ease_duration)
    }

    pub fn with_curves(mut self, position: NormalizedCurve, rotation: NormalizedCurve) -> Self {
        self.position_curve = position;
        self.rotation_curve = rotation;
        self
    }

    pub fn with_offset(mut self, position: Vec3, rotation: Quat) -> Self {
        self.position_offset = position;
        self.rotation_offset = rotation;
        self
    }

    pub fn with_space(mut self, space: MountSpace) -> Self {
        self.space = space;
        self
    }

    fn state_index(&self, accessory: Entity) -> Option<usize> {
        self.states.iter().position(|s| s.accessory == accessory)
    }

    /// Target pose, выраженная в пространстве `space`
    fn target_in_space(&self, scene: &dyn SceneHost, space: Entity, location: &MountPoint, scale: Vec3) -> Transform {
        let local_target = offset_pose(self.position_offset, self.rotation_offset, scale);
        if space == location.node {
            return local_target;
        }
        let target_world = scene.world_transform(location.node).mul_transform(local_target);
        target_world.reparented_to(&scene.world_transform(space))
    }

    fn finalize(&mut self, scene: &mut dyn SceneHost, accessory: Entity, location: &MountPoint) {
        if let Some(index) = self.state_index(accessory) {
            self.states.swap_remove(index);
        }
        if scene.parent(accessory) != Some(location.node) {
            scene.set_parent(accessory, Some(location.node), false);
        }
        let scale = scene.local_transform(accessory).scale;
        scene.set_local_transform(
            accessory,
            offset_pose(self.position_offset, self.rotation_offset, scale),
        );
    }
}

impl AccessoryMounter for EasingMounter {
    fn name(&self) -> &str {
        "easing"
    }

    fn coverage_for(&self, location_type: MountPointType) -> BodyCoverage {
        self.targets.coverage_for(location_type)
    }

    fn can_mount(&self, _accessory: &Accessory, location_type: MountPointType) -> bool {
        self.targets.supports(location_type)
    }

    fn initialize_mount(
        &mut self,
        scene: &mut dyn SceneHost,
        accessory: Entity,
        location: &MountPoint,
    ) -> bool {
        if !scene.is_alive(accessory) || !scene.is_alive(location.node) {
            return false;
        }

        let space = match self.space {
            MountSpace::Location => location.node,
            MountSpace::SharedAncestor => match scene.common_ancestor(accessory, location.node) {
                Some(ancestor) if ancestor != accessory => ancestor,
                _ => location.node,
            },
        };

        // World pose сохраняем - интерполяция стартует с текущей позиции
        scene.set_parent(accessory, Some(space), true);
        let start = scene.local_transform(accessory);

        let state = EaseState {
            accessory,
            space,
            elapsed: 0.0,
            start_position: start.translation,
            start_rotation: start.rotation,
        };
        match self.state_index(accessory) {
            Some(index) => self.states[index] = state,
            None => self.states.push(state),
        }
        true
    }

    fn update_mount(
        &mut self,
        scene: &mut dyn SceneHost,
        accessory: Entity,
        location: &MountPoint,
        immediate_complete: bool,
        delta_secs: f32,
    ) -> bool {
        let Some(index) = self.state_index(accessory) else {
            // Не инициализирован → сразу в target
            self.finalize(scene, accessory, location);
            return false;
        };

        self.states[index].elapsed += delta_secs.max(0.0);
        let state = self.states[index];

        if immediate_complete || self.ease_duration <= 0.0 || state.elapsed >= self.ease_duration - 1e-6 {
            self.finalize(scene, accessory, location);
            return false;
        }

        let t = (state.elapsed / self.ease_duration).clamp(0.0, 1.0);
        let position_t = self.position_curve.evaluate(t);
        let rotation_t = self.rotation_curve.evaluate(t);

        let scale = scene.local_transform(accessory).scale;
        let end = self.target_in_space(scene, state.space, location, scale);

        let translation = end.translation + (state.start_position - end.translation) * (1.0 - position_t);
        let rotation = state.start_rotation.slerp(end.rotation, rotation_t);

        scene.set_local_transform(
            accessory,
            Transform {
                translation,
                rotation,
                scale,
            },
        );
        true
    }

    fn cancel_mount(&mut self, _scene: &mut dyn SceneHost, accessory: Entity, _location: &MountPoint) {
        if let Some(index) = self.state_index(accessory) {
            self.states.swap_remove(index);
        }
    }

    fn in_flight(&self) -> usize {
        self.states.len()
    }
}
