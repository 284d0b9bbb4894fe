//! SnapMounter: мгновенный mount с фиксированным local offset

use bevy::prelude::*;

use super::{offset_pose, AccessoryMounter, LocationTargets};
use crate::accessory::Accessory;
use crate::components::{BodyCoverage, MountPoint, MountPointType};
use crate::scene::SceneHost;

/// Immediate snap: accessory становится child'ом mount point'а
/// и сразу получает `position_offset`/`rotation_offset` как local pose.
///
/// Transient state нет → `cancel_mount` ничего не делает.
#[derive(Debug, Clone)]
pub struct SnapMounter {
    pub targets: LocationTargets,
    pub position_offset: Vec3,
    pub rotation_offset: Quat,
}

impl SnapMounter {
    pub fn new(targets: LocationTargets) -> Self {
        Self {
            targets,
            position_offset: Vec3::ZERO,
            rotation_offset: Quat::IDENTITY,
        }
    }

    pub fn with_offset(mut self, position: Vec3, rotation: Quat) -> Self {
        self.position_offset = position;
        self.rotation_offset = rotation;
        self
    }
}

impl AccessoryMounter for SnapMounter {
    fn name(&self) -> &str {
        "snap"
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
        scene.set_parent(accessory, Some(location.node), false);
        true
    }

    fn update_mount(
        &mut self,
        scene: &mut dyn SceneHost,
        accessory: Entity,
        location: &MountPoint,
        _immediate_complete: bool,
        _delta_secs: f32,
    ) -> bool {
        if scene.parent(accessory) != Some(location.node) {
            scene.set_parent(accessory, Some(location.node), false);
        }
        let scale = scene.local_transform(accessory).scale;
        scene.set_local_transform(
            accessory,
            offset_pose(self.position_offset, self.rotation_offset, scale),
        );
        false
    }

    fn cancel_mount(&mut self, _scene: &mut dyn SceneHost, _accessory: Entity, _location: &MountPoint) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_parents_and_applies_offset() {
        let mut world = World::new();
        let head = world.spawn(Transform::from_xyz(0.0, 1.7, 0.0)).id();
        let hat = world.spawn(Transform::from_xyz(10.0, 0.0, 0.0)).id();
        let location = MountPoint::new(MountPointType::Head, head);

        let mut mounter = SnapMounter::new(LocationTargets::single(MountPointType::Head, BodyCoverage::HAIR))
            .with_offset(Vec3::new(0.0, 0.1, 0.0), Quat::IDENTITY);

        assert!(mounter.initialize_mount(&mut world, hat, &location));
        assert!(!mounter.update_mount(&mut world, hat, &location, false, 0.0));

        assert_eq!(SceneHost::parent(&world, hat), Some(head));
        assert_eq!(world.local_transform(hat).translation, Vec3::new(0.0, 0.1, 0.0));
        assert_eq!(mounter.in_flight(), 0);
    }

    #[test]
    fn test_snap_rejects_dead_nodes() {
        let mut world = World::new();
        let head = world.spawn(Transform::default()).id();
        let hat = world.spawn(Transform::default()).id();
        SceneHost::despawn(&mut world, head);

        let mut mounter = SnapMounter::new(LocationTargets::single(MountPointType::Head, BodyCoverage::HAIR));
        assert!(!mounter.initialize_mount(&mut world, hat, &MountPoint::new(MountPointType::Head, head)));
    }
}
