//! Tests for EasingMounter.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use crate::components::{BodyCoverage, MountPoint, MountPointType};
    use crate::mounting::{AccessoryMounter, EasingMounter, LocationTargets, MountSpace, NormalizedCurve};
    use crate::scene::SceneHost;

    fn hand_mounter(duration: f32) -> EasingMounter {
        EasingMounter::new(
            LocationTargets::single(MountPointType::RightHand, BodyCoverage::RIGHT_HAND),
            duration,
        )
        .with_offset(Vec3::new(0.0, 0.0, 0.2), Quat::from_rotation_y(0.5))
    }

    fn setup() -> (World, Entity, Entity) {
        let mut world = World::new();
        let hand = world.spawn(Transform::from_xyz(0.5, 1.0, 0.0)).id();
        let sword = world.spawn(Transform::from_xyz(3.0, 0.0, -2.0)).id();
        (world, hand, sword)
    }

    #[test]
    fn test_converges_exactly_on_crossing_step() {
        let (mut world, hand, sword) = setup();
        let location = MountPoint::new(MountPointType::RightHand, hand);
        let mut mounter = hand_mounter(0.5);

        assert!(mounter.initialize_mount(&mut world, sword, &location));

        // 0.2 + 0.2 = 0.4 < 0.5 → in-progress
        assert!(mounter.update_mount(&mut world, sword, &location, false, 0.2));
        assert!(mounter.update_mount(&mut world, sword, &location, false, 0.2));
        // 0.6 ≥ 0.5 → completion на этом шаге
        assert!(!mounter.update_mount(&mut world, sword, &location, false, 0.2));

        let pose = world.local_transform(sword);
        assert_eq!(pose.translation, Vec3::new(0.0, 0.0, 0.2));
        assert_eq!(pose.rotation, Quat::from_rotation_y(0.5));
        assert_eq!(SceneHost::parent(&world, sword), Some(hand));
        assert_eq!(mounter.in_flight(), 0);
    }

    #[test]
    fn test_interpolates_from_start_pose() {
        let (mut world, hand, sword) = setup();
        let location = MountPoint::new(MountPointType::RightHand, hand);
        let mut mounter = hand_mounter(1.0).with_curves(NormalizedCurve::Linear, NormalizedCurve::Linear);

        assert!(mounter.initialize_mount(&mut world, sword, &location));
        let start = world.local_transform(sword).translation;
        let end = Vec3::new(0.0, 0.0, 0.2);

        assert!(mounter.update_mount(&mut world, sword, &location, false, 0.5));
        let halfway = world.local_transform(sword).translation;
        let expected = end + (start - end) * 0.5;
        assert!((halfway - expected).length() < 1e-4, "{:?} vs {:?}", halfway, expected);
    }

    #[test]
    fn test_immediate_complete() {
        let (mut world, hand, sword) = setup();
        let location = MountPoint::new(MountPointType::RightHand, hand);
        let mut mounter = hand_mounter(10.0);

        assert!(mounter.initialize_mount(&mut world, sword, &location));
        assert!(!mounter.update_mount(&mut world, sword, &location, true, 0.0));
        assert_eq!(world.local_transform(sword).translation, Vec3::new(0.0, 0.0, 0.2));
        assert_eq!(mounter.in_flight(), 0);
    }

    #[test]
    fn test_cancel_leaves_no_residual_state() {
        let (mut world, hand, sword) = setup();
        let back = world.spawn(Transform::from_xyz(0.0, 1.2, -0.2)).id();
        let location = MountPoint::new(MountPointType::RightHand, hand);
        let mut mounter = hand_mounter(1.0).with_space(MountSpace::Location);

        assert!(mounter.initialize_mount(&mut world, sword, &location));
        assert_eq!(mounter.in_flight(), 1);

        mounter.cancel_mount(&mut world, sword, &location);
        assert_eq!(mounter.in_flight(), 0);

        // Сразу можно переинициализировать под другую локацию
        let other = MountPoint::new(MountPointType::RightHand, back);
        assert!(mounter.initialize_mount(&mut world, sword, &other));
        assert_eq!(mounter.in_flight(), 1);
        assert_eq!(SceneHost::parent(&world, sword), Some(back));
    }

    #[test]
    fn test_multiple_concurrent_mounts() {
        let mut world = World::new();
        let left = world.spawn(Transform::from_xyz(-0.5, 1.0, 0.0)).id();
        let right = world.spawn(Transform::from_xyz(0.5, 1.0, 0.0)).id();
        let dagger = world.spawn(Transform::from_xyz(0.0, 0.0, 1.0)).id();
        let pistol = world.spawn(Transform::from_xyz(0.0, 0.0, -1.0)).id();
        let targets = LocationTargets::single(MountPointType::LeftHand, BodyCoverage::LEFT_HAND)
            .with(MountPointType::RightHand, BodyCoverage::RIGHT_HAND);
        let mut mounter = EasingMounter::new(targets, 0.3);

        let left_mp = MountPoint::new(MountPointType::LeftHand, left);
        let right_mp = MountPoint::new(MountPointType::RightHand, right);

        assert!(mounter.initialize_mount(&mut world, dagger, &left_mp));
        assert!(mounter.update_mount(&mut world, dagger, &left_mp, false, 0.2));
        assert!(mounter.initialize_mount(&mut world, pistol, &right_mp));
        assert_eq!(mounter.in_flight(), 2);

        // dagger завершается раньше, pistol продолжает
        assert!(!mounter.update_mount(&mut world, dagger, &left_mp, false, 0.2));
        assert!(mounter.update_mount(&mut world, pistol, &right_mp, false, 0.2));
        assert_eq!(mounter.in_flight(), 1);

        assert!(!mounter.update_mount(&mut world, pistol, &right_mp, false, 0.2));
        assert_eq!(mounter.in_flight(), 0);
    }

    #[test]
    fn test_shared_ancestor_space() {
        let mut world = World::new();
        let body = world.spawn(Transform::from_xyz(10.0, 0.0, 0.0)).id();
        let hand = world.spawn(Transform::from_xyz(0.5, 1.0, 0.0)).id();
        let holster = world.spawn(Transform::from_xyz(-0.2, 0.9, 0.0)).id();
        let pistol = world.spawn(Transform::default()).id();
        world.attach(hand, Some(body));
        world.attach(holster, Some(body));
        world.attach(pistol, Some(holster));

        let location = MountPoint::new(MountPointType::RightHand, hand);
        let mut mounter = hand_mounter(1.0).with_space(MountSpace::SharedAncestor);

        assert!(mounter.initialize_mount(&mut world, pistol, &location));
        // Во время ease accessory живёт в пространстве body
        assert_eq!(SceneHost::parent(&world, pistol), Some(body));
        let world_start = world.world_transform(pistol).translation();
        assert!((world_start - Vec3::new(9.8, 0.9, 0.0)).length() < 1e-4);

        assert!(mounter.update_mount(&mut world, pistol, &location, false, 0.5));
        assert!(!mounter.update_mount(&mut world, pistol, &location, false, 0.5));

        assert_eq!(SceneHost::parent(&world, pistol), Some(hand));
        assert_eq!(world.local_transform(pistol).translation, Vec3::new(0.0, 0.0, 0.2));
    }
}
