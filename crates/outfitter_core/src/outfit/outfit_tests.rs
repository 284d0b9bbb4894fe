//! Tests for Outfit mount authority.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use std::sync::{Arc, Mutex};

    use crate::accessory::{AccessorySettings, AccessoryStatus, DestroyType};
    use crate::components::{
        BodyCoverage, BodyPart, BodyPartType, ColliderStatus, MountPoint, MountPointType, Owner,
    };
    use crate::mounting::{LocationTargets, MounterId, SnapMounter};
    use crate::outfit::{MountResult, OutfitDefinition};
    use crate::scene::SceneHost;
    use crate::wardrobe::{Notification, OutfitObserver, Wardrobe};

    struct Fixture {
        world: World,
        wardrobe: Wardrobe,
        snap: MounterId,
        outfit: Entity,
        head_node: Entity,
    }

    fn fixture(definition: impl FnOnce(OutfitDefinition) -> OutfitDefinition) -> Fixture {
        let mut world = World::new();
        let mut wardrobe = Wardrobe::default();
        wardrobe.set_publishing(true);

        let snap = wardrobe.add_mounter(Box::new(SnapMounter::new(
            LocationTargets::single(MountPointType::Head, BodyCoverage::HAIR)
                .with(MountPointType::RightHand, BodyCoverage::RIGHT_HAND),
        )));

        let outfit = world.spawn(Transform::default()).id();
        let head_node = world.spawn(Transform::from_xyz(0.0, 1.7, 0.0)).id();
        let hand_node = world.spawn(Transform::from_xyz(0.4, 1.0, 0.0)).id();
        let chest_node = world.spawn(Transform::from_xyz(0.0, 1.3, 0.0)).id();
        let base = OutfitDefinition::new()
            .with_mount_point(MountPoint::new(MountPointType::Head, head_node))
            .with_mount_point(MountPoint::new(MountPointType::RightHand, hand_node))
            .with_mount_point(MountPoint::new(MountPointType::Chest, chest_node));
        assert!(wardrobe.register_outfit(outfit, definition(base)));

        Fixture {
            world,
            wardrobe,
            snap,
            outfit,
            head_node,
        }
    }

    fn hat(f: &mut Fixture, coverage: BodyCoverage) -> Entity {
        let node = f.world.spawn(Transform::default()).id();
        let settings = AccessorySettings::new(MountPointType::Head, coverage, vec![f.snap]);
        assert!(f.wardrobe.register_accessory(node, settings));
        node
    }

    fn mount(f: &mut Fixture, accessory: Entity, location_type: MountPointType) -> MountResult {
        f.wardrobe.mount_to_outfit(
            &mut f.world,
            f.outfit,
            accessory,
            location_type,
            false,
            None,
            BodyCoverage::NONE,
        )
    }

    #[test]
    fn test_register_syncs_context() {
        let f = fixture(|d| d);
        let outfit = f.wardrobe.outfit(f.outfit).unwrap();
        assert!(outfit.mount_points().iter().all(|mp| mp.context == Some(f.outfit)));
        assert_eq!(outfit.motion_root(), f.outfit);
    }

    #[test]
    fn test_basic_mount() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);

        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::Success);

        assert!(f.wardrobe.outfit_coverage(f.outfit).contains(BodyCoverage::HAIR));
        assert!(f.wardrobe.outfit(f.outfit).unwrap().is_tracked(cap));
        let acc = f.wardrobe.accessory(cap).unwrap();
        assert_eq!(acc.status(), AccessoryStatus::Mounted);
        assert_eq!(acc.owner(), Owner::Outfit(f.outfit));
        assert_eq!(SceneHost::parent(&f.world, cap), Some(f.head_node));

        let published = f.wardrobe.drain_published();
        assert!(published.contains(&Notification::OutfitAccessoryMounted {
            outfit: f.outfit,
            accessory: cap
        }));
    }

    #[test]
    fn test_coverage_blocked() {
        let mut f = fixture(|d| d);
        let x = hat(&mut f, BodyCoverage::NONE);
        let y = hat(&mut f, BodyCoverage::NONE);

        assert_eq!(mount(&mut f, x, MountPointType::Head), MountResult::Success);
        assert_eq!(mount(&mut f, y, MountPointType::Head), MountResult::CoverageBlocked);

        assert_eq!(f.wardrobe.accessory_status(y), Some(AccessoryStatus::Unmanaged));
        assert_eq!(f.wardrobe.accessory(y).unwrap().owner(), Owner::None);
        assert_eq!(f.wardrobe.accessory_status(x), Some(AccessoryStatus::Mounted));
        assert!(!f.wardrobe.outfit(f.outfit).unwrap().is_tracked(y));
    }

    #[test]
    fn test_coverage_blocks_and_ignore_restrictions() {
        let mut f = fixture(|d| d.with_coverage_blocks(BodyCoverage::HAIR));
        let cap = hat(&mut f, BodyCoverage::NONE);

        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::CoverageBlocked);

        let forced = f.wardrobe.mount_to_outfit(
            &mut f.world,
            f.outfit,
            cap,
            MountPointType::Head,
            true,
            None,
            BodyCoverage::NONE,
        );
        assert_eq!(forced, MountResult::Success);
    }

    #[test]
    fn test_limited_outfit_override() {
        let mut f = fixture(|d| d.limited());
        let plain = hat(&mut f, BodyCoverage::NONE);
        assert_eq!(mount(&mut f, plain, MountPointType::Head), MountResult::OutfitIsLimited);
        assert_eq!(f.wardrobe.accessory_status(plain), Some(AccessoryStatus::Unmanaged));

        let node = f.world.spawn(Transform::default()).id();
        let settings = AccessorySettings::new(MountPointType::Head, BodyCoverage::NONE, vec![f.snap]).ignoring_limited();
        f.wardrobe.register_accessory(node, settings);
        // Дальше обычные проверки: Chest нет у snap mounter'а
        assert_eq!(mount(&mut f, node, MountPointType::Chest), MountResult::RejectedByAccessory);
        assert_eq!(mount(&mut f, node, MountPointType::Head), MountResult::Success);
    }

    #[test]
    fn test_idempotent_remount() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::EARS);

        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::Success);
        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::Success);
        assert_eq!(f.wardrobe.outfit(f.outfit).unwrap().accessories(), &[cap]);
        assert_eq!(
            f.wardrobe.outfit_coverage(f.outfit),
            BodyCoverage::HAIR | BodyCoverage::EARS
        );
    }

    #[test]
    fn test_missing_and_blocked_locations() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);

        assert_eq!(mount(&mut f, cap, MountPointType::Back), MountResult::NoMountPoint);

        f.wardrobe
            .outfit_mut(f.outfit)
            .unwrap()
            .set_location_blocked(MountPointType::Head, true);
        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::LocationBlocked);
        assert_eq!(f.wardrobe.accessory_status(cap), Some(AccessoryStatus::Unmanaged));

        f.wardrobe
            .outfit_mut(f.outfit)
            .unwrap()
            .set_location_blocked(MountPointType::Head, false);
        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::Success);
    }

    #[test]
    fn test_stale_priority_mounter_fails_on_error() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);
        let temp = f
            .wardrobe
            .add_mounter(Box::new(SnapMounter::new(LocationTargets::single(MountPointType::Head, BodyCoverage::NONE))));
        assert!(f.wardrobe.remove_mounter(temp));

        let result = f.wardrobe.mount_to_outfit(
            &mut f.world,
            f.outfit,
            cap,
            MountPointType::Head,
            false,
            Some(temp),
            BodyCoverage::NONE,
        );
        assert_eq!(result, MountResult::FailedOnError);
        assert_eq!(f.wardrobe.accessory_status(cap), Some(AccessoryStatus::Unmanaged));
    }

    #[test]
    fn test_unknown_objects_fail_on_error() {
        let mut f = fixture(|d| d);
        let stranger = f.world.spawn(Transform::default()).id();
        assert_eq!(mount(&mut f, stranger, MountPointType::Head), MountResult::FailedOnError);
    }

    #[test]
    fn test_mount_of_out_of_band_destroyed_accessory_fails_on_error() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);
        assert!(f.world.despawn(cap));
        f.wardrobe.drain_published();

        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::FailedOnError);

        assert!(!f.wardrobe.outfit(f.outfit).unwrap().is_tracked(cap));
        assert_eq!(f.wardrobe.accessory_status(cap), Some(AccessoryStatus::Unmanaged));
        assert_eq!(f.wardrobe.outfit_coverage(f.outfit), BodyCoverage::NONE);
        assert!(f.wardrobe.drain_published().is_empty());
    }

    #[test]
    fn test_release_from_outfit() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);
        let world_before = f.world.world_transform(cap).translation();

        assert!(!f.wardrobe.release_from_outfit(&mut f.world, f.outfit, cap));

        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::Success);
        f.wardrobe.drain_published();
        assert!(f.wardrobe.release_from_outfit(&mut f.world, f.outfit, cap));

        assert_eq!(f.wardrobe.accessory_status(cap), Some(AccessoryStatus::Unmanaged));
        assert_eq!(f.wardrobe.outfit_coverage(f.outfit), BodyCoverage::NONE);
        assert_eq!(SceneHost::parent(&f.world, cap), None);
        assert_ne!(f.world.world_transform(cap).translation(), world_before);

        let released = f
            .wardrobe
            .drain_published()
            .into_iter()
            .filter(|n| matches!(n, Notification::OutfitAccessoryReleased { .. }))
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn test_external_detach_untracks() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);
        let shelf = f.world.spawn(Transform::default()).id();
        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::Success);

        // Кто-то другой забирает accessory в storage
        assert!(f.wardrobe.store_accessory(&mut f.world, cap, Owner::None, shelf));

        assert!(!f.wardrobe.outfit(f.outfit).unwrap().is_tracked(cap));
        assert_eq!(f.wardrobe.outfit_coverage(f.outfit), BodyCoverage::NONE);
        assert!(f.wardrobe.accessory(cap).unwrap().observers().is_empty());
    }

    #[test]
    fn test_coverage_invariant_ignores_detached() {
        let mut f = fixture(|d| d.with_coverage_blocks(BodyCoverage::TAIL));
        let cap = hat(&mut f, BodyCoverage::NONE);
        let node = f.world.spawn(Transform::default()).id();
        f.wardrobe.register_accessory(
            node,
            AccessorySettings::new(MountPointType::RightHand, BodyCoverage::NONE, vec![f.snap]),
        );

        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::Success);
        assert_eq!(mount(&mut f, node, MountPointType::RightHand), MountResult::Success);
        assert_eq!(
            f.wardrobe.outfit_coverage(f.outfit),
            BodyCoverage::TAIL | BodyCoverage::HAIR | BodyCoverage::RIGHT_HAND
        );

        f.wardrobe.release_accessory(&mut f.world, node);
        assert_eq!(
            f.wardrobe.outfit_coverage(f.outfit),
            BodyCoverage::TAIL | BodyCoverage::HAIR
        );
    }

    #[test]
    fn test_release_all() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);
        let node = f.world.spawn(Transform::default()).id();
        f.wardrobe.register_accessory(
            node,
            AccessorySettings::new(MountPointType::RightHand, BodyCoverage::NONE, vec![f.snap]),
        );
        mount(&mut f, cap, MountPointType::Head);
        mount(&mut f, node, MountPointType::RightHand);

        assert_eq!(f.wardrobe.release_all(&mut f.world, f.outfit), 2);
        assert!(f.wardrobe.outfit(f.outfit).unwrap().accessories().is_empty());
        assert_eq!(f.wardrobe.accessory_status(cap), Some(AccessoryStatus::Unmanaged));
        assert_eq!(f.wardrobe.accessory_status(node), Some(AccessoryStatus::Unmanaged));
    }

    #[test]
    fn test_set_body_part_status() {
        let mut world = World::new();
        let head_collider = world.spawn(Transform::default()).id();
        let hand_collider = world.spawn(Transform::default()).id();
        let outfit = world.spawn(Transform::default()).id();
        let mut wardrobe = Wardrobe::default();
        wardrobe.register_outfit(
            outfit,
            OutfitDefinition::new()
                .with_body_part(BodyPart::new(BodyPartType::Head, head_collider))
                .with_body_part(BodyPart::new(BodyPartType::RightHand, hand_collider)),
        );

        let changed = wardrobe.set_body_part_status(
            &mut world,
            outfit,
            Some(BodyPartType::Head),
            ColliderStatus::RaycastOnly,
        );
        assert_eq!(changed, 1);

        let parts = wardrobe.outfit(outfit).unwrap().body_parts().to_vec();
        assert_eq!(parts[0].status(&world), ColliderStatus::RaycastOnly);
        assert_eq!(parts[1].status(&world), ColliderStatus::FullCollision);
        assert!(parts.iter().all(|p| p.context == Some(outfit)));

        assert_eq!(
            wardrobe.set_body_part_status(&mut world, outfit, None, ColliderStatus::Disabled),
            2
        );
        assert!(parts.iter().all(|p| p.status(&world) == ColliderStatus::Disabled));
    }

    #[derive(Clone, Default)]
    struct OutfitLog(Arc<Mutex<Vec<String>>>);

    impl OutfitObserver for OutfitLog {
        fn on_accessory_mounted(&mut self, _outfit: Entity, accessory: Entity) {
            self.0.lock().unwrap().push(format!("mounted {}", accessory.index()));
        }

        fn on_accessory_released(&mut self, _outfit: Entity, accessory: Entity) {
            self.0.lock().unwrap().push(format!("released {}", accessory.index()));
        }

        fn on_destroy(&mut self, _outfit: Entity) {
            self.0.lock().unwrap().push("destroy".to_string());
        }
    }

    #[test]
    fn test_destroy_outfit_notifies_then_releases() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);
        let log = OutfitLog::default();
        assert!(f.wardrobe.add_outfit_observer(f.outfit, Box::new(log.clone())).is_some());

        mount(&mut f, cap, MountPointType::Head);
        assert!(f.wardrobe.destroy_outfit(&mut f.world, f.outfit));

        assert!(f.wardrobe.outfit(f.outfit).is_none());
        assert!(!f.world.is_alive(f.outfit));
        assert_eq!(f.wardrobe.accessory_status(cap), Some(AccessoryStatus::Unmanaged));
        // Accessory был child'ом head node → head node жив, accessory отпущен в корень
        assert_eq!(SceneHost::parent(&f.world, cap), None);

        let events = log.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                format!("mounted {}", cap.index()),
                "destroy".to_string(),
                format!("released {}", cap.index()),
            ]
        );
    }

    #[test]
    fn test_destroy_accessory_untracks() {
        let mut f = fixture(|d| d);
        let cap = hat(&mut f, BodyCoverage::NONE);
        mount(&mut f, cap, MountPointType::Head);

        assert!(f.wardrobe.destroy_accessory(&mut f.world, cap, DestroyType::Destroy));

        assert!(!f.wardrobe.outfit(f.outfit).unwrap().is_tracked(cap));
        assert_eq!(f.wardrobe.accessory_status(cap), Some(AccessoryStatus::Destroyed));
        assert!(!f.world.is_alive(cap));
        assert_eq!(mount(&mut f, cap, MountPointType::Head), MountResult::FailedOnError);
    }
}
