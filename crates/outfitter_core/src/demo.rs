//! Headless demo rig: один body, несколько outfit'ов, набор accessory
//!
//! `demo_step` делает одно случайное (seeded) действие и один кадр,
//! `check_invariants` проверяет согласованность wardrobe после каждого шага.
//! Используется бинарником и determinism тестами.

use bevy::prelude::*;
use rand::Rng;

use crate::accessory::AccessorySettings;
use crate::body::AccessoryMountInfo;
use crate::components::{BodyCoverage, MountPoint, MountPointType, Owner};
use crate::config::OutfitterConfig;
use crate::mounting::{EasingMounter, LocationTargets, MounterId, SnapMounter};
use crate::outfit::OutfitDefinition;
use crate::wardrobe::{Wardrobe, WardrobeWorldExt};
use crate::DeterministicRng;

pub struct DemoRig {
    pub body: Entity,
    pub outfits: Vec<Entity>,
    pub accessories: Vec<Entity>,
    pub snap: MounterId,
    pub easing: MounterId,
}

const LOCATIONS: [MountPointType; 5] = [
    MountPointType::Head,
    MountPointType::Back,
    MountPointType::Hips,
    MountPointType::LeftHand,
    MountPointType::RightHand,
];

fn spawn_outfit(world: &mut World, body: Entity, locations: &[MountPointType]) -> (Entity, OutfitDefinition) {
    let outfit = world.spawn((Transform::default(), ChildOf(body))).id();
    let mut definition = OutfitDefinition::new();
    for (i, location_type) in locations.iter().enumerate() {
        let node = world
            .spawn((Transform::from_xyz(0.0, 0.3 * i as f32, 0.0), ChildOf(outfit)))
            .id();
        definition = definition.with_mount_point(MountPoint::new(*location_type, node));
    }
    (outfit, definition)
}

/// Body + 3 outfit'а (полный, без рук, limited с hair block) + 6 accessory
pub fn spawn_demo_rig(app: &mut App) -> DemoRig {
    let world = app.world_mut();
    let ease_duration = world
        .get_resource::<OutfitterConfig>()
        .map(|c| c.default_ease_duration)
        .unwrap_or(0.25);

    let body = world.spawn(Transform::default()).id();
    let (full, full_def) = spawn_outfit(world, body, &LOCATIONS);
    let (light, light_def) = spawn_outfit(world, body, &LOCATIONS[..3]);
    let (armored, armored_def) = spawn_outfit(world, body, &LOCATIONS);
    let armored_def = armored_def.limited().with_coverage_blocks(BodyCoverage::HAIR);

    let accessories: Vec<Entity> = (0..6)
        .map(|i| world.spawn(Transform::from_xyz(i as f32, 0.0, 2.0)).id())
        .collect();

    world.wardrobe_scope(|wardrobe, _world| {
        let snap = wardrobe.add_mounter(Box::new(SnapMounter::new(
            LocationTargets::single(MountPointType::Head, BodyCoverage::HAIR)
                .with(MountPointType::Back, BodyCoverage::BACK)
                .with(MountPointType::Hips, BodyCoverage::HIPS),
        )));
        let easing = wardrobe.add_mounter(Box::new(EasingMounter::new(
            LocationTargets::single(MountPointType::LeftHand, BodyCoverage::LEFT_HAND)
                .with(MountPointType::RightHand, BodyCoverage::RIGHT_HAND)
                .with(MountPointType::Back, BodyCoverage::BACK),
            ease_duration,
        )));

        wardrobe.register_body(body, None);
        wardrobe.register_outfit(full, full_def);
        wardrobe.register_outfit(light, light_def);
        wardrobe.register_outfit(armored, armored_def);

        let settings = [
            AccessorySettings::new(MountPointType::Head, BodyCoverage::NONE, vec![snap]),
            AccessorySettings::new(MountPointType::Head, BodyCoverage::EARS, vec![snap]).ignoring_limited(),
            AccessorySettings::new(MountPointType::Back, BodyCoverage::NONE, vec![easing, snap]),
            AccessorySettings::new(MountPointType::RightHand, BodyCoverage::NONE, vec![easing]),
            AccessorySettings::new(MountPointType::RightHand, BodyCoverage::NONE, vec![easing]).ignoring_limited(),
            AccessorySettings::new(MountPointType::Hips, BodyCoverage::NONE, vec![snap]),
        ];
        for (node, settings) in accessories.iter().zip(settings) {
            wardrobe.register_accessory(*node, settings);
        }

        DemoRig {
            body,
            outfits: vec![full, light, armored],
            accessories: accessories.clone(),
            snap,
            easing,
        }
    })
}

/// Одно случайное действие + один кадр
pub fn demo_step(app: &mut App, rig: &DemoRig) {
    let world = app.world_mut();
    let Some((action, outfit_pick, accessory_pick, flag)) = world
        .get_resource_mut::<DeterministicRng>()
        .map(|mut rng| {
            let action: u32 = rng.rng.gen_range(0..10);
            let outfit_pick: usize = rng.rng.gen_range(0..=rig.outfits.len());
            let accessory_pick: usize = rng.rng.gen_range(0..rig.accessories.len());
            (action, outfit_pick, accessory_pick, rng.rng.gen_bool(0.3))
        })
    else {
        return;
    };

    world.wardrobe_scope(|wardrobe, world| {
        let accessory = rig.accessories[accessory_pick];
        match action {
            0..=2 => {
                // outfit_pick == len → без outfit'а
                let outfit = rig.outfits.get(outfit_pick).copied();
                wardrobe.set_outfit(world, rig.body, outfit);
            }
            3..=5 => {
                let location = wardrobe
                    .accessory(accessory)
                    .map(|a| a.default_location())
                    .unwrap_or(MountPointType::Head);
                wardrobe.add_accessory(world, rig.body, AccessoryMountInfo::new(accessory, location), flag);
            }
            6 | 7 => {
                wardrobe.remove_accessory(world, rig.body, accessory);
            }
            8 => {
                // Переезд на другую локацию (через priority easing mounter)
                let info = AccessoryMountInfo::new(accessory, MountPointType::Back).with_mounter(rig.easing);
                if wardrobe
                    .body(rig.body)
                    .is_some_and(|b| b.accessories().contains(accessory))
                {
                    wardrobe.modify_accessory(world, rig.body, info);
                }
            }
            _ => {
                wardrobe.complete_mount(world, accessory);
            }
        }
    });

    app.update();
}

/// Проверка согласованности: owner, tracking, coverage
pub fn check_invariants(wardrobe: &Wardrobe) -> Result<(), String> {
    for node in wardrobe.accessory_ids() {
        let Some(acc) = wardrobe.accessory(node) else {
            continue;
        };
        if !acc.status().is_attached() && acc.current_coverage() != BodyCoverage::NONE {
            return Err(format!("{:?}: {:?} with coverage {}", node, acc.status(), acc.current_coverage()));
        }
        let tracked_by: Vec<Entity> = wardrobe
            .outfit_ids()
            .into_iter()
            .filter(|o| wardrobe.outfit(*o).is_some_and(|outfit| outfit.is_tracked(node)))
            .collect();
        if tracked_by.len() > 1 {
            return Err(format!("{:?}: tracked by several outfits {:?}", node, tracked_by));
        }
        if let Some(outfit) = tracked_by.first() {
            if !acc.status().is_attached() || acc.owner() != Owner::Outfit(*outfit) {
                return Err(format!("{:?}: tracked by {:?} but {:?}/{:?}", node, outfit, acc.status(), acc.owner()));
            }
        }
    }

    for outfit in wardrobe.outfit_ids() {
        let Some(target) = wardrobe.outfit(outfit) else {
            continue;
        };
        let mut occupied = target.coverage_blocks();
        for accessory in target.accessories() {
            let coverage = wardrobe
                .accessory(*accessory)
                .map(|a| a.current_coverage())
                .unwrap_or(BodyCoverage::NONE);
            // Limited outfit пропускает ignore_limited accessory, но coverage всё равно проверяется
            if occupied.intersects(coverage) {
                return Err(format!("{:?}: coverage overlap on {:?} ({})", accessory, outfit, occupied & coverage));
            }
            occupied |= coverage;
        }
        if occupied != wardrobe.outfit_coverage(outfit) {
            return Err(format!("{:?}: coverage mismatch", outfit));
        }
    }

    for body in wardrobe.body_ids() {
        let Some(b) = wardrobe.body(body) else {
            continue;
        };
        for info in b.accessories().iter() {
            let Some(acc) = wardrobe.accessory(info.accessory) else {
                return Err(format!("{:?}: manager tracks unknown {:?}", body, info.accessory));
            };
            let consistent = match acc.owner() {
                Owner::Manager(owner) => owner == body,
                Owner::Outfit(outfit) => b.outfit() == Some(outfit) && acc.status().is_attached(),
                Owner::None => false,
            };
            if !consistent {
                return Err(format!("{:?}: manager entry {:?} owned by {:?}", body, info.accessory, acc.owner()));
            }
        }
    }

    Ok(())
}
