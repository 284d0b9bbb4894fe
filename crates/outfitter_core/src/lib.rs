//! Outfitter Core
//!
//! Accessory mounting / coverage state machine поверх Bevy 0.16.
//!
//! Слои (leaf-first):
//! - components: MountPoint, BodyPart, BodyCoverage, Owner
//! - mounting: AccessoryMounter стратегии (snap, easing)
//! - accessory: state machine одного accessory
//! - outfit: mount authority (restrictions, coverage)
//! - body: текущий outfit + AccessoryManager (persistence между swap'ами)
//! - wardrobe: arena + dispatch + Bevy plugin
//!
//! Host (иерархия трансформов, коллайдеры) подключается через `SceneHost`.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod accessory;
pub mod body;
pub mod components;
pub mod config;
pub mod demo;
pub mod logger;
pub mod mounting;
pub mod outfit;
pub mod scene;
pub mod wardrobe;

// Re-exports для удобства
pub use accessory::{Accessory, AccessorySettings, AccessoryStatus, DestroyType};
pub use body::{AccessoryManager, AccessoryMountInfo, Body};
pub use components::*;
pub use config::OutfitterConfig;
pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel};
pub use mounting::{
    AccessoryMounter, EasingMounter, LocationTarget, LocationTargets, MountSpace, MounterId, MounterRegistry,
    NormalizedCurve, SnapMounter,
};
pub use outfit::{MountResult, Outfit, OutfitDefinition};
pub use scene::SceneHost;
pub use wardrobe::{
    AccessoryObserver, BodyObserver, Notification, ObserverId, OutfitObserver, OutfitterPlugin, Wardrobe,
    WardrobeEvent, WardrobeWorldExt, wardrobe_tick_system,
};

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App с wardrobe (без рендера)
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .add_plugins(OutfitterPlugin);

    app
}

/// Snapshot wardrobe для сравнения детерминизма
///
/// Debug-представление состояния, отсортированное по Entity.
pub fn wardrobe_snapshot(wardrobe: &Wardrobe) -> Vec<u8> {
    let mut snapshot = Vec::new();

    for node in wardrobe.accessory_ids() {
        if let Some(acc) = wardrobe.accessory(node) {
            snapshot.extend_from_slice(&node.index().to_le_bytes());
            snapshot.extend_from_slice(
                format!(
                    "{:?}{:?}{:?}{}",
                    acc.status(),
                    acc.owner(),
                    acc.current_location().map(|l| (l.location_type, l.node)),
                    acc.current_coverage().bits()
                )
                .as_bytes(),
            );
        }
    }

    for node in wardrobe.outfit_ids() {
        if let Some(outfit) = wardrobe.outfit(node) {
            snapshot.extend_from_slice(&node.index().to_le_bytes());
            snapshot.extend_from_slice(format!("{:?}{:?}", outfit.owner(), outfit.accessories()).as_bytes());
        }
    }

    for node in wardrobe.body_ids() {
        if let Some(body) = wardrobe.body(node) {
            snapshot.extend_from_slice(&node.index().to_le_bytes());
            let entries: Vec<_> = body.accessories().iter().collect();
            snapshot.extend_from_slice(format!("{:?}{:?}", body.outfit(), entries).as_bytes());
        }
    }

    snapshot
}
