//! Bevy integration: plugin + frame system
//!
//! Wardrobe живёт как `Resource`, host'ом для mounter'ов выступает сам `World`
//! (через `resource_scope`). Каждый кадр:
//! 1. deferred purge pass (если включён в `OutfitterConfig`)
//! 2. `Wardrobe::tick` с `Time::delta_secs`
//! 3. всё, что прошло dispatch, уходит в `Events<WardrobeEvent>`

use bevy::prelude::*;

use super::{Wardrobe, WardrobeEvent, WardrobeWorldExt};
use crate::config::OutfitterConfig;
use crate::logger::{log, set_log_level};

pub struct OutfitterPlugin;

impl Plugin for OutfitterPlugin {
    fn build(&self, app: &mut App) {
        // Config, вставленный до plugin'а, не перезаписываем
        app.init_resource::<OutfitterConfig>();
        if let Some(config) = app.world().get_resource::<OutfitterConfig>() {
            set_log_level(config.log_level);
        }

        app.init_resource::<Wardrobe>()
            .add_event::<WardrobeEvent>()
            .add_systems(Update, wardrobe_tick_system);
        // Notifications drain'ит wardrobe_tick_system каждый кадр
        app.world_mut().resource_mut::<Wardrobe>().set_publishing(true);

        log("OutfitterPlugin: wardrobe registered");
    }
}

/// Exclusive system: wardrobe мутирует иерархию трансформов напрямую
pub fn wardrobe_tick_system(world: &mut World) {
    let delta_secs = world
        .get_resource::<Time>()
        .map(|time| time.delta_secs())
        .unwrap_or(0.0);
    let purge = world
        .get_resource::<OutfitterConfig>()
        .is_some_and(|config| config.purge_stale_every_tick);

    let published = world.wardrobe_scope(|wardrobe: &mut Wardrobe, world| {
        if purge {
            wardrobe.purge_stale(world);
        }
        wardrobe.tick(world, delta_secs);
        wardrobe.drain_published()
    });

    for notification in published {
        world.send_event(WardrobeEvent(notification));
    }
}
