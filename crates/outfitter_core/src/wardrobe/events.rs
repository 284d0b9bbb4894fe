//! Wardrobe notifications
//!
//! # Architecture
//!
//! Каждая операция кладёт `Notification` в outbox, после операции
//! `Wardrobe::flush` раздаёт их подписчикам в FIFO порядке:
//! - accessory notifications → подписчики accessory (outfit, manager, external)
//! - outfit notifications → подписчики outfit'а (body, external)
//! - body notifications → external body observers
//!
//! Всё, что раздали, дополнительно публикуется для Bevy слоя (`WardrobeEvent`).

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::accessory::{AccessoryStatus, DestroyType};
use crate::components::{MountPointType, Owner};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification {
    /// Изменились status / owner / location accessory
    AccessoryStateChanged {
        accessory: Entity,
        status: AccessoryStatus,
        owner: Owner,
        location: Option<MountPointType>,
    },
    /// Accessory будет уничтожен (ещё до teardown)
    AccessoryDestroying {
        accessory: Entity,
        destroy_type: DestroyType,
    },
    OutfitAccessoryMounted {
        outfit: Entity,
        accessory: Entity,
    },
    OutfitAccessoryReleased {
        outfit: Entity,
        accessory: Entity,
    },
    /// Outfit будет уничтожен (ещё до teardown)
    OutfitDestroying {
        outfit: Entity,
    },
    /// Pre-change: body сейчас сменит outfit
    BodyOutfitChanging {
        body: Entity,
        previous: Option<Entity>,
        next: Option<Entity>,
    },
    /// Post-change: body сменил outfit
    BodyOutfitChanged {
        body: Entity,
        previous: Option<Entity>,
        current: Option<Entity>,
    },
}

pub type Outbox = VecDeque<Notification>;

/// Bevy event: notification, прошедшая через wardrobe
#[derive(Event, Debug, Clone)]
pub struct WardrobeEvent(pub Notification);
