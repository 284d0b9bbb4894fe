//! Owner: кто сейчас отвечает за accessory

use bevy::prelude::*;

/// Typed owner handle
///
/// Инвариант: у accessory ровно один owner. Новый `mount`/`store`
/// атомарно заменяет предыдущего.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum Owner {
    #[default]
    None,
    /// Outfit (entity outfit'а)
    Outfit(Entity),
    /// AccessoryManager body (entity body)
    Manager(Entity),
}

impl Owner {
    pub fn is_none(&self) -> bool {
        matches!(self, Owner::None)
    }
}
