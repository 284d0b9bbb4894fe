//! Runtime конфигурация outfitter core

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::logger::LogLevel;

/// Параметры wardrobe (logging, easing defaults, purge policy)
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct OutfitterConfig {
    /// Минимальный уровень логов
    pub log_level: LogLevel,
    /// Длительность easing mount по умолчанию (секунды)
    pub default_ease_duration: f32,
    /// Запускать deferred purge pass каждый tick
    pub purge_stale_every_tick: bool,
}

impl Default for OutfitterConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            default_ease_duration: 0.25,
            purge_stale_every_tick: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OutfitterConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.default_ease_duration, 0.25);
        assert!(config.purge_stale_every_tick);
    }
}
