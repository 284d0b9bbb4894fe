//! BodyCoverage: 32-битный набор регионов тела
//!
//! Accessory занимает регионы пока смонтирован (Mounting/Mounted).
//! Effective coverage outfit'а = `coverage_blocks | ⋃(accessory.current_coverage)`.
//! Пересечение candidate coverage с effective coverage → `CoverageBlocked`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Body regions (последние 8 бит зарезервированы под custom регионы)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BodyCoverage: u32 {
        const HEAD       = 1 << 0;
        const HAIR       = 1 << 1;
        const FACE       = 1 << 2;
        const EYES       = 1 << 3;
        const EARS       = 1 << 4;
        const NECK       = 1 << 5;
        const CHEST      = 1 << 6;
        const BACK       = 1 << 7;
        const SHOULDERS  = 1 << 8;
        const UPPER_ARMS = 1 << 9;
        const LOWER_ARMS = 1 << 10;
        const LEFT_HAND  = 1 << 11;
        const RIGHT_HAND = 1 << 12;
        const WAIST      = 1 << 13;
        const HIPS       = 1 << 14;
        const UPPER_LEGS = 1 << 15;
        const LOWER_LEGS = 1 << 16;
        const LEFT_FOOT  = 1 << 17;
        const RIGHT_FOOT = 1 << 18;
        const TAIL       = 1 << 19;

        const CUSTOM_1   = 1 << 24;
        const CUSTOM_2   = 1 << 25;
        const CUSTOM_3   = 1 << 26;
        const CUSTOM_4   = 1 << 27;
        const CUSTOM_5   = 1 << 28;
        const CUSTOM_6   = 1 << 29;
        const CUSTOM_7   = 1 << 30;
        const CUSTOM_8   = 1 << 31;

        const HANDS = Self::LEFT_HAND.bits() | Self::RIGHT_HAND.bits();
        const FEET  = Self::LEFT_FOOT.bits() | Self::RIGHT_FOOT.bits();
    }
}

impl BodyCoverage {
    /// Пустое покрытие (Stored/Unmanaged accessory)
    pub const NONE: Self = Self::empty();

    /// Custom регион по индексу (1-8)
    pub fn custom(index: u8) -> Option<Self> {
        match index {
            1..=8 => Self::from_bits(1 << (23 + index as u32)),
            _ => None,
        }
    }

    /// Union произвольного набора покрытий
    pub fn union_all<I: IntoIterator<Item = BodyCoverage>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, |acc, c| acc | c)
    }
}

impl fmt::Display for BodyCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{}", name)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_regions() {
        assert_eq!(BodyCoverage::custom(1), Some(BodyCoverage::CUSTOM_1));
        assert_eq!(BodyCoverage::custom(8), Some(BodyCoverage::CUSTOM_8));
        assert_eq!(BodyCoverage::custom(0), None);
        assert_eq!(BodyCoverage::custom(9), None);
    }

    #[test]
    fn test_union_and_intersection() {
        let union = BodyCoverage::union_all([BodyCoverage::HAIR, BodyCoverage::EYES]);
        assert!(union.contains(BodyCoverage::HAIR));
        assert!(union.intersects(BodyCoverage::EYES | BodyCoverage::CHEST));
        assert!(!union.intersects(BodyCoverage::HANDS));
        assert_eq!(BodyCoverage::union_all([]), BodyCoverage::NONE);
    }

    #[test]
    fn test_display() {
        assert_eq!(BodyCoverage::NONE.to_string(), "NONE");
        assert_eq!((BodyCoverage::HEAD | BodyCoverage::HAIR).to_string(), "HEAD|HAIR");
    }
}
