//! Data model outfitter core
//!
//! Организация:
//! - coverage: BodyCoverage (bitset регионов тела)
//! - mount_point: MountPointType, MountPoint
//! - body_part: BodyPartType, ColliderStatus, BodyPart
//! - owner: Owner (typed owner handle)

pub mod body_part;
pub mod coverage;
pub mod mount_point;
pub mod owner;

// Re-exports для удобного импорта
pub use body_part::*;
pub use coverage::*;
pub use mount_point::*;
pub use owner::*;
