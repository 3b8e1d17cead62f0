//! Ship coordinate frames
//!
//! Each ship carries four transforms: the current and previous physics substep
//! results, and the current and previous poses committed at host game ticks.

pub mod anchor;
pub mod ship_transform;
pub mod transform_manager;

pub use anchor::ShipAnchor;
pub use ship_transform::{ShipTransform, TransformType};
pub use transform_manager::{TransformManager, TransformSelector};
