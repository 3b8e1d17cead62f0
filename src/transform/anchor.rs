use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::{ShipTransform, TransformType};
use crate::ship::ShipId;

/// Position held relative to a ship, for mounted or dragged entities
///
/// The entity keeps this value instead of a global position and resolves it
/// against whatever transform the caller has at hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipAnchor {
    pub ship: ShipId,
    /// Subspace position
    pub local_offset: DVec3,
}

impl ShipAnchor {
    pub fn new(ship: ShipId, local_offset: DVec3) -> Self {
        Self { ship, local_offset }
    }

    /// Anchor at the subspace point currently under `global`
    pub fn from_global(ship: ShipId, global: DVec3, transform: &ShipTransform) -> Self {
        Self::new(ship, transform.transform_position(global, TransformType::GlobalToSubspace))
    }

    pub fn to_global(&self, transform: &ShipTransform) -> DVec3 {
        transform.transform_position(self.local_offset, TransformType::SubspaceToGlobal)
    }

    /// Same ship, offset moved by a global-space displacement
    pub fn moved_by(&self, global_delta: DVec3, transform: &ShipTransform) -> Self {
        let local_delta = transform.transform_direction(global_delta, TransformType::GlobalToSubspace);
        Self::new(self.ship, self.local_offset + local_delta)
    }
}
