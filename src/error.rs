//! Crate-wide error handling
//!
//! Every fallible operation in the ship core returns `ShipResult`. Numerical
//! instability and provider failures are recovered locally and never surface
//! here; what remains are programmer-facing contract violations and lifecycle
//! errors.

use crate::persistence::PersistenceError;
use crate::ship::ShipId;
use crate::world::{VoxelPos, WorldId};

/// Result type for ship operations
pub type ShipResult<T> = Result<T, ShipError>;

/// Errors raised by the ship physics core
#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    #[error("Chunk ({x}, {z}) is not inside the claim centered at ({center_x}, {center_z}) with radius {radius}")]
    ChunkNotInClaim {
        x: i32,
        z: i32,
        center_x: i32,
        center_z: i32,
        radius: i32,
    },

    #[error("Voxel {pos:?} lies outside the claim of ship {ship}")]
    VoxelOutsideClaim { ship: ShipId, pos: VoxelPos },

    #[error("Claim radius cannot shrink from {current} to {requested}")]
    ClaimShrink { current: i32, requested: i32 },

    #[error("Claim radius {requested} exceeds the maximum of {max}")]
    ClaimTooLarge { requested: i32, max: i32 },

    #[error("Ship {0} not found")]
    ShipNotFound(ShipId),

    #[error("Ship {0} is already loaded")]
    ShipAlreadyLoaded(ShipId),

    #[error("World {0} is not loaded")]
    WorldNotLoaded(WorldId),

    #[error("World {0} is already loaded")]
    WorldAlreadyLoaded(WorldId),

    #[error("Invalid physics configuration: {0}")]
    InvalidConfig(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl ShipError {
    /// Whether this error is a claim bounds violation
    pub fn is_bounds_violation(&self) -> bool {
        matches!(
            self,
            ShipError::ChunkNotInClaim { .. } | ShipError::VoxelOutsideClaim { .. }
        )
    }
}
