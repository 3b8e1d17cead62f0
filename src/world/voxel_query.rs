use super::{BlockId, VoxelPos};

/// Read-only voxel lookup
///
/// Implemented by the ship's claimed chunk cache; force providers receive one
/// so they can look at neighbouring voxels.
pub trait VoxelQuery: Send + Sync {
    /// Block at the position, `BlockId::AIR` when nothing is there
    fn block_at(&self, pos: VoxelPos) -> BlockId;

    /// Whether the voxel takes part in mass and collision
    fn is_solid(&self, pos: VoxelPos) -> bool {
        !self.block_at(pos).is_air()
    }
}

/// Query that answers air everywhere
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyVoxels;

impl VoxelQuery for EmptyVoxels {
    fn block_at(&self, _pos: VoxelPos) -> BlockId {
        BlockId::AIR
    }
}
