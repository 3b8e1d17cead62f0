//! World-side vocabulary shared by every ship subsystem
//!
//! Positions, block identifiers and the read-only voxel query the core
//! consumes from its host.

pub mod block;
pub mod position;
pub mod voxel_query;

pub use block::BlockId;
pub use position::{Aabb, ChunkPos, VoxelPos, WorldId};
pub use voxel_query::{EmptyVoxels, VoxelQuery};
