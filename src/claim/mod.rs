//! Chunk claims and the per-ship claimed chunk cache

pub mod chunk_cache;
pub mod chunk_claim;
pub mod shipyard;
pub mod voxel_column;

pub use chunk_cache::ClaimedChunkCache;
pub use chunk_claim::ChunkClaim;
pub use shipyard::{is_chunk_in_shipyard, ShipyardAllocator};
pub use voxel_column::{ClaimedColumn, VoxelColumn};
