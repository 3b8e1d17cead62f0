//! Rigid-body physics for voxel ships
//!
//! A ship is a set of voxels built inside a private claim of chunk columns in
//! the shipyard region. The crate tracks each ship's mass distribution as
//! voxels change, integrates its motion on a per-world physics thread, and
//! exposes the pose through double-buffered transforms that the host reads on
//! its own game tick.

pub mod claim;
pub mod config;
pub mod constants;
pub mod error;
pub mod inertia;
pub mod persistence;
pub mod physics;
pub mod scheduler;
pub mod ship;
pub mod transform;
pub mod world;

pub use claim::{ChunkClaim, ClaimedChunkCache, ShipyardAllocator, VoxelColumn};
pub use config::PhysicsConfig;
pub use error::{ShipError, ShipResult};
pub use inertia::{InertiaData, InertiaModel};
pub use persistence::{PersistenceError, ShipSaveData, ShipyardIndex};
pub use physics::{
    BlockPhysics, BlockPhysicsRegistry, ControlInput, PilotInput, PointForce, ProviderContext, ProviderError,
    RigidBodyIntegrator, SubstepOutcome, VoxelForceProvider, VoxelTorqueProvider,
};
pub use scheduler::{HostHooks, PhysicsEvent, PhysicsScheduler, PhysicsWorlds, ShipWorld};
pub use ship::{DeconstructionState, ShipHandle, ShipId, ShipMotion};
pub use transform::{ShipAnchor, ShipTransform, TransformManager, TransformSelector, TransformType};
pub use world::{Aabb, BlockId, ChunkPos, VoxelPos, VoxelQuery, WorldId};
