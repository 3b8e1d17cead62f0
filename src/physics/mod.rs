//! Rigid-body physics for ships
//!
//! Forces are gathered per substep from gravity, voxel providers and pilot input,
//! then integrated by `RigidBodyIntegrator`. Voxel providers return impulses
//! for the substep and receive `dt` to scale them; pilot input is a rate that
//! the integrator scales.

pub mod forces;
pub mod grid_alignment;
pub mod integrator;
pub mod pilot;
pub mod registry;

pub use forces::{
    ForceAccumulator, PointForce, ProviderContext, ProviderError, VoxelForceProvider, VoxelTorqueProvider,
};
pub use grid_alignment::{grid_orientations, nearest_grid_orientation, remaining_rotation};
pub use integrator::{RigidBodyIntegrator, SubstepOutcome};
pub use pilot::{ControlInput, LatchedPilotInput, PilotInput};
pub use registry::{BlockPhysics, BlockPhysicsRegistry};
