//! Force and torque contributions for one substep

use glam::DVec3;
use thiserror::Error;

use crate::transform::{ShipTransform, TransformType};
use crate::world::{BlockId, VoxelPos, VoxelQuery};

/// Failure inside a single voxel's provider; only that voxel is skipped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider failed: {0}")]
    Failed(String),

    #[error("Provider returned non-finite {0}")]
    NonFinite(&'static str),
}

/// Force and torque impulses collected during one substep
///
/// Forces are in the global frame; torques are about the center of mass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceAccumulator {
    force: DVec3,
    torque: DVec3,
}

impl ForceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force through the center of mass
    pub fn add_force(&mut self, force: DVec3) {
        self.force += force;
    }

    /// `lever` is the application point minus the center of mass, in global orientation
    pub fn add_force_at_point(&mut self, force: DVec3, lever: DVec3) {
        self.torque += lever.cross(force);
        self.force += force;
    }

    pub fn add_torque(&mut self, torque: DVec3) {
        self.torque += torque;
    }

    pub fn force(&self) -> DVec3 {
        self.force
    }

    pub fn torque(&self) -> DVec3 {
        self.torque
    }

    pub fn take_torque(&mut self) -> DVec3 {
        std::mem::replace(&mut self.torque, DVec3::ZERO)
    }

    /// Returns `(force, torque)` and zeroes both
    pub fn take(&mut self) -> (DVec3, DVec3) {
        let taken = (self.force, self.torque);
        self.clear();
        taken
    }

    pub fn clear(&mut self) {
        self.force = DVec3::ZERO;
        self.torque = DVec3::ZERO;
    }
}

/// Force from one voxel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointForce {
    /// Impulse for the substep, global frame
    pub force: DVec3,
    /// Subspace application point; the voxel center when `None`
    pub point: Option<DVec3>,
}

impl PointForce {
    pub fn at_center(force: DVec3) -> Self {
        Self { force, point: None }
    }

    pub fn at_point(force: DVec3, point: DVec3) -> Self {
        Self {
            force,
            point: Some(point),
        }
    }
}

/// What a provider can see while computing its contribution
pub struct ProviderContext<'a> {
    pub voxel: VoxelPos,
    pub block: BlockId,
    pub dt: f64,
    /// Physics transform at the start of the substep
    pub transform: &'a ShipTransform,
    pub linear_velocity: DVec3,
    pub angular_velocity: DVec3,
    pub mass: f64,
    pub voxels: &'a dyn VoxelQuery,
}

impl ProviderContext<'_> {
    /// Voxel center in global space
    pub fn voxel_center_global(&self) -> DVec3 {
        self.transform
            .transform_position(self.voxel.center(), TransformType::SubspaceToGlobal)
    }

    /// Global velocity of the voxel center
    pub fn voxel_velocity(&self) -> DVec3 {
        let lever = self.voxel_center_global() - self.transform.position();
        self.angular_velocity.cross(lever) + self.linear_velocity
    }

    /// Voxel-local direction rotated into the global frame
    pub fn to_global_direction(&self, local: DVec3) -> DVec3 {
        self.transform.transform_direction(local, TransformType::SubspaceToGlobal)
    }
}

/// Per-block force contribution, e.g. engines or balloons
pub trait VoxelForceProvider: Send + Sync {
    /// Lower runs first; ties are broken by voxel position
    fn priority(&self) -> i32 {
        0
    }

    fn force_at(&self, ctx: &ProviderContext<'_>) -> Result<Option<PointForce>, ProviderError>;
}

/// Per-block torque contribution, e.g. gyroscopes or stabilizers
///
/// Torque accumulated so far is folded into the angular velocity before each
/// call, so `ctx.angular_velocity` reflects every earlier contribution.
pub trait VoxelTorqueProvider: Send + Sync {
    fn priority(&self) -> i32 {
        0
    }

    /// Impulse for the substep, global frame, about the center of mass
    fn torque_at(&self, ctx: &ProviderContext<'_>) -> Result<Option<DVec3>, ProviderError>;
}
