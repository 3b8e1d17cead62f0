use std::fmt::Display;
use std::sync::Arc;

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::claim::{ChunkClaim, ClaimedChunkCache, VoxelColumn};
use crate::constants::persistence_constants::ROTATION_NORM_TOLERANCE;
use crate::physics::BlockPhysicsRegistry;
use crate::ship::{ShipHandle, ShipId, ShipMotion, ShipParts};
use crate::transform::{ShipTransform, TransformSelector};
use crate::world::ChunkPos;

/// Stored orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PersistedRotation {
    /// `[x, y, z, w]`
    Quaternion([f64; 4]),
    /// Row-major 3×3 rotation matrix
    Matrix([f64; 9]),
}

impl PersistedRotation {
    pub fn from_quat(rotation: DQuat) -> Self {
        PersistedRotation::Quaternion(rotation.to_array())
    }

    pub fn matrix_from_quat(rotation: DQuat) -> Self {
        // column-major transposed is row-major
        PersistedRotation::Matrix(DMat3::from_quat(rotation).transpose().to_cols_array())
    }

    /// Unit quaternion, or why the stored value is not a rotation
    pub fn to_quat(&self) -> Result<DQuat, String> {
        match self {
            PersistedRotation::Quaternion(q) => {
                let rotation = DQuat::from_array(*q);
                if !rotation.is_finite() {
                    return Err("quaternion has non-finite components".to_string());
                }
                let norm = rotation.length();
                if (norm - 1.0).abs() > ROTATION_NORM_TOLERANCE {
                    return Err(format!("quaternion norm {} is not 1", norm));
                }
                Ok(rotation / norm)
            }
            PersistedRotation::Matrix(rows) => {
                if rows.iter().any(|v| !v.is_finite()) {
                    return Err("matrix has non-finite components".to_string());
                }
                let matrix = DMat3::from_cols_array(rows).transpose();
                let det = matrix.determinant();
                if (det - 1.0).abs() > ROTATION_NORM_TOLERANCE {
                    return Err(format!("matrix determinant {} is not 1", det));
                }
                let drift = (matrix.transpose() * matrix - DMat3::IDENTITY)
                    .to_cols_array()
                    .iter()
                    .fold(0.0f64, |acc, v| acc.max(v.abs()));
                if drift > ROTATION_NORM_TOLERANCE {
                    return Err(format!("matrix is not orthonormal (drift {})", drift));
                }
                Ok(DQuat::from_mat3(&matrix).normalize())
            }
        }
    }
}

/// Everything stored for one ship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipSaveData {
    pub id: ShipId,
    pub name: String,
    pub position: [f64; 3],
    pub rotation: PersistedRotation,
    pub center_of_mass: [f64; 3],
    pub linear_velocity: [f64; 3],
    pub angular_velocity: [f64; 3],
    pub claim: ChunkClaim,
    pub physics_enabled: bool,
}

impl ShipSaveData {
    /// Snapshot of the committed game-tick state
    pub fn capture(ship: &ShipHandle) -> Self {
        let transform = ship.transform(TransformSelector::GameTick);
        let motion = ship.motion();
        Self {
            id: ship.id(),
            name: ship.name().to_string(),
            position: transform.position().to_array(),
            rotation: PersistedRotation::from_quat(transform.rotation()),
            center_of_mass: transform.center_of_mass().to_array(),
            linear_velocity: motion.linear_velocity.to_array(),
            angular_velocity: motion.angular_velocity.to_array(),
            claim: ship.claim(),
            physics_enabled: motion.physics_enabled,
        }
    }

    /// Validated transform, or why it cannot be used
    pub fn transform(&self) -> Result<ShipTransform, String> {
        let position = DVec3::from_array(self.position);
        let center_of_mass = DVec3::from_array(self.center_of_mass);
        if !position.is_finite() {
            return Err("position is not finite".to_string());
        }
        if !center_of_mass.is_finite() {
            return Err("center of mass is not finite".to_string());
        }
        let rotation = self.rotation.to_quat()?;
        Ok(ShipTransform::new(position, rotation, center_of_mass))
    }

    /// Stored motion; non-finite velocities come back as zero
    pub fn motion(&self) -> ShipMotion {
        let linear = DVec3::from_array(self.linear_velocity);
        let angular = DVec3::from_array(self.angular_velocity);
        if linear.is_finite() && angular.is_finite() {
            ShipMotion {
                linear_velocity: linear,
                angular_velocity: angular,
                physics_enabled: self.physics_enabled,
            }
        } else {
            log::warn!("Ship {} had non-finite stored velocities; zeroing them", self.id);
            ShipMotion {
                physics_enabled: self.physics_enabled,
                ..ShipMotion::default()
            }
        }
    }

    /// Rebuild the ship, pulling every claimed column from `loader`
    ///
    /// A malformed transform falls back to an unrotated pose at the recomputed
    /// center of mass and is reported as a warning; the ship still loads.
    pub fn restore<F, E>(&self, registry: Arc<BlockPhysicsRegistry>, loader: F) -> ShipHandle
    where
        F: FnMut(ChunkPos) -> Result<VoxelColumn, E>,
        E: Display,
    {
        let transform = match self.transform() {
            Ok(transform) => Some(transform),
            Err(reason) => {
                log::warn!(
                    "Ship {} ({}) has a malformed transform ({}); resetting to identity",
                    self.id,
                    self.name,
                    reason
                );
                None
            }
        };

        ShipHandle::from_parts(
            ShipParts {
                id: self.id,
                name: self.name.clone(),
                chunks: ClaimedChunkCache::load(self.claim, loader),
                transform,
                motion: self.motion(),
            },
            registry,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_3;

    #[test]
    fn test_matrix_and_quaternion_agree() {
        let rotation = DQuat::from_rotation_x(FRAC_PI_3) * DQuat::from_rotation_z(0.4);
        let from_quat = PersistedRotation::from_quat(rotation).to_quat().expect("valid");
        let from_matrix = PersistedRotation::matrix_from_quat(rotation).to_quat().expect("valid");

        assert!(from_quat.dot(rotation).abs() > 1.0 - 1e-12);
        assert!(from_matrix.dot(rotation).abs() > 1.0 - 1e-12);
    }

    #[test]
    fn test_row_major_layout() {
        let quarter_turn = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2);
        let PersistedRotation::Matrix(rows) = PersistedRotation::matrix_from_quat(quarter_turn) else {
            panic!("expected matrix");
        };
        // first row of Rz(90°) is [0, -1, 0]
        assert!(rows[0].abs() < 1e-12);
        assert!((rows[1] + 1.0).abs() < 1e-12);
        assert!(rows[2].abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_rotations() {
        assert!(PersistedRotation::Quaternion([0.0, 0.0, 0.0, 0.0]).to_quat().is_err());
        assert!(PersistedRotation::Quaternion([f64::NAN, 0.0, 0.0, 1.0]).to_quat().is_err());
        let scaled = [2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0];
        assert!(PersistedRotation::Matrix(scaled).to_quat().is_err());
        let mirrored = [-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        assert!(PersistedRotation::Matrix(mirrored).to_quat().is_err());
    }
}
