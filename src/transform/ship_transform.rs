use glam::{DAffine3, DMat3, DQuat, DVec3};

/// Direction of a coordinate conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformType {
    SubspaceToGlobal,
    GlobalToSubspace,
}

/// Pose of a ship's subspace frame in the global frame
///
/// `position` is where the subspace center of mass sits in global space, so a
/// subspace point `p` maps to `position + R·(p − center_of_mass)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipTransform {
    position: DVec3,
    rotation: DQuat,
    center_of_mass: DVec3,
}

impl Default for ShipTransform {
    fn default() -> Self {
        Self::identity_at(DVec3::ZERO)
    }
}

impl ShipTransform {
    /// Rotation is normalized; a degenerate rotation becomes identity
    pub fn new(position: DVec3, rotation: DQuat, center_of_mass: DVec3) -> Self {
        Self {
            position,
            rotation: normalize_rotation(rotation),
            center_of_mass,
        }
    }

    /// Unrotated transform that leaves the center of mass where it is
    pub fn identity_at(center_of_mass: DVec3) -> Self {
        Self {
            position: center_of_mass,
            rotation: DQuat::IDENTITY,
            center_of_mass,
        }
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    pub fn center_of_mass(&self) -> DVec3 {
        self.center_of_mass
    }

    pub fn rotation_matrix(&self) -> DMat3 {
        DMat3::from_quat(self.rotation)
    }

    pub fn subspace_to_global(&self) -> DAffine3 {
        DAffine3::from_translation(self.position)
            * DAffine3::from_quat(self.rotation)
            * DAffine3::from_translation(-self.center_of_mass)
    }

    pub fn global_to_subspace(&self) -> DAffine3 {
        DAffine3::from_translation(self.center_of_mass)
            * DAffine3::from_quat(self.rotation.inverse())
            * DAffine3::from_translation(-self.position)
    }

    pub fn matrix(&self, kind: TransformType) -> DAffine3 {
        match kind {
            TransformType::SubspaceToGlobal => self.subspace_to_global(),
            TransformType::GlobalToSubspace => self.global_to_subspace(),
        }
    }

    pub fn transform_position(&self, pos: DVec3, kind: TransformType) -> DVec3 {
        match kind {
            TransformType::SubspaceToGlobal => self.position + self.rotation * (pos - self.center_of_mass),
            TransformType::GlobalToSubspace => {
                self.center_of_mass + self.rotation.inverse() * (pos - self.position)
            }
        }
    }

    pub fn transform_direction(&self, dir: DVec3, kind: TransformType) -> DVec3 {
        match kind {
            TransformType::SubspaceToGlobal => self.rotation * dir,
            TransformType::GlobalToSubspace => self.rotation.inverse() * dir,
        }
    }

    pub fn with_position(&self, position: DVec3) -> Self {
        Self { position, ..*self }
    }

    pub fn with_rotation(&self, rotation: DQuat) -> Self {
        Self::new(self.position, rotation, self.center_of_mass)
    }

    /// Move the center of mass in subspace without moving the ship in global space
    pub fn with_center_of_mass(&self, center_of_mass: DVec3) -> Self {
        let shift = self.rotation * (center_of_mass - self.center_of_mass);
        Self {
            position: self.position + shift,
            rotation: self.rotation,
            center_of_mass,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.center_of_mass.is_finite()
    }

    /// Blend toward `other`; `alpha` 0 is `self`, 1 is `other`
    pub fn interpolate(&self, other: &ShipTransform, alpha: f64) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        Self::new(
            self.position.lerp(other.position, alpha),
            self.rotation.slerp(other.rotation, alpha),
            self.center_of_mass.lerp(other.center_of_mass, alpha),
        )
    }
}

fn normalize_rotation(rotation: DQuat) -> DQuat {
    let length = rotation.length();
    if !length.is_finite() || length <= f64::EPSILON {
        DQuat::IDENTITY
    } else {
        rotation / length
    }
}
