use glam::DVec3;

/// Velocities and the physics switch as last written by the integrator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipMotion {
    pub linear_velocity: DVec3,
    pub angular_velocity: DVec3,
    pub physics_enabled: bool,
}

impl Default for ShipMotion {
    fn default() -> Self {
        Self {
            linear_velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            physics_enabled: true,
        }
    }
}

/// Deconstruction lifecycle
///
/// ```text
/// Normal --request--> AligningToGrid --angle < epsilon--> GridAligned
/// Normal | AligningToGrid --immediate--> DeconstructImmediate
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeconstructionState {
    #[default]
    Normal,
    AligningToGrid,
    /// Aligned and waiting for the host to remove the ship
    GridAligned,
    /// Removed by the scheduler on its next pass
    DeconstructImmediate,
}

impl DeconstructionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GridAligned | Self::DeconstructImmediate)
    }

    /// State after an external deconstruction request; terminal states never change
    pub fn after_request(self, immediate: bool) -> Self {
        match (self, immediate) {
            (Self::Normal | Self::AligningToGrid, true) => Self::DeconstructImmediate,
            (Self::Normal, false) => Self::AligningToGrid,
            (state, _) => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use DeconstructionState::*;

        assert_eq!(Normal.after_request(false), AligningToGrid);
        assert_eq!(AligningToGrid.after_request(false), AligningToGrid);
        assert_eq!(Normal.after_request(true), DeconstructImmediate);
        assert_eq!(AligningToGrid.after_request(true), DeconstructImmediate);
        assert_eq!(GridAligned.after_request(true), GridAligned);
        assert_eq!(DeconstructImmediate.after_request(false), DeconstructImmediate);
    }
}
