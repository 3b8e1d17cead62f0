use crate::ship::ShipId;

/// Why a ship left its world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Deconstructed,
    Unloaded,
}

/// Reported by the physics thread, drained by the host on its game tick
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsEvent {
    ShipFrozen {
        ship: ShipId,
        linear_speed_sq: f64,
        angular_speed_sq: f64,
    },
    GridAligned {
        ship: ShipId,
    },
    ShipRemoved {
        ship: ShipId,
        reason: RemovalReason,
    },
}
