use crate::ship::ShipHandle;
use crate::transform::ShipTransform;

/// Host callbacks at the simulation boundary
///
/// Called on the host thread from `ShipWorld`. Every method defaults to a no-op.
pub trait HostHooks: Send + Sync {
    fn on_ship_loaded(&self, _ship: &ShipHandle) {}

    fn on_ship_unloaded(&self, _ship: &ShipHandle) {}

    /// The game-tick transform of `ship` was just committed
    fn on_game_tick_committed(&self, _ship: &ShipHandle, _transform: &ShipTransform) {}
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl HostHooks for NoHooks {}
