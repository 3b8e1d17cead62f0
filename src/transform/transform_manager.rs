use glam::DVec3;

use super::{ShipTransform, TransformType};

/// Which of a ship's transform pairs a conversion should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformSelector {
    /// Latest physics substep result
    Physics,
    /// Pose committed at the last host game tick
    GameTick,
}

/// Current and previous transforms for both the physics and game-tick timelines
///
/// Every install copies current into previous first, so interpolation always
/// has both endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformManager {
    current_physics: ShipTransform,
    previous_physics: ShipTransform,
    current_game_tick: ShipTransform,
    previous_game_tick: ShipTransform,
}

impl TransformManager {
    pub fn new(initial: ShipTransform) -> Self {
        Self {
            current_physics: initial,
            previous_physics: initial,
            current_game_tick: initial,
            previous_game_tick: initial,
        }
    }

    pub fn current(&self, selector: TransformSelector) -> ShipTransform {
        match selector {
            TransformSelector::Physics => self.current_physics,
            TransformSelector::GameTick => self.current_game_tick,
        }
    }

    pub fn previous(&self, selector: TransformSelector) -> ShipTransform {
        match selector {
            TransformSelector::Physics => self.previous_physics,
            TransformSelector::GameTick => self.previous_game_tick,
        }
    }

    pub fn update_physics_transform(&mut self, transform: ShipTransform) {
        self.previous_physics = self.current_physics;
        self.current_physics = transform;
    }

    /// Re-anchor both physics transforms on a new center of mass without moving voxels
    pub fn shift_physics_center_of_mass(&mut self, center_of_mass: DVec3) {
        self.previous_physics = self.previous_physics.with_center_of_mass(center_of_mass);
        self.current_physics = self.current_physics.with_center_of_mass(center_of_mass);
    }

    /// Publish the latest physics result as the game-tick transform
    pub fn commit_game_tick(&mut self) -> ShipTransform {
        self.previous_game_tick = self.current_game_tick;
        self.current_game_tick = self.current_physics;
        self.current_game_tick
    }

    /// Host-side override of the authoritative pose; no interpolation across it
    pub fn set_game_transform(&mut self, transform: ShipTransform) {
        self.previous_game_tick = transform;
        self.current_game_tick = transform;
    }

    /// Rebuild the physics pair from the game-tick transform
    pub fn reset_physics_to_game_tick(&mut self) {
        self.previous_physics = self.current_game_tick;
        self.current_physics = self.current_game_tick;
    }

    pub fn transform_position(&self, pos: DVec3, selector: TransformSelector, kind: TransformType) -> DVec3 {
        self.current(selector).transform_position(pos, kind)
    }

    pub fn transform_direction(&self, dir: DVec3, selector: TransformSelector, kind: TransformType) -> DVec3 {
        self.current(selector).transform_direction(dir, kind)
    }

    /// Pose between the previous and current transform of `selector`
    pub fn interpolated(&self, selector: TransformSelector, alpha: f64) -> ShipTransform {
        self.previous(selector).interpolate(&self.current(selector), alpha)
    }
}
