//! Rigid-body integration of one ship
//!
//! One `substep` runs, in order:
//!
//! 1. refresh the physics-tick inertia copy, re-anchoring the pose on a moved
//!    center of mass
//! 2. rotate the inertia tensor into world orientation and invert it
//! 3. drag, then gravity, voxel forces, voxel torques and pilot input
//!    (grid alignment replaces everything after drag)
//! 4. fold the accumulated impulses into the velocities
//! 5. freeze the ship if it went unstable
//! 6. integrate orientation and position
//! 7. publish the new physics transform and velocities
//!
//! A pending force-to-game-transform request replaces steps 2 to 7.

use std::sync::Arc;

use glam::{DMat3, DQuat, DVec3};

use super::forces::{ForceAccumulator, ProviderContext, ProviderError, VoxelForceProvider, VoxelTorqueProvider};
use super::grid_alignment::{nearest_grid_orientation, remaining_rotation};
use crate::config::PhysicsConfig;
use crate::inertia::InertiaData;
use crate::ship::{DeconstructionState, ShipHandle, ShipMotion};
use crate::transform::{ShipTransform, TransformSelector, TransformType};
use crate::world::{BlockId, VoxelPos};

/// What a substep did to its ship
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubstepOutcome {
    Integrated,
    /// Physics switched off for this ship
    Disabled,
    /// No mass or a degenerate inertia tensor; nothing to integrate
    Empty,
    /// Velocities exceeded the threshold or went non-finite; physics now disabled
    Frozen {
        linear_speed_sq: f64,
        angular_speed_sq: f64,
    },
    /// Physics transform rebuilt from the game-tick transform
    ForcedToGameTransform,
    /// Grid alignment finished during this substep
    GridAligned,
    /// Ship is waiting to be removed
    Deconstructing,
}

pub struct RigidBodyIntegrator {
    config: Arc<PhysicsConfig>,
    inertia: InertiaData,
    inertia_version: u64,
    linear_velocity: DVec3,
    angular_velocity: DVec3,
    accumulator: ForceAccumulator,
    world_inertia: DMat3,
    world_inverse_inertia: DMat3,
    alignment_target: Option<DQuat>,
}

impl RigidBodyIntegrator {
    pub fn new(config: Arc<PhysicsConfig>, motion: ShipMotion) -> Self {
        Self {
            config,
            inertia: InertiaData::new(DVec3::ZERO),
            // Inertia models start at version 1, so the first substep always snapshots
            inertia_version: 0,
            linear_velocity: motion.linear_velocity,
            angular_velocity: motion.angular_velocity,
            accumulator: ForceAccumulator::new(),
            world_inertia: DMat3::ZERO,
            world_inverse_inertia: DMat3::ZERO,
            alignment_target: None,
        }
    }

    /// Integrator resuming from the ship's stored velocities
    pub fn for_ship(config: Arc<PhysicsConfig>, ship: &ShipHandle) -> Self {
        Self::new(config, ship.motion())
    }

    pub fn config(&self) -> &Arc<PhysicsConfig> {
        &self.config
    }

    /// Takes effect at the next substep
    pub fn set_config(&mut self, config: Arc<PhysicsConfig>) {
        self.config = config;
    }

    pub fn linear_velocity(&self) -> DVec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> DVec3 {
        self.angular_velocity
    }

    pub fn set_velocities(&mut self, linear: DVec3, angular: DVec3) {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
    }

    /// Physics-tick inertia copy
    pub fn inertia(&self) -> &InertiaData {
        &self.inertia
    }

    /// Global velocity of a point `lever` away from the center of mass
    pub fn velocity_at_point(&self, lever: DVec3) -> DVec3 {
        self.angular_velocity.cross(lever) + self.linear_velocity
    }

    /// Magnitude of the world inertia tensor applied to the unit rotation axis
    pub fn inertia_along_rotation_axis(&self) -> f64 {
        let speed = self.angular_velocity.length();
        if speed <= 0.0 {
            return 0.0;
        }
        (self.world_inertia * (self.angular_velocity / speed)).length()
    }

    pub fn substep(&mut self, ship: &ShipHandle, dt: f64) -> SubstepOutcome {
        self.refresh_inertia(ship);

        let forced = {
            let mut transforms = ship.transforms().write();
            let forced = ship.take_force_to_game();
            if forced {
                transforms.reset_physics_to_game_tick();
                // The game-tick pose may predate the latest mass change
                if !self.inertia.is_empty() {
                    transforms.shift_physics_center_of_mass(self.inertia.center_of_mass());
                }
            }
            forced
        };
        if forced {
            self.linear_velocity = DVec3::ZERO;
            self.angular_velocity = DVec3::ZERO;
            self.accumulator.clear();
            ship.store_velocities(DVec3::ZERO, DVec3::ZERO);
            return SubstepOutcome::ForcedToGameTransform;
        }

        let state = ship.deconstruction_state();
        if state.is_terminal() {
            return SubstepOutcome::Deconstructing;
        }
        if !ship.physics_enabled() {
            return SubstepOutcome::Disabled;
        }
        if self.inertia.is_empty() {
            return SubstepOutcome::Empty;
        }

        let transform = ship.transform(TransformSelector::Physics);
        if !self.update_world_inertia(&transform) {
            return SubstepOutcome::Empty;
        }

        let drag = self.config.drag_for_substep(dt);
        self.linear_velocity *= drag;
        self.angular_velocity *= drag;

        let mut aligned_to = None;
        if state == DeconstructionState::AligningToGrid {
            aligned_to = self.steer_to_grid(&transform, dt);
        } else {
            self.accumulate_forces(ship, &transform, dt);
        }

        self.apply_accumulated();

        if let Some(frozen) = self.check_instability(ship) {
            return frozen;
        }

        let mut next = self.integrate_pose(&transform, dt);
        if let Some(target) = aligned_to {
            next = next.with_rotation(target);
        }

        ship.transforms().write().update_physics_transform(next);
        ship.store_velocities(self.linear_velocity, self.angular_velocity);

        if aligned_to.is_some() {
            self.alignment_target = None;
            ship.set_deconstruction_state(DeconstructionState::GridAligned);
            log::info!("Ship {} aligned to the grid", ship.id());
            return SubstepOutcome::GridAligned;
        }
        SubstepOutcome::Integrated
    }

    fn refresh_inertia(&mut self, ship: &ShipHandle) {
        let Some((data, version)) = ship.inertia().snapshot_if_changed(self.inertia_version) else {
            return;
        };
        self.inertia = data;
        self.inertia_version = version;
        if !data.is_empty() {
            ship.transforms()
                .write()
                .shift_physics_center_of_mass(data.center_of_mass());
        }
    }

    /// False when the tensor cannot be inverted
    fn update_world_inertia(&mut self, transform: &ShipTransform) -> bool {
        let rotation = transform.rotation_matrix();
        let world = rotation * self.inertia.moment_of_inertia() * rotation.transpose();
        let det = world.determinant();
        if !det.is_finite() || det.abs() <= f64::EPSILON {
            return false;
        }
        self.world_inertia = world;
        self.world_inverse_inertia = world.inverse();
        true
    }

    /// Sets the angular velocity that closes the remaining angle over the time
    /// constant. Returns the target once the remaining angle is below epsilon.
    fn steer_to_grid(&mut self, transform: &ShipTransform, dt: f64) -> Option<DQuat> {
        let rotation = transform.rotation();
        let target = *self
            .alignment_target
            .get_or_insert_with(|| nearest_grid_orientation(rotation));
        let (axis, angle) = remaining_rotation(rotation, target);

        if angle < self.config.grid_alignment_epsilon {
            self.angular_velocity = DVec3::ZERO;
            return Some(target);
        }
        let time_constant = self.config.grid_alignment_time_constant.max(dt);
        self.angular_velocity = axis * (angle / time_constant);
        None
    }

    fn accumulate_forces(&mut self, ship: &ShipHandle, transform: &ShipTransform, dt: f64) {
        if self.config.gravity_enabled {
            self.accumulator
                .add_force(self.config.gravity_vector() * self.inertia.mass() * dt);
        }

        if self.config.voxel_forces_enabled {
            self.apply_voxel_providers(ship, transform, dt);
        }

        if let Some(pilot) = ship.pilot() {
            let input = pilot.control();
            if input.is_finite() {
                self.accumulator.add_force(input.force * dt);
                self.accumulator.add_torque(input.torque * dt);
            } else {
                log::warn!("Ship {} ignored non-finite pilot input", ship.id());
            }
        }
    }

    fn apply_voxel_providers(&mut self, ship: &ShipHandle, transform: &ShipTransform, dt: f64) {
        let positions = ship.active_force_positions();
        if positions.is_empty() {
            return;
        }
        let registry = Arc::clone(ship.registry());
        let chunks = ship.chunks();

        // Positions iterate in order and the sorts are stable, so ties keep position order
        let mut force_sources: Vec<(VoxelPos, BlockId, &dyn VoxelForceProvider)> = Vec::new();
        let mut torque_sources: Vec<(VoxelPos, BlockId, &dyn VoxelTorqueProvider)> = Vec::new();
        for &pos in positions.iter() {
            let block = chunks.block_at(pos);
            if let Some(provider) = registry.force_provider(block) {
                force_sources.push((pos, block, provider));
            }
            if let Some(provider) = registry.torque_provider(block) {
                torque_sources.push((pos, block, provider));
            }
        }
        force_sources.sort_by_key(|(_, _, provider)| provider.priority());
        torque_sources.sort_by_key(|(_, _, provider)| provider.priority());

        let com = transform.center_of_mass();
        let mass = self.inertia.mass();

        for (pos, block, provider) in force_sources {
            let ctx = ProviderContext {
                voxel: pos,
                block,
                dt,
                transform,
                linear_velocity: self.linear_velocity,
                angular_velocity: self.angular_velocity,
                mass,
                voxels: chunks,
            };
            let contribution = provider.force_at(&ctx).and_then(|force| match force {
                Some(f) if !f.force.is_finite() || !f.point.map_or(true, |p| p.is_finite()) => {
                    Err(ProviderError::NonFinite("force"))
                }
                other => Ok(other),
            });
            match contribution {
                Ok(Some(force)) => {
                    let point = force.point.unwrap_or_else(|| pos.center());
                    let lever = transform.transform_direction(point - com, TransformType::SubspaceToGlobal);
                    self.accumulator.add_force_at_point(force.force, lever);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Ship {} skipped force at {:?} (block {}): {}", ship.id(), pos, block, e),
            }
        }

        for (pos, block, provider) in torque_sources {
            self.convert_torque_to_velocity();
            let ctx = ProviderContext {
                voxel: pos,
                block,
                dt,
                transform,
                linear_velocity: self.linear_velocity,
                angular_velocity: self.angular_velocity,
                mass,
                voxels: chunks,
            };
            match provider.torque_at(&ctx) {
                Ok(Some(torque)) if torque.is_finite() => self.accumulator.add_torque(torque),
                Ok(Some(_)) => log::warn!(
                    "Ship {} skipped torque at {:?} (block {}): {}",
                    ship.id(),
                    pos,
                    block,
                    ProviderError::NonFinite("torque")
                ),
                Ok(None) => {}
                Err(e) => log::warn!("Ship {} skipped torque at {:?} (block {}): {}", ship.id(), pos, block, e),
            }
        }
    }

    fn convert_torque_to_velocity(&mut self) {
        let torque = self.accumulator.take_torque();
        self.angular_velocity += self.world_inverse_inertia * torque;
    }

    fn apply_accumulated(&mut self) {
        let (force, torque) = self.accumulator.take();
        self.linear_velocity += force / self.inertia.mass();
        self.angular_velocity += self.world_inverse_inertia * torque;
    }

    fn check_instability(&mut self, ship: &ShipHandle) -> Option<SubstepOutcome> {
        let linear_speed_sq = self.linear_velocity.length_squared();
        let angular_speed_sq = self.angular_velocity.length_squared();
        let threshold = self.config.instability_threshold;

        let finite = self.linear_velocity.is_finite() && self.angular_velocity.is_finite();
        if finite && linear_speed_sq <= threshold && angular_speed_sq <= threshold {
            return None;
        }

        log::warn!(
            "Ship {} went unstable (|v|²={}, |ω|²={}); physics disabled",
            ship.id(),
            linear_speed_sq,
            angular_speed_sq
        );
        self.linear_velocity = DVec3::ZERO;
        self.angular_velocity = DVec3::ZERO;
        ship.store_velocities(DVec3::ZERO, DVec3::ZERO);
        ship.set_physics_enabled(false);
        Some(SubstepOutcome::Frozen {
            linear_speed_sq,
            angular_speed_sq,
        })
    }

    fn integrate_pose(&self, transform: &ShipTransform, dt: f64) -> ShipTransform {
        let speed = self.angular_velocity.length();
        let rotation = if speed > 0.0 {
            DQuat::from_axis_angle(self.angular_velocity / speed, speed * dt) * transform.rotation()
        } else {
            transform.rotation()
        };

        let mut position = transform.position() + self.linear_velocity * dt;
        position.y = position
            .y
            .max(self.config.ship_lower_limit)
            .min(self.config.ship_upper_limit);

        ShipTransform::new(position, rotation, transform.center_of_mass())
    }
}
