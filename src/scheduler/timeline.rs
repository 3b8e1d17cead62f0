//! One world's physics pass, independent of any thread

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use super::events::{PhysicsEvent, RemovalReason};
use crate::config::PhysicsConfig;
use crate::physics::{RigidBodyIntegrator, SubstepOutcome};
use crate::ship::{DeconstructionState, ShipHandle, ShipId};
use crate::world::WorldId;

/// Changes requested of a running timeline; applied between passes
pub enum SchedulerCommand {
    AddShip(Arc<ShipHandle>),
    RemoveShip(ShipId),
    Reconfigure(Arc<PhysicsConfig>),
}

/// Summary of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub ships: usize,
    pub substeps: usize,
    pub removed: usize,
    /// Pass stopped early because the scheduler is shutting down
    pub cancelled: bool,
}

struct TimelineShip {
    handle: Arc<ShipHandle>,
    integrator: RigidBodyIntegrator,
}

/// Ships of one world and their integrators, stepped in id order
pub struct WorldTimeline {
    world: WorldId,
    config: Arc<PhysicsConfig>,
    ships: BTreeMap<ShipId, TimelineShip>,
    events: Sender<PhysicsEvent>,
}

impl WorldTimeline {
    pub fn new(world: WorldId, config: Arc<PhysicsConfig>, events: Sender<PhysicsEvent>) -> Self {
        Self {
            world,
            config,
            ships: BTreeMap::new(),
            events,
        }
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn config(&self) -> &Arc<PhysicsConfig> {
        &self.config
    }

    pub fn ship_count(&self) -> usize {
        self.ships.len()
    }

    pub fn contains(&self, id: ShipId) -> bool {
        self.ships.contains_key(&id)
    }

    /// False if a ship with the same id is already present
    pub fn add_ship(&mut self, handle: Arc<ShipHandle>) -> bool {
        let id = handle.id();
        if self.ships.contains_key(&id) {
            log::warn!("World {} already simulates ship {}", self.world, id);
            return false;
        }
        let integrator = RigidBodyIntegrator::for_ship(Arc::clone(&self.config), &handle);
        self.ships.insert(id, TimelineShip { handle, integrator });
        log::debug!("World {} added ship {}", self.world, id);
        true
    }

    pub fn remove_ship(&mut self, id: ShipId) -> Option<Arc<ShipHandle>> {
        let removed = self.ships.remove(&id)?;
        log::debug!("World {} removed ship {}", self.world, id);
        Some(removed.handle)
    }

    pub fn reconfigure(&mut self, config: Arc<PhysicsConfig>) {
        for ship in self.ships.values_mut() {
            ship.integrator.set_config(Arc::clone(&config));
        }
        self.config = config;
    }

    pub fn apply(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::AddShip(handle) => {
                self.add_ship(handle);
            }
            SchedulerCommand::RemoveShip(id) => {
                self.remove_ship(id);
            }
            SchedulerCommand::Reconfigure(config) => self.reconfigure(config),
        }
    }

    /// Step every ship `substeps_per_tick` times
    ///
    /// `running` is checked between ships; a ship's substep either commits in
    /// full or not at all.
    pub fn run_pass(&mut self, running: &AtomicBool) -> PassReport {
        let dt = self.config.substep_dt();
        let substeps = self.config.substeps_per_tick.max(1);
        let mut report = PassReport {
            ships: self.ships.len(),
            ..PassReport::default()
        };
        let mut finished = Vec::new();

        for (id, ship) in self.ships.iter_mut() {
            if !running.load(Ordering::Acquire) {
                report.cancelled = true;
                break;
            }
            for _ in 0..substeps {
                let outcome = ship.integrator.substep(&ship.handle, dt);
                report.substeps += 1;
                match outcome {
                    SubstepOutcome::Frozen {
                        linear_speed_sq,
                        angular_speed_sq,
                    } => {
                        let _ = self.events.send(PhysicsEvent::ShipFrozen {
                            ship: *id,
                            linear_speed_sq,
                            angular_speed_sq,
                        });
                        break;
                    }
                    SubstepOutcome::GridAligned => {
                        let _ = self.events.send(PhysicsEvent::GridAligned { ship: *id });
                        break;
                    }
                    SubstepOutcome::Deconstructing => {
                        if ship.handle.deconstruction_state() == DeconstructionState::DeconstructImmediate {
                            finished.push(*id);
                        }
                        break;
                    }
                    SubstepOutcome::Disabled | SubstepOutcome::Empty => break,
                    SubstepOutcome::Integrated | SubstepOutcome::ForcedToGameTransform => {}
                }
            }
        }

        for id in finished {
            if self.ships.remove(&id).is_some() {
                report.removed += 1;
                log::info!("World {} deconstructed ship {}", self.world, id);
                let _ = self.events.send(PhysicsEvent::ShipRemoved {
                    ship: id,
                    reason: RemovalReason::Deconstructed,
                });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ChunkClaim;
    use crate::physics::{BlockPhysics, BlockPhysicsRegistry};
    use crate::transform::TransformSelector;
    use crate::world::VoxelPos;
    use crossbeam_channel::unbounded;

    fn ship(id: u64) -> Arc<ShipHandle> {
        let mut registry = BlockPhysicsRegistry::new();
        let hull = registry.register("hull", BlockPhysics::solid(100.0));
        let claim = ChunkClaim::new(id as i32 * 100, 0, 0);
        let handle = ShipHandle::new(ShipId(id), format!("ship-{}", id), claim, Arc::new(registry));
        let pos = VoxelPos::new(claim.center_pos().x_start() + 2, 64, 3);
        handle.set_voxel(pos, hull).expect("inside claim");
        Arc::new(handle)
    }

    fn timeline() -> (WorldTimeline, crossbeam_channel::Receiver<PhysicsEvent>) {
        let (tx, rx) = unbounded();
        (WorldTimeline::new(0, Arc::new(PhysicsConfig::default()), tx), rx)
    }

    #[test]
    fn test_pass_moves_every_ship() {
        let (mut timeline, _rx) = timeline();
        let ships: Vec<_> = (1..=3).map(ship).collect();
        for s in &ships {
            assert!(timeline.add_ship(Arc::clone(s)));
        }
        assert!(!timeline.add_ship(Arc::clone(&ships[0])));

        let running = AtomicBool::new(true);
        let report = timeline.run_pass(&running);
        assert_eq!(report.ships, 3);
        assert_eq!(report.substeps, 3);

        for s in &ships {
            assert!(s.motion().linear_velocity.y < 0.0);
        }
    }

    #[test]
    fn test_cancelled_pass_commits_nothing() {
        let (mut timeline, _rx) = timeline();
        let s = ship(1);
        timeline.add_ship(Arc::clone(&s));
        let before = s.transform_manager();

        let report = timeline.run_pass(&AtomicBool::new(false));
        assert!(report.cancelled);
        assert_eq!(report.substeps, 0);
        assert_eq!(s.transform_manager(), before);
    }

    #[test]
    fn test_immediate_deconstruction_removes_ship() {
        let (mut timeline, rx) = timeline();
        let s = ship(1);
        timeline.add_ship(Arc::clone(&s));
        s.request_deconstruction(true);

        let report = timeline.run_pass(&AtomicBool::new(true));
        assert_eq!(report.removed, 1);
        assert!(!timeline.contains(ShipId(1)));
        assert_eq!(
            rx.try_recv().expect("event"),
            PhysicsEvent::ShipRemoved {
                ship: ShipId(1),
                reason: RemovalReason::Deconstructed
            }
        );
    }

    #[test]
    fn test_frozen_ship_reported_once() {
        let (mut timeline, rx) = timeline();
        let s = ship(1);
        timeline.add_ship(Arc::clone(&s));
        s.store_velocities(glam::DVec3::new(1000.0, 0.0, 0.0), glam::DVec3::ZERO);
        timeline.remove_ship(ShipId(1));
        timeline.add_ship(Arc::clone(&s));

        let running = AtomicBool::new(true);
        timeline.run_pass(&running);
        timeline.run_pass(&running);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PhysicsEvent::ShipFrozen { ship: ShipId(1), .. }));
        assert!(!s.physics_enabled());
        assert_eq!(s.transform(TransformSelector::Physics), s.transform_manager().previous(TransformSelector::Physics));
    }

    #[test]
    fn test_reconfigure_reaches_integrators() {
        let (mut timeline, _rx) = timeline();
        let s = ship(1);
        timeline.add_ship(Arc::clone(&s));
        timeline.apply(SchedulerCommand::Reconfigure(Arc::new(
            PhysicsConfig::default().with_gravity_enabled(false),
        )));

        timeline.run_pass(&AtomicBool::new(true));
        assert_eq!(s.motion().linear_velocity, glam::DVec3::ZERO);
    }
}
