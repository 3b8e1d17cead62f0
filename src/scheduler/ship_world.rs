//! Host-facing view of one world's ships

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use dashmap::DashMap;
use glam::{DQuat, DVec3};
use parking_lot::{Mutex, RwLock};

use super::events::PhysicsEvent;
use super::hooks::{HostHooks, NoHooks};
use super::physics_scheduler::PhysicsScheduler;
use crate::claim::{ShipyardAllocator, VoxelColumn};
use crate::config::PhysicsConfig;
use crate::error::{ShipError, ShipResult};
use crate::persistence::{save_ship, ShipSaveData, ShipyardIndex};
use crate::physics::BlockPhysicsRegistry;
use crate::ship::{random_name, DeconstructionState, ShipHandle, ShipId};
use crate::transform::TransformSelector;
use crate::world::{Aabb, BlockId, ChunkPos, VoxelPos, WorldId};

/// Ships of one world plus the physics thread that steps them
///
/// All methods are meant for the host thread. Physics results show up in the
/// game-tick transforms only after `on_game_tick`.
pub struct ShipWorld {
    world: WorldId,
    config: RwLock<Arc<PhysicsConfig>>,
    registry: Arc<BlockPhysicsRegistry>,
    ships: DashMap<ShipId, Arc<ShipHandle>>,
    shipyard: ShipyardAllocator,
    next_ship_id: AtomicU64,
    scheduler: Mutex<PhysicsScheduler>,
    events: Receiver<PhysicsEvent>,
    hooks: Arc<dyn HostHooks>,
}

impl ShipWorld {
    pub fn new(world: WorldId, config: PhysicsConfig, registry: Arc<BlockPhysicsRegistry>) -> ShipResult<Self> {
        Self::with_hooks(world, config, registry, Arc::new(NoHooks))
    }

    pub fn with_hooks(
        world: WorldId,
        config: PhysicsConfig,
        registry: Arc<BlockPhysicsRegistry>,
        hooks: Arc<dyn HostHooks>,
    ) -> ShipResult<Self> {
        Self::resume(world, config, registry, hooks, ShipyardIndex::default())
    }

    /// Continue a world whose ids and claims were handed out before `index` was saved
    pub fn resume(
        world: WorldId,
        config: PhysicsConfig,
        registry: Arc<BlockPhysicsRegistry>,
        hooks: Arc<dyn HostHooks>,
        index: ShipyardIndex,
    ) -> ShipResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let (event_tx, events) = unbounded();
        let scheduler = PhysicsScheduler::start(world, Arc::clone(&config), event_tx)?;

        Ok(Self {
            world,
            config: RwLock::new(config),
            registry,
            ships: DashMap::new(),
            shipyard: ShipyardAllocator::resume_from(index.next_claim_index),
            next_ship_id: AtomicU64::new(index.next_ship_id.max(1)),
            scheduler: Mutex::new(scheduler),
            events,
            hooks,
        })
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn config(&self) -> Arc<PhysicsConfig> {
        Arc::clone(&self.config.read())
    }

    pub fn registry(&self) -> &Arc<BlockPhysicsRegistry> {
        &self.registry
    }

    /// New empty ship in a fresh shipyard claim
    pub fn spawn_ship(&self, name: Option<&str>) -> ShipResult<Arc<ShipHandle>> {
        let claim = self.shipyard.allocate_default()?;
        let id = ShipId(self.next_ship_id.fetch_add(1, Ordering::AcqRel));
        let name = name.map(str::to_string).unwrap_or_else(random_name);

        let ship = Arc::new(ShipHandle::new(id, name, claim, Arc::clone(&self.registry)));
        self.attach(Arc::clone(&ship))?;
        log::info!("World {} spawned ship {} ({})", self.world, id, ship.name());
        Ok(ship)
    }

    /// Bring a saved ship back; `loader` supplies each claimed column
    pub fn load_ship<F, E>(&self, save: &ShipSaveData, loader: F) -> ShipResult<Arc<ShipHandle>>
    where
        F: FnMut(ChunkPos) -> Result<VoxelColumn, E>,
        E: Display,
    {
        if self.ships.contains_key(&save.id) {
            return Err(ShipError::ShipAlreadyLoaded(save.id));
        }
        let ship = Arc::new(save.restore(Arc::clone(&self.registry), loader));
        self.next_ship_id.fetch_max(save.id.0 + 1, Ordering::AcqRel);
        self.shipyard.reserve(&save.claim);
        self.attach(Arc::clone(&ship))?;
        log::info!("World {} loaded ship {} ({})", self.world, save.id, save.name);
        Ok(ship)
    }

    fn attach(&self, ship: Arc<ShipHandle>) -> ShipResult<()> {
        let id = ship.id();
        match self.ships.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(ShipError::ShipAlreadyLoaded(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&ship));
            }
        }
        if let Err(e) = self.scheduler.lock().add_ship(Arc::clone(&ship)) {
            self.ships.remove(&id);
            return Err(e);
        }
        self.hooks.on_ship_loaded(&ship);
        Ok(())
    }

    /// Take a ship out of the simulation and return its save record
    pub fn unload_ship(&self, id: ShipId) -> ShipResult<ShipSaveData> {
        let (_, ship) = self.ships.remove(&id).ok_or(ShipError::ShipNotFound(id))?;
        if let Err(e) = self.scheduler.lock().remove_ship(id) {
            log::warn!("World {} could not detach ship {}: {}", self.world, id, e);
        }
        self.hooks.on_ship_unloaded(&ship);
        log::info!("World {} unloaded ship {}", self.world, id);
        Ok(ShipSaveData::capture(&ship))
    }

    /// Edit one voxel of a ship; a ship left without voxels is discarded
    pub fn set_voxel(&self, id: ShipId, pos: VoxelPos, block: BlockId) -> ShipResult<BlockId> {
        let ship = self.require(id)?;
        let previous = ship.set_voxel(pos, block)?;
        if block.is_air() && !previous.is_air() && ship.is_empty() {
            self.discard(&ship);
        }
        Ok(previous)
    }

    /// Batched `set_voxel`; returns how many voxels changed
    pub fn set_voxels(&self, id: ShipId, edits: &[(VoxelPos, BlockId)]) -> ShipResult<usize> {
        let ship = self.require(id)?;
        let changed = ship.set_voxels(edits)?;
        if changed > 0 && ship.is_empty() {
            self.discard(&ship);
        }
        Ok(changed)
    }

    fn discard(&self, ship: &Arc<ShipHandle>) {
        let id = ship.id();
        if self.ships.remove(&id).is_none() {
            return;
        }
        if let Err(e) = self.scheduler.lock().remove_ship(id) {
            log::warn!("World {} could not detach ship {}: {}", self.world, id, e);
        }
        self.hooks.on_ship_unloaded(ship);
        log::info!("World {} discarded empty ship {}", self.world, id);
    }

    pub fn ship(&self, id: ShipId) -> Option<Arc<ShipHandle>> {
        self.ships.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Every ship, in id order
    pub fn ships(&self) -> Vec<Arc<ShipHandle>> {
        let mut ships: Vec<_> = self.ships.iter().map(|entry| Arc::clone(entry.value())).collect();
        ships.sort_by_key(|ship| ship.id());
        ships
    }

    pub fn ship_count(&self) -> usize {
        self.ships.len()
    }

    /// Ships whose game-tick bounds touch `area`
    pub fn ships_intersecting(&self, area: &Aabb) -> Vec<Arc<ShipHandle>> {
        self.ships()
            .into_iter()
            .filter(|ship| {
                ship.global_bounds(TransformSelector::GameTick)
                    .map_or(false, |bounds| bounds.intersects(area))
            })
            .collect()
    }

    /// Host game tick: apply physics events, then publish every ship's latest physics pose
    pub fn on_game_tick(&self) -> Vec<PhysicsEvent> {
        let events: Vec<PhysicsEvent> = self.events.try_iter().collect();
        for event in &events {
            match event {
                PhysicsEvent::ShipRemoved { ship, reason } => {
                    if let Some((_, removed)) = self.ships.remove(ship) {
                        log::info!("World {} dropped ship {} ({:?})", self.world, ship, reason);
                        self.hooks.on_ship_unloaded(&removed);
                    }
                }
                PhysicsEvent::ShipFrozen {
                    ship,
                    linear_speed_sq,
                    angular_speed_sq,
                } => {
                    log::warn!(
                        "Ship {} froze: |v|² = {}, |ω|² = {}",
                        ship,
                        linear_speed_sq,
                        angular_speed_sq
                    );
                }
                PhysicsEvent::GridAligned { .. } => {}
            }
        }

        for ship in self.ships() {
            let committed = ship.commit_game_tick();
            self.hooks.on_game_tick_committed(&ship, &committed);
        }
        events
    }

    pub fn teleport_ship(&self, id: ShipId, position: DVec3, rotation: Option<DQuat>) -> ShipResult<()> {
        self.require(id)?.teleport(position, rotation);
        Ok(())
    }

    pub fn request_deconstruction(&self, id: ShipId, immediate: bool) -> ShipResult<DeconstructionState> {
        Ok(self.require(id)?.request_deconstruction(immediate))
    }

    pub fn set_physics_enabled(&self, id: ShipId, enabled: bool) -> ShipResult<()> {
        self.require(id)?.set_physics_enabled(enabled);
        Ok(())
    }

    /// Recompute every ship's inertia; returns the largest drift seen
    pub fn verify_inertia_all(&self) -> f64 {
        let tolerance = self.config.read().inertia_drift_tolerance;
        self.ships()
            .iter()
            .map(|ship| ship.verify_inertia(tolerance))
            .fold(0.0, f64::max)
    }

    fn require(&self, id: ShipId) -> ShipResult<Arc<ShipHandle>> {
        self.ship(id).ok_or(ShipError::ShipNotFound(id))
    }

    /// Swap in a new configuration; integrators pick it up before their next pass
    pub fn reconfigure(&self, config: PhysicsConfig) -> ShipResult<()> {
        config.validate()?;
        let config = Arc::new(config);
        self.scheduler.lock().reconfigure(Arc::clone(&config))?;
        *self.config.write() = config;
        Ok(())
    }

    pub fn average_tick_duration(&self) -> Option<Duration> {
        self.scheduler.lock().average_tick_duration()
    }

    pub fn ticks_per_second(&self) -> Option<f64> {
        self.scheduler.lock().ticks_per_second()
    }

    pub fn physics_tick_count(&self) -> u64 {
        self.scheduler.lock().tick_count()
    }

    pub fn physics_overrun_count(&self) -> u64 {
        self.scheduler.lock().overrun_count()
    }

    pub fn shipyard_index(&self) -> ShipyardIndex {
        ShipyardIndex {
            next_ship_id: self.next_ship_id.load(Ordering::Acquire),
            next_claim_index: self.shipyard.next_index(),
        }
    }

    /// Write every ship and the shipyard index into `save_dir`
    pub fn save_all(&self, save_dir: impl AsRef<Path>) -> ShipResult<Vec<PathBuf>> {
        let save_dir = save_dir.as_ref();
        let mut paths = Vec::with_capacity(self.ships.len());
        for ship in self.ships() {
            paths.push(save_ship(save_dir, &ShipSaveData::capture(&ship))?);
        }
        self.shipyard_index().save(save_dir)?;
        log::info!("World {} saved {} ships to {}", self.world, paths.len(), save_dir.display());
        Ok(paths)
    }

    /// Stop the physics thread and hand back a save record per ship
    pub fn shutdown(&self) -> Vec<ShipSaveData> {
        self.scheduler.lock().stop();
        let saves: Vec<ShipSaveData> = self.ships().iter().map(|ship| ShipSaveData::capture(ship)).collect();
        for ship in self.ships() {
            self.hooks.on_ship_unloaded(&ship);
        }
        self.ships.clear();
        saves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BlockPhysics;

    fn world() -> ShipWorld {
        let mut registry = BlockPhysicsRegistry::new();
        registry.register("hull", BlockPhysics::solid(100.0));
        registry.register("glass", BlockPhysics::solid(0.0));
        ShipWorld::new(0, PhysicsConfig::default().with_gravity_enabled(false), Arc::new(registry))
            .expect("valid config")
    }

    #[test]
    fn test_spawned_ships_get_distinct_ids_and_claims() {
        let world = world();
        let a = world.spawn_ship(Some("alpha")).expect("spawn");
        let b = world.spawn_ship(None).expect("spawn");

        assert_ne!(a.id(), b.id());
        assert!(!a.claim().overlaps(&b.claim()));
        assert_eq!(a.name(), "alpha");
        assert!(!b.name().is_empty());
        assert_eq!(world.ship_count(), 2);
        world.shutdown();
    }

    #[test]
    fn test_unload_then_load_round_trip() {
        let world = world();
        let ship = world.spawn_ship(Some("cargo")).expect("spawn");
        let hull = world.registry().get_id("hull").expect("registered");
        let pos = VoxelPos::new(ship.claim().center_pos().x_start(), 70, 0);
        ship.set_voxel(pos, hull).expect("inside claim");
        let columns = ship.chunks().columns();

        let save = world.unload_ship(ship.id()).expect("loaded");
        assert!(world.ship(ship.id()).is_none());
        assert!(matches!(world.unload_ship(ship.id()), Err(ShipError::ShipNotFound(_))));

        let restored = world
            .load_ship(&save, |chunk| {
                columns
                    .iter()
                    .find(|c| c.pos() == chunk)
                    .map(|c| (**c).clone())
                    .ok_or("missing column")
            })
            .expect("load");
        assert_eq!(restored.voxel_count(), 1);
        assert!(matches!(
            world.load_ship(&save, |chunk| Ok::<_, String>(VoxelColumn::new(chunk))),
            Err(ShipError::ShipAlreadyLoaded(_))
        ));
        world.shutdown();
    }

    #[test]
    fn test_admin_calls_on_missing_ship() {
        let world = world();
        assert!(matches!(
            world.teleport_ship(ShipId(99), DVec3::ZERO, None),
            Err(ShipError::ShipNotFound(ShipId(99)))
        ));
        assert!(world.request_deconstruction(ShipId(99), false).is_err());
        assert!(world.set_physics_enabled(ShipId(99), false).is_err());
        world.shutdown();
    }

    #[test]
    fn test_reconfigure_rejects_invalid() {
        let world = world();
        assert!(world.reconfigure(PhysicsConfig::default().with_drag_constant(2.0)).is_err());
        assert!(world.config().drag_constant <= 1.0);
        world.reconfigure(PhysicsConfig::default().with_drag_constant(0.5)).expect("valid");
        assert_eq!(world.config().drag_constant, 0.5);
        world.shutdown();
    }

    #[test]
    fn test_removing_last_voxel_discards_ship() {
        let world = world();
        let ship = world.spawn_ship(None).expect("spawn");
        let hull = world.registry().get_id("hull").expect("registered");
        let origin = ship.claim().center_pos();
        let a = VoxelPos::new(origin.x_start(), 64, origin.z_start());
        let b = a.offset(1, 0, 0);
        world.set_voxel(ship.id(), a, hull).expect("inside claim");
        world.set_voxel(ship.id(), b, hull).expect("inside claim");

        assert_eq!(world.set_voxel(ship.id(), a, BlockId::AIR).expect("loaded"), hull);
        assert!(world.ship(ship.id()).is_some());
        world.set_voxel(ship.id(), b, BlockId::AIR).expect("loaded");
        assert!(world.ship(ship.id()).is_none());
        assert!(matches!(
            world.set_voxel(ship.id(), a, hull),
            Err(ShipError::ShipNotFound(_))
        ));
        world.shutdown();
    }

    #[test]
    fn test_massless_voxel_keeps_ship_alive() {
        let world = world();
        let ship = world.spawn_ship(None).expect("spawn");
        let hull = world.registry().get_id("hull").expect("registered");
        let glass = world.registry().get_id("glass").expect("registered");
        let origin = ship.claim().center_pos();
        let a = VoxelPos::new(origin.x_start(), 64, origin.z_start());
        let b = a.offset(0, 1, 0);
        world.set_voxel(ship.id(), a, hull).expect("inside claim");
        world.set_voxel(ship.id(), b, glass).expect("inside claim");

        world.set_voxel(ship.id(), a, BlockId::AIR).expect("loaded");
        let survivor = world.ship(ship.id()).expect("glass voxel remains");
        assert_eq!(survivor.block_at(b), glass);

        world.set_voxels(ship.id(), &[(b, BlockId::AIR)]).expect("loaded");
        assert!(world.ship(ship.id()).is_none());
        world.shutdown();
    }

    #[test]
    fn test_loaded_claim_is_not_handed_out_again() {
        let first = world();
        let hull = first.registry().get_id("hull").expect("registered");
        first.spawn_ship(None).expect("spawn");
        let ship = first.spawn_ship(None).expect("spawn");
        let origin = ship.claim().center_pos();
        ship.set_voxel(VoxelPos::new(origin.x_start(), 64, origin.z_start()), hull)
            .expect("inside claim");
        let save = first.unload_ship(ship.id()).expect("loaded");
        first.shutdown();

        let second = world();
        let loaded = second
            .load_ship(&save, |chunk| Ok::<_, String>(VoxelColumn::new(chunk)))
            .expect("load");
        let fresh = second.spawn_ship(None).expect("spawn");
        assert_ne!(fresh.id(), loaded.id());
        assert!(!fresh.claim().overlaps(&loaded.claim()));
        assert!(second.shipyard_index().next_claim_index > 2);
        second.shutdown();
    }

    #[test]
    fn test_shipyard_index_tracks_allocations() {
        let world = world();
        world.spawn_ship(None).expect("spawn");
        world.spawn_ship(None).expect("spawn");
        let index = world.shipyard_index();
        assert_eq!(index.next_ship_id, 3);
        assert_eq!(index.next_claim_index, 2);
        world.shutdown();
    }
}
