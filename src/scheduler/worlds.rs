use std::sync::Arc;

use dashmap::DashMap;

use super::events::PhysicsEvent;
use super::hooks::{HostHooks, NoHooks};
use super::ship_world::ShipWorld;
use crate::config::PhysicsConfig;
use crate::error::{ShipError, ShipResult};
use crate::persistence::ShipSaveData;
use crate::physics::BlockPhysicsRegistry;
use crate::world::WorldId;

/// Every loaded world, each with its own physics thread
pub struct PhysicsWorlds {
    registry: Arc<BlockPhysicsRegistry>,
    worlds: DashMap<WorldId, Arc<ShipWorld>>,
}

impl PhysicsWorlds {
    pub fn new(registry: Arc<BlockPhysicsRegistry>) -> Self {
        Self {
            registry,
            worlds: DashMap::new(),
        }
    }

    pub fn load_world(&self, world: WorldId, config: PhysicsConfig) -> ShipResult<Arc<ShipWorld>> {
        self.load_world_with_hooks(world, config, Arc::new(NoHooks))
    }

    pub fn load_world_with_hooks(
        &self,
        world: WorldId,
        config: PhysicsConfig,
        hooks: Arc<dyn HostHooks>,
    ) -> ShipResult<Arc<ShipWorld>> {
        match self.worlds.entry(world) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ShipError::WorldAlreadyLoaded(world)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let ship_world = Arc::new(ShipWorld::with_hooks(world, config, Arc::clone(&self.registry), hooks)?);
                slot.insert(Arc::clone(&ship_world));
                log::info!("Loaded physics world {}", world);
                Ok(ship_world)
            }
        }
    }

    /// Stop the world's physics thread; its ships come back as save records
    pub fn unload_world(&self, world: WorldId) -> ShipResult<Vec<ShipSaveData>> {
        let (_, ship_world) = self.worlds.remove(&world).ok_or(ShipError::WorldNotLoaded(world))?;
        let saves = ship_world.shutdown();
        log::info!("Unloaded physics world {} with {} ships", world, saves.len());
        Ok(saves)
    }

    pub fn world(&self, world: WorldId) -> ShipResult<Arc<ShipWorld>> {
        self.worlds
            .get(&world)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ShipError::WorldNotLoaded(world))
    }

    pub fn world_ids(&self) -> Vec<WorldId> {
        let mut ids: Vec<WorldId> = self.worlds.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Run `ShipWorld::on_game_tick` for every world
    pub fn on_game_tick(&self) -> Vec<(WorldId, PhysicsEvent)> {
        let worlds: Vec<Arc<ShipWorld>> = self.worlds.iter().map(|entry| Arc::clone(entry.value())).collect();
        let mut events = Vec::new();
        for world in worlds {
            let id = world.world();
            events.extend(world.on_game_tick().into_iter().map(|event| (id, event)));
        }
        events
    }

    pub fn shutdown_all(&self) {
        for id in self.world_ids() {
            if let Err(e) = self.unload_world(id) {
                log::warn!("Failed to unload world {}: {}", id, e);
            }
        }
    }
}

impl Drop for PhysicsWorlds {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_lifecycle() {
        let worlds = PhysicsWorlds::new(Arc::new(BlockPhysicsRegistry::new()));
        worlds.load_world(1, PhysicsConfig::default()).expect("load");
        worlds.load_world(2, PhysicsConfig::default()).expect("load");
        assert!(matches!(
            worlds.load_world(1, PhysicsConfig::default()),
            Err(ShipError::WorldAlreadyLoaded(1))
        ));
        assert_eq!(worlds.world_ids(), vec![1, 2]);

        worlds.world(1).expect("loaded").spawn_ship(None).expect("spawn");
        let saves = worlds.unload_world(1).expect("loaded");
        assert_eq!(saves.len(), 1);
        assert!(matches!(worlds.world(1), Err(ShipError::WorldNotLoaded(1))));
        assert!(worlds.unload_world(1).is_err());
    }

    #[test]
    fn test_invalid_config_does_not_register_world() {
        let worlds = PhysicsWorlds::new(Arc::new(BlockPhysicsRegistry::new()));
        assert!(worlds.load_world(5, PhysicsConfig::default().with_tick_rate(0.0, 1)).is_err());
        assert!(worlds.world_ids().is_empty());
    }
}
