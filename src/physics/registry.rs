use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::forces::{VoxelForceProvider, VoxelTorqueProvider};
use crate::constants::physics_constants::DEFAULT_BLOCK_MASS;
use crate::world::BlockId;

/// Physical properties of one block type
#[derive(Clone)]
pub struct BlockPhysics {
    pub mass: f64,
    pub force_provider: Option<Arc<dyn VoxelForceProvider>>,
    pub torque_provider: Option<Arc<dyn VoxelTorqueProvider>>,
}

impl BlockPhysics {
    pub fn solid(mass: f64) -> Self {
        Self {
            mass,
            force_provider: None,
            torque_provider: None,
        }
    }

    pub fn with_force_provider(mut self, provider: impl VoxelForceProvider + 'static) -> Self {
        self.force_provider = Some(Arc::new(provider));
        self
    }

    pub fn with_torque_provider(mut self, provider: impl VoxelTorqueProvider + 'static) -> Self {
        self.torque_provider = Some(Arc::new(provider));
        self
    }

    pub fn is_active(&self) -> bool {
        self.force_provider.is_some() || self.torque_provider.is_some()
    }
}

/// Block masses and force providers, resolved once and shared by every ship
///
/// Unregistered non-air blocks weigh `default_mass` and contribute no forces.
pub struct BlockPhysicsRegistry {
    blocks: FxHashMap<BlockId, BlockPhysics>,
    name_to_id: FxHashMap<String, BlockId>,
    next_id: u16,
    default_mass: f64,
}

impl Default for BlockPhysicsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockPhysicsRegistry {
    pub fn new() -> Self {
        Self {
            blocks: FxHashMap::default(),
            name_to_id: FxHashMap::default(),
            next_id: 1, // 0 is reserved for AIR
            default_mass: DEFAULT_BLOCK_MASS,
        }
    }

    pub fn with_default_mass(mut self, mass: f64) -> Self {
        self.default_mass = mass.max(0.0);
        self
    }

    /// Register a new block type
    pub fn register(&mut self, name: &str, physics: BlockPhysics) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        self.blocks.insert(id, physics);
        self.name_to_id.insert(name.to_string(), id);
        id
    }

    /// Attach physics to an id assigned elsewhere
    pub fn register_id(&mut self, id: BlockId, physics: BlockPhysics) {
        if id.is_air() {
            return;
        }
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        self.blocks.insert(id, physics);
    }

    pub fn get_id(&self, name: &str) -> Option<BlockId> {
        self.name_to_id.get(name).copied()
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockPhysics> {
        self.blocks.get(&id)
    }

    pub fn mass_of(&self, id: BlockId) -> f64 {
        if id.is_air() {
            return 0.0;
        }
        self.blocks.get(&id).map_or(self.default_mass, |b| b.mass)
    }

    pub fn force_provider(&self, id: BlockId) -> Option<&dyn VoxelForceProvider> {
        self.blocks.get(&id)?.force_provider.as_deref()
    }

    pub fn torque_provider(&self, id: BlockId) -> Option<&dyn VoxelTorqueProvider> {
        self.blocks.get(&id)?.torque_provider.as_deref()
    }

    /// Whether voxels of this type contribute forces or torques
    pub fn is_active(&self, id: BlockId) -> bool {
        self.blocks.get(&id).is_some_and(BlockPhysics::is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::forces::{PointForce, ProviderContext, ProviderError};
    use glam::DVec3;

    struct Thruster;

    impl VoxelForceProvider for Thruster {
        fn force_at(&self, _ctx: &ProviderContext<'_>) -> Result<Option<PointForce>, ProviderError> {
            Ok(Some(PointForce::at_center(DVec3::Y)))
        }
    }

    #[test]
    fn test_masses() {
        let mut registry = BlockPhysicsRegistry::new().with_default_mass(50.0);
        let stone = registry.register("stone", BlockPhysics::solid(250.0));

        assert_eq!(registry.mass_of(BlockId::AIR), 0.0);
        assert_eq!(registry.mass_of(stone), 250.0);
        assert_eq!(registry.mass_of(BlockId(999)), 50.0);
        assert_eq!(registry.get_id("stone"), Some(stone));
    }

    #[test]
    fn test_active_blocks() {
        let mut registry = BlockPhysicsRegistry::new();
        let plank = registry.register("plank", BlockPhysics::solid(20.0));
        let engine = registry.register("engine", BlockPhysics::solid(80.0).with_force_provider(Thruster));

        assert!(!registry.is_active(plank));
        assert!(registry.is_active(engine));
        assert!(registry.force_provider(engine).is_some());
        assert!(registry.torque_provider(engine).is_none());
    }

    #[test]
    fn test_register_id_keeps_ids_unique() {
        let mut registry = BlockPhysicsRegistry::new();
        registry.register_id(BlockId(10), BlockPhysics::solid(1.0));
        let next = registry.register("next", BlockPhysics::solid(1.0));
        assert_eq!(next, BlockId(11));
    }
}
