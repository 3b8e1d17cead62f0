//! Shared per-ship state
//!
//! A `ShipHandle` is shared between the host thread, which edits voxels and
//! issues administrative requests, and the world's physics thread, which owns
//! the ship's integrator. Each field has one writer:
//!
//! - voxels, claim, game-tick inertia and active positions: host edits
//! - physics transforms and velocities: the integrator
//! - game-tick transforms: the scheduler's synchronization step, or a teleport
//!
//! Readers always receive whole values copied out under a short lock.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use glam::{DQuat, DVec3};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use super::{DeconstructionState, ShipId, ShipMotion};
use crate::claim::{ChunkClaim, ClaimedChunkCache, VoxelColumn};
use crate::constants::core::COLUMN_HEIGHT;
use crate::error::{ShipError, ShipResult};
use crate::inertia::{InertiaData, InertiaModel};
use crate::physics::{BlockPhysicsRegistry, PilotInput};
use crate::transform::{ShipTransform, TransformManager, TransformSelector, TransformType};
use crate::world::{Aabb, BlockId, ChunkPos, VoxelPos};

/// Everything needed to bring a ship back from storage
pub struct ShipParts {
    pub id: ShipId,
    pub name: String,
    pub chunks: ClaimedChunkCache<VoxelColumn>,
    pub transform: Option<ShipTransform>,
    pub motion: ShipMotion,
}

pub struct ShipHandle {
    id: ShipId,
    name: String,
    registry: Arc<BlockPhysicsRegistry>,
    chunks: ClaimedChunkCache<VoxelColumn>,
    inertia: InertiaModel,
    occupied: AtomicUsize,
    transforms: RwLock<TransformManager>,
    motion: RwLock<ShipMotion>,
    force_to_game: AtomicBool,
    deconstruction: Mutex<DeconstructionState>,
    active_positions: RwLock<Arc<BTreeSet<VoxelPos>>>,
    local_bounds: Mutex<Option<Aabb>>,
    pilot: RwLock<Option<Arc<dyn PilotInput>>>,
}

impl ShipHandle {
    /// Ship with no voxels yet
    pub fn new(id: ShipId, name: impl Into<String>, claim: ChunkClaim, registry: Arc<BlockPhysicsRegistry>) -> Self {
        Self::from_parts(
            ShipParts {
                id,
                name: name.into(),
                chunks: ClaimedChunkCache::new_empty(claim),
                transform: None,
                motion: ShipMotion::default(),
            },
            registry,
        )
    }

    /// Rebuild a ship around already loaded voxels
    ///
    /// Inertia, bounds and active positions are recomputed from the voxels. A
    /// missing transform defaults to an unrotated one at the center of mass.
    pub fn from_parts(parts: ShipParts, registry: Arc<BlockPhysicsRegistry>) -> Self {
        let ShipParts {
            id,
            name,
            chunks,
            transform,
            motion,
        } = parts;

        let voxels = chunks.voxels();
        let reference = inertia_reference(&chunks.claim());
        let inertia = InertiaData::from_voxels(
            reference,
            voxels.iter().map(|(pos, block)| (pos.center(), registry.mass_of(*block))),
        );
        let active: BTreeSet<VoxelPos> = voxels
            .iter()
            .filter(|(_, block)| registry.is_active(*block))
            .map(|(pos, _)| *pos)
            .collect();
        let bounds = voxel_bounds(voxels.iter().map(|(pos, _)| *pos));
        let transform = transform.unwrap_or_else(|| ShipTransform::identity_at(inertia.center_of_mass()));

        Self {
            id,
            name,
            registry,
            chunks,
            inertia: InertiaModel::from_data(inertia),
            occupied: AtomicUsize::new(voxels.len()),
            transforms: RwLock::new(TransformManager::new(transform)),
            motion: RwLock::new(motion),
            force_to_game: AtomicBool::new(false),
            deconstruction: Mutex::new(DeconstructionState::Normal),
            active_positions: RwLock::new(Arc::new(active)),
            local_bounds: Mutex::new(bounds),
            pilot: RwLock::new(None),
        }
    }

    pub fn id(&self) -> ShipId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<BlockPhysicsRegistry> {
        &self.registry
    }

    pub fn claim(&self) -> ChunkClaim {
        self.chunks.claim()
    }

    pub fn chunks(&self) -> &ClaimedChunkCache<VoxelColumn> {
        &self.chunks
    }

    pub fn inertia(&self) -> &InertiaModel {
        &self.inertia
    }

    pub fn block_at(&self, pos: VoxelPos) -> BlockId {
        self.chunks.block_at(pos)
    }

    /// Place or remove (`BlockId::AIR`) one voxel, returning the previous block
    pub fn set_voxel(&self, pos: VoxelPos, block: BlockId) -> ShipResult<BlockId> {
        if !self.chunks.claim().contains_voxel(pos) {
            return Err(ShipError::VoxelOutsideClaim { ship: self.id, pos });
        }

        let chunk = pos.chunk_pos();
        let previous = self
            .chunks
            .update_chunk_at(chunk.x, chunk.z, |column| column.with_block(pos, block))?;
        self.apply_change(pos, previous, block);
        Ok(previous)
    }

    /// Apply many edits with one column replacement per touched column
    ///
    /// Every position is checked against the claim before anything changes.
    /// Returns how many voxels actually changed.
    pub fn set_voxels(&self, edits: &[(VoxelPos, BlockId)]) -> ShipResult<usize> {
        let claim = self.chunks.claim();
        if let Some((pos, _)) = edits.iter().find(|(pos, _)| !claim.contains_voxel(*pos)) {
            return Err(ShipError::VoxelOutsideClaim { ship: self.id, pos: *pos });
        }

        let mut by_column: FxHashMap<ChunkPos, Vec<(VoxelPos, BlockId)>> = FxHashMap::default();
        for &(pos, block) in edits {
            by_column.entry(pos.chunk_pos()).or_default().push((pos, block));
        }

        let mut changed = 0;
        for (chunk, column_edits) in by_column {
            let previous = self
                .chunks
                .update_chunk_at(chunk.x, chunk.z, |column| column.with_blocks(&column_edits))?;
            for (&(pos, block), previous) in column_edits.iter().zip(previous) {
                if self.apply_change(pos, previous, block) {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Inertia, occupancy, active set and bounds bookkeeping for one stored edit
    fn apply_change(&self, pos: VoxelPos, previous: BlockId, block: BlockId) -> bool {
        if previous == block {
            return false;
        }

        self.inertia.on_block_changed(
            pos.center(),
            self.registry.mass_of(previous),
            self.registry.mass_of(block),
        );

        match (previous.is_air(), block.is_air()) {
            (true, false) => {
                self.occupied.fetch_add(1, Ordering::AcqRel);
            }
            (false, true) => {
                self.occupied.fetch_sub(1, Ordering::AcqRel);
            }
            _ => {}
        }

        let was_active = self.registry.is_active(previous);
        let is_active = self.registry.is_active(block);
        if was_active != is_active {
            let mut positions = self.active_positions.write();
            let mut next = BTreeSet::clone(&positions);
            if is_active {
                next.insert(pos);
            } else {
                next.remove(&pos);
            }
            *positions = Arc::new(next);
        }

        if !block.is_air() {
            let mut bounds = self.local_bounds.lock();
            *bounds = Some(match *bounds {
                Some(existing) => existing.union(&voxel_cell(pos)),
                None => voxel_cell(pos),
            });
        }
        true
    }

    /// Grow the claim; existing voxels keep their columns
    pub fn grow_claim(&self, new_radius: i32) -> ShipResult<ChunkClaim> {
        self.chunks.grow(new_radius)
    }

    /// Recompute inertia from scratch and adopt it if the incremental copy drifted
    pub fn verify_inertia(&self, tolerance: f64) -> f64 {
        let voxels = self.chunks.voxels();
        let recomputed = InertiaData::from_voxels(
            self.inertia.game_tick().reference(),
            voxels.iter().map(|(pos, block)| (pos.center(), self.registry.mass_of(*block))),
        );
        *self.local_bounds.lock() = voxel_bounds(voxels.iter().map(|(pos, _)| *pos));
        self.occupied.store(voxels.len(), Ordering::Release);
        self.inertia.reconcile(recomputed, tolerance)
    }

    /// Stored voxels, massless ones included
    pub fn voxel_count(&self) -> usize {
        self.occupied.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count() == 0
    }

    pub fn mass(&self) -> f64 {
        self.inertia.game_tick().mass()
    }

    /// Snapshot of voxels with force or torque providers, in position order
    pub fn active_force_positions(&self) -> Arc<BTreeSet<VoxelPos>> {
        Arc::clone(&self.active_positions.read())
    }

    pub fn transform(&self, selector: TransformSelector) -> ShipTransform {
        self.transforms.read().current(selector)
    }

    pub fn transform_manager(&self) -> TransformManager {
        self.transforms.read().clone()
    }

    pub fn interpolated_transform(&self, selector: TransformSelector, alpha: f64) -> ShipTransform {
        self.transforms.read().interpolated(selector, alpha)
    }

    pub fn transform_position(&self, pos: DVec3, selector: TransformSelector, kind: TransformType) -> DVec3 {
        self.transforms.read().transform_position(pos, selector, kind)
    }

    pub fn transform_direction(&self, dir: DVec3, selector: TransformSelector, kind: TransformType) -> DVec3 {
        self.transforms.read().transform_direction(dir, selector, kind)
    }

    pub(crate) fn transforms(&self) -> &RwLock<TransformManager> {
        &self.transforms
    }

    /// Global box around every voxel the ship has held, from the selected transform
    pub fn global_bounds(&self, selector: TransformSelector) -> Option<Aabb> {
        let local = (*self.local_bounds.lock())?;
        let transform = self.transform(selector);
        Aabb::from_points(
            local
                .corners()
                .iter()
                .map(|corner| transform.transform_position(*corner, TransformType::SubspaceToGlobal)),
        )
    }

    pub fn motion(&self) -> ShipMotion {
        *self.motion.read()
    }

    pub(crate) fn store_velocities(&self, linear: DVec3, angular: DVec3) {
        let mut motion = self.motion.write();
        motion.linear_velocity = linear;
        motion.angular_velocity = angular;
    }

    pub fn physics_enabled(&self) -> bool {
        self.motion.read().physics_enabled
    }

    pub fn set_physics_enabled(&self, enabled: bool) {
        self.motion.write().physics_enabled = enabled;
    }

    /// Move the ship to a new pose at the next substep boundary, dropping its velocity
    ///
    /// The rotation is kept when `rotation` is `None`.
    pub fn teleport(&self, position: DVec3, rotation: Option<DQuat>) {
        {
            let mut transforms = self.transforms.write();
            let current = transforms.current(TransformSelector::Physics);
            let inertia = self.inertia.game_tick();
            let center_of_mass = if inertia.is_empty() {
                current.center_of_mass()
            } else {
                inertia.center_of_mass()
            };
            let target = ShipTransform::new(position, rotation.unwrap_or_else(|| current.rotation()), center_of_mass);
            transforms.set_game_transform(target);
            self.force_to_game.store(true, Ordering::Release);
        }
    }

    /// Ask the next substep to rebuild physics from the game-tick transform
    pub fn force_to_game_transform(&self) {
        let _transforms = self.transforms.write();
        self.force_to_game.store(true, Ordering::Release);
    }

    /// Consumes the request; true at most once per request
    ///
    /// Callers hold the transform write lock so a game-tick commit cannot slip
    /// between the check and the reset.
    pub(crate) fn take_force_to_game(&self) -> bool {
        self.force_to_game.swap(false, Ordering::AcqRel)
    }

    /// Publish the latest physics pose as the game-tick transform
    ///
    /// While a forced reset is pending the host-set pose stays authoritative
    /// and is returned unchanged.
    pub fn commit_game_tick(&self) -> ShipTransform {
        let mut transforms = self.transforms.write();
        if self.force_to_game.load(Ordering::Acquire) {
            return transforms.current(TransformSelector::GameTick);
        }
        transforms.commit_game_tick()
    }

    pub fn deconstruction_state(&self) -> DeconstructionState {
        *self.deconstruction.lock()
    }

    pub fn request_deconstruction(&self, immediate: bool) -> DeconstructionState {
        let mut state = self.deconstruction.lock();
        *state = state.after_request(immediate);
        *state
    }

    pub(crate) fn set_deconstruction_state(&self, next: DeconstructionState) {
        *self.deconstruction.lock() = next;
    }

    pub fn set_pilot(&self, pilot: Option<Arc<dyn PilotInput>>) {
        *self.pilot.write() = pilot;
    }

    pub fn pilot(&self) -> Option<Arc<dyn PilotInput>> {
        self.pilot.read().clone()
    }
}

impl std::fmt::Debug for ShipHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("claim", &self.claim())
            .field("voxels", &self.voxel_count())
            .finish()
    }
}

/// Mid-height center of the claim; keeps inertia moments small
fn inertia_reference(claim: &ChunkClaim) -> DVec3 {
    claim.center_pos().center_at(COLUMN_HEIGHT as f64 / 2.0)
}

fn voxel_cell(pos: VoxelPos) -> Aabb {
    let min = DVec3::new(pos.x as f64, pos.y as f64, pos.z as f64);
    Aabb::new(min, min + DVec3::ONE)
}

fn voxel_bounds(positions: impl IntoIterator<Item = VoxelPos>) -> Option<Aabb> {
    positions
        .into_iter()
        .map(voxel_cell)
        .reduce(|acc, cell| acc.union(&cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BlockPhysics, PointForce, ProviderContext, ProviderError, VoxelForceProvider};

    struct Lift;

    impl VoxelForceProvider for Lift {
        fn force_at(&self, _ctx: &ProviderContext<'_>) -> Result<Option<PointForce>, ProviderError> {
            Ok(Some(PointForce::at_center(DVec3::Y)))
        }
    }

    fn ship() -> (ShipHandle, BlockId, BlockId) {
        let mut registry = BlockPhysicsRegistry::new();
        let hull = registry.register("hull", BlockPhysics::solid(100.0));
        let lift = registry.register("lift", BlockPhysics::solid(50.0).with_force_provider(Lift));
        let handle = ShipHandle::new(ShipId(1), "test", ChunkClaim::new(0, 0, 1), Arc::new(registry));
        (handle, hull, lift)
    }

    #[test]
    fn test_set_voxel_updates_inertia_and_active_set() {
        let (ship, hull, lift) = ship();
        ship.set_voxel(VoxelPos::new(0, 64, 0), hull).expect("inside claim");
        ship.set_voxel(VoxelPos::new(1, 64, 0), lift).expect("inside claim");

        assert_eq!(ship.voxel_count(), 2);
        assert_eq!(ship.mass(), 150.0);
        let active = ship.active_force_positions();
        assert_eq!(active.len(), 1);
        assert!(active.contains(&VoxelPos::new(1, 64, 0)));

        let previous = ship.set_voxel(VoxelPos::new(1, 64, 0), BlockId::AIR).expect("inside claim");
        assert_eq!(previous, lift);
        assert!(ship.active_force_positions().is_empty());
        assert!(active.contains(&VoxelPos::new(1, 64, 0)));
        assert_eq!(ship.mass(), 100.0);
    }

    #[test]
    fn test_massless_voxels_still_count_as_occupied() {
        let mut registry = BlockPhysicsRegistry::new();
        let hull = registry.register("hull", BlockPhysics::solid(100.0));
        let glass = registry.register("glass", BlockPhysics::solid(0.0));
        let ship = ShipHandle::new(ShipId(1), "test", ChunkClaim::new(0, 0, 1), Arc::new(registry));

        ship.set_voxel(VoxelPos::new(0, 64, 0), hull).expect("inside claim");
        ship.set_voxel(VoxelPos::new(1, 64, 0), glass).expect("inside claim");
        ship.set_voxel(VoxelPos::new(0, 64, 0), BlockId::AIR).expect("inside claim");

        assert_eq!(ship.voxel_count(), 1);
        assert!(!ship.is_empty());
        assert_eq!(ship.mass(), 0.0);
        ship.verify_inertia(1e-9);
        assert_eq!(ship.voxel_count(), 1);
    }

    #[test]
    fn test_set_voxels_batches_edits() {
        let (ship, hull, lift) = ship();
        let edits: Vec<(VoxelPos, BlockId)> = (0..16)
            .map(|x| (VoxelPos::new(x, 64, 0), hull))
            .chain([(VoxelPos::new(-1, 64, 0), lift), (VoxelPos::new(0, 64, 0), BlockId::AIR)])
            .collect();

        assert_eq!(ship.set_voxels(&edits).expect("inside claim"), 18);
        assert_eq!(ship.voxel_count(), 16);
        assert_eq!(ship.mass(), 15.0 * 100.0 + 50.0);
        assert_eq!(ship.block_at(VoxelPos::new(0, 64, 0)), BlockId::AIR);
        assert!(ship.active_force_positions().contains(&VoxelPos::new(-1, 64, 0)));

        let outside = [(VoxelPos::new(1, 65, 0), hull), (VoxelPos::new(2 * 16, 64, 0), hull)];
        assert!(matches!(ship.set_voxels(&outside), Err(ShipError::VoxelOutsideClaim { .. })));
        assert_eq!(ship.block_at(VoxelPos::new(1, 65, 0)), BlockId::AIR);
    }

    #[test]
    fn test_set_voxel_outside_claim_rejected() {
        let (ship, hull, _) = ship();
        let outside = VoxelPos::new(2 * 16, 64, 0);
        assert!(matches!(
            ship.set_voxel(outside, hull),
            Err(ShipError::VoxelOutsideClaim { .. })
        ));
        assert!(ship.set_voxel(VoxelPos::new(0, 300, 0), hull).is_err());
        assert_eq!(ship.voxel_count(), 0);
    }

    #[test]
    fn test_grow_then_place_in_new_area() {
        let (ship, hull, _) = ship();
        let far = VoxelPos::new(2 * 16 + 3, 64, 0);
        assert!(ship.set_voxel(far, hull).is_err());
        ship.grow_claim(2).expect("grow");
        ship.set_voxel(far, hull).expect("inside grown claim");
        assert_eq!(ship.block_at(far), hull);
    }

    #[test]
    fn test_teleport_sets_flag_once() {
        let (ship, _, _) = ship();
        ship.teleport(DVec3::new(10.0, 80.0, 10.0), None);

        let game = ship.transform(TransformSelector::GameTick);
        assert_eq!(game.position(), DVec3::new(10.0, 80.0, 10.0));
        assert!(ship.take_force_to_game());
        assert!(!ship.take_force_to_game());
    }

    #[test]
    fn test_global_bounds_follow_transform() {
        let (ship, hull, _) = ship();
        ship.set_voxel(VoxelPos::new(0, 64, 0), hull).expect("inside claim");
        let bounds = ship.global_bounds(TransformSelector::GameTick).expect("has voxels");
        assert!(bounds.contains(DVec3::new(0.5, 64.5, 0.5)));

        ship.teleport(DVec3::new(1000.0, 64.5, 0.5), None);
        let moved = ship.global_bounds(TransformSelector::GameTick).expect("has voxels");
        let center = ship.transform_position(
            DVec3::new(0.5, 64.5, 0.5),
            TransformSelector::GameTick,
            TransformType::SubspaceToGlobal,
        );
        assert!(moved.contains(center));
        assert!(!moved.contains(DVec3::new(0.5, 64.5, 0.5)));
    }

    #[test]
    fn test_verify_inertia_is_consistent() {
        let (ship, hull, lift) = ship();
        for i in 0..10 {
            ship.set_voxel(VoxelPos::new(i, 64, i % 3), if i % 2 == 0 { hull } else { lift })
                .expect("inside claim");
        }
        ship.set_voxel(VoxelPos::new(4, 64, 1), BlockId::AIR).expect("inside claim");
        assert!(ship.verify_inertia(1e-6) < 1e-9);
    }
}
