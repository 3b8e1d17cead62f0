use std::sync::atomic::{AtomicU64, Ordering};

use glam::DVec3;
use parking_lot::Mutex;

use super::InertiaData;

/// Game-tick inertia copy shared between voxel edits and the physics thread
///
/// Edits mutate the game-tick copy and bump `version`. The integrator keeps its
/// own physics-tick copy and refreshes it through `snapshot_if_changed` once per
/// substep, never mid-substep.
#[derive(Debug)]
pub struct InertiaModel {
    game_tick: Mutex<InertiaData>,
    version: AtomicU64,
}

impl InertiaModel {
    pub fn new(reference: DVec3) -> Self {
        Self::from_data(InertiaData::new(reference))
    }

    pub fn from_data(data: InertiaData) -> Self {
        Self {
            game_tick: Mutex::new(data),
            version: AtomicU64::new(1),
        }
    }

    /// Apply a single voxel change. Masses are the old and new block masses,
    /// zero for air or massless blocks.
    pub fn on_block_changed(&self, center: DVec3, old_mass: f64, new_mass: f64) {
        if old_mass == new_mass && old_mass <= 0.0 {
            return;
        }
        let mut data = self.game_tick.lock();
        data.remove_voxel(center, old_mass);
        data.add_voxel(center, new_mass);
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn game_tick(&self) -> InertiaData {
        *self.game_tick.lock()
    }

    /// Current game-tick copy with the version it corresponds to
    pub fn snapshot(&self) -> (InertiaData, u64) {
        let data = self.game_tick.lock();
        (*data, self.version.load(Ordering::Acquire))
    }

    /// Copy only if edits happened since `seen_version`
    pub fn snapshot_if_changed(&self, seen_version: u64) -> Option<(InertiaData, u64)> {
        if self.version() == seen_version {
            return None;
        }
        Some(self.snapshot())
    }

    pub fn replace(&self, data: InertiaData) {
        let mut current = self.game_tick.lock();
        *current = data;
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    /// Compare against a from-scratch recompute and adopt it when drift exceeds `tolerance`
    ///
    /// Returns the observed deviation.
    pub fn reconcile(&self, recomputed: InertiaData, tolerance: f64) -> f64 {
        let mut current = self.game_tick.lock();
        let deviation = current.deviation_from(&recomputed);
        if deviation > tolerance {
            log::warn!(
                "Inertia drifted {:.3e} from recompute ({} voxels); adopting recomputed values",
                deviation,
                recomputed.voxel_count()
            );
            *current = recomputed;
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        deviation
    }
}
