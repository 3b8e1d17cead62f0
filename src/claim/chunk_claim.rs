use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::core::COLUMN_HEIGHT;
use crate::constants::shipyard::MAX_CLAIM_RADIUS;
use crate::error::{ShipError, ShipResult};
use crate::world::{Aabb, ChunkPos, VoxelPos};

/// Square region of chunk columns reserved for one ship
///
/// A claim of radius `r` around `(center_x, center_z)` covers every column with
/// `|x - center_x| <= r` and `|z - center_z| <= r`, so it always holds
/// `(2r + 1)²` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkClaim {
    center_x: i32,
    center_z: i32,
    radius: i32,
}

impl ChunkClaim {
    pub fn new(center_x: i32, center_z: i32, radius: i32) -> Self {
        Self {
            center_x,
            center_z,
            radius: radius.max(0),
        }
    }

    pub fn center_x(&self) -> i32 {
        self.center_x
    }

    pub fn center_z(&self) -> i32 {
        self.center_z
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn center_pos(&self) -> ChunkPos {
        ChunkPos::new(self.center_x, self.center_z)
    }

    pub fn min_x(&self) -> i32 {
        self.center_x - self.radius
    }

    pub fn max_x(&self) -> i32 {
        self.center_x + self.radius
    }

    pub fn min_z(&self) -> i32 {
        self.center_z - self.radius
    }

    pub fn max_z(&self) -> i32 {
        self.center_z + self.radius
    }

    /// Columns along one side
    pub fn dimension(&self) -> usize {
        (self.radius * 2 + 1) as usize
    }

    pub fn slot_count(&self) -> usize {
        self.dimension() * self.dimension()
    }

    pub fn contains_chunk(&self, x: i32, z: i32) -> bool {
        x >= self.min_x() && x <= self.max_x() && z >= self.min_z() && z <= self.max_z()
    }

    pub fn contains_voxel(&self, pos: VoxelPos) -> bool {
        let chunk = pos.chunk_pos();
        self.contains_chunk(chunk.x, chunk.z) && pos.y >= 0 && pos.y < COLUMN_HEIGHT
    }

    /// Row-major slot index (x outer, z inner) of a chunk inside the claim
    pub fn slot_index(&self, x: i32, z: i32) -> Option<usize> {
        if !self.contains_chunk(x, z) {
            return None;
        }
        let rel_x = (x - self.min_x()) as usize;
        let rel_z = (z - self.min_z()) as usize;
        Some(rel_x * self.dimension() + rel_z)
    }

    /// Error describing an access at `(x, z)` outside this claim
    pub fn bounds_error(&self, x: i32, z: i32) -> ShipError {
        ShipError::ChunkNotInClaim {
            x,
            z,
            center_x: self.center_x,
            center_z: self.center_z,
            radius: self.radius,
        }
    }

    /// Fail unless `(x, z)` lies in the claim
    pub fn check_contains(&self, x: i32, z: i32) -> ShipResult<()> {
        if self.contains_chunk(x, z) {
            Ok(())
        } else {
            Err(self.bounds_error(x, z))
        }
    }

    /// Every claimed column, x-major then z
    pub fn iter(&self) -> impl Iterator<Item = ChunkPos> {
        let (min_x, max_x, min_z, max_z) = (self.min_x(), self.max_x(), self.min_z(), self.max_z());
        (min_x..=max_x).flat_map(move |x| (min_z..=max_z).map(move |z| ChunkPos::new(x, z)))
    }

    /// Packed keys of every claimed column
    pub fn chunk_keys(&self) -> Vec<i64> {
        self.iter().map(|pos| pos.as_key()).collect()
    }

    /// A claim with the same center and a radius at least as large
    pub fn grown(&self, new_radius: i32) -> ShipResult<ChunkClaim> {
        if new_radius < self.radius {
            return Err(ShipError::ClaimShrink {
                current: self.radius,
                requested: new_radius,
            });
        }
        if new_radius > MAX_CLAIM_RADIUS {
            return Err(ShipError::ClaimTooLarge {
                requested: new_radius,
                max: MAX_CLAIM_RADIUS,
            });
        }
        Ok(Self::new(self.center_x, self.center_z, new_radius))
    }

    pub fn overlaps(&self, other: &ChunkClaim) -> bool {
        self.min_x() <= other.max_x()
            && self.max_x() >= other.min_x()
            && self.min_z() <= other.max_z()
            && self.max_z() >= other.min_z()
    }

    /// Voxel-space box covering every claimed column
    pub fn voxel_bounds(&self) -> Aabb {
        let min = ChunkPos::new(self.min_x(), self.min_z());
        let max = ChunkPos::new(self.max_x() + 1, self.max_z() + 1);
        Aabb::new(
            DVec3::new(min.x_start() as f64, 0.0, min.z_start() as f64),
            DVec3::new(max.x_start() as f64, COLUMN_HEIGHT as f64, max.z_start() as f64),
        )
    }
}
