use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::core::{CHUNK_SHIFT, CHUNK_SIZE, VOXEL_CENTER_OFFSET};

/// Identifier of a loaded world (dimension)
pub type WorldId = u32;

/// Position of a chunk column (chunk coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk column containing a voxel
    pub fn from_voxel_pos(pos: VoxelPos) -> Self {
        Self::new(pos.x >> CHUNK_SHIFT, pos.z >> CHUNK_SHIFT)
    }

    /// Pack into a single key: x in the low 32 bits, z in the high 32 bits
    pub fn as_key(&self) -> i64 {
        (self.x as u32 as i64) | ((self.z as u32 as i64) << 32)
    }

    pub fn from_key(key: i64) -> Self {
        Self::new(key as i32, (key >> 32) as i32)
    }

    /// First voxel X of this column
    pub fn x_start(&self) -> i32 {
        self.x << CHUNK_SHIFT
    }

    /// First voxel Z of this column
    pub fn z_start(&self) -> i32 {
        self.z << CHUNK_SHIFT
    }

    /// Center of the column footprint at height `y`, in voxel space
    pub fn center_at(&self, y: f64) -> DVec3 {
        let half = CHUNK_SIZE as f64 / 2.0;
        DVec3::new(self.x_start() as f64 + half, y, self.z_start() as f64 + half)
    }
}

/// Position of a voxel (block coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Get the chunk column this voxel belongs to
    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::from_voxel_pos(*self)
    }

    /// Geometric center of the voxel
    pub fn center(&self) -> DVec3 {
        DVec3::new(
            self.x as f64 + VOXEL_CENTER_OFFSET,
            self.y as f64 + VOXEL_CENTER_OFFSET,
            self.z as f64 + VOXEL_CENTER_OFFSET,
        )
    }

    /// Voxel containing a continuous position
    pub fn from_world_pos(pos: DVec3) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
            z: pos.z.floor() as i32,
        }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// Axis-aligned bounding box in continuous coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min: min.min(max), max: min.max(max) }
    }

    /// Smallest box containing every point
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }
}
