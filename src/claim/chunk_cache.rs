//! Claimed chunk cache
//!
//! Keeps every column of a ship's claim in a flat array for O(1) access during
//! force aggregation. Slots hold `Arc`s: a reader clones the `Arc` and keeps a
//! consistent column no matter what writers do afterwards, and a writer swaps
//! in a complete replacement column under a short write lock.

use std::fmt::Display;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{ChunkClaim, ClaimedColumn, VoxelColumn};
use crate::error::ShipResult;
use crate::world::{BlockId, ChunkPos, VoxelPos, VoxelQuery};

struct ChunkGrid<C> {
    claim: ChunkClaim,
    /// Indexed by `ChunkClaim::slot_index`
    slots: Vec<Arc<C>>,
}

/// Fixed-size cache of every column in one ship's claim
pub struct ClaimedChunkCache<C> {
    grid: RwLock<ChunkGrid<C>>,
}

impl<C: ClaimedColumn> ClaimedChunkCache<C> {
    /// Cache for a claim that has never held voxels; every slot starts empty
    pub fn new_empty(claim: ChunkClaim) -> Self {
        let slots = claim.iter().map(|pos| Arc::new(C::empty(pos))).collect();
        Self {
            grid: RwLock::new(ChunkGrid { claim, slots }),
        }
    }

    /// Eagerly load every column of a previously saved claim
    ///
    /// This is O(claim area) and meant to run once per ship load. A column that
    /// fails to load is replaced by an empty one so a single bad chunk never
    /// takes the whole ship down.
    pub fn load<F, E>(claim: ChunkClaim, mut loader: F) -> Self
    where
        F: FnMut(ChunkPos) -> Result<C, E>,
        E: Display,
    {
        let mut failures = 0usize;
        let slots = claim
            .iter()
            .map(|pos| match loader(pos) {
                Ok(column) => Arc::new(column),
                Err(e) => {
                    failures += 1;
                    log::warn!("Failed to load claimed chunk ({}, {}): {}", pos.x, pos.z, e);
                    Arc::new(C::empty(pos))
                }
            })
            .collect();

        if failures > 0 {
            log::warn!(
                "Claim at ({}, {}) loaded with {} empty replacement columns",
                claim.center_x(),
                claim.center_z(),
                failures
            );
        }

        Self {
            grid: RwLock::new(ChunkGrid { claim, slots }),
        }
    }

    pub fn claim(&self) -> ChunkClaim {
        self.grid.read().claim
    }

    /// Column at absolute chunk coordinates
    pub fn chunk_at(&self, x: i32, z: i32) -> ShipResult<Arc<C>> {
        let grid = self.grid.read();
        let index = grid.claim.slot_index(x, z).ok_or_else(|| grid.claim.bounds_error(x, z))?;
        Ok(Arc::clone(&grid.slots[index]))
    }

    /// Column at coordinates relative to the claim minimum
    pub fn chunk_relative(&self, rel_x: usize, rel_z: usize) -> Option<Arc<C>> {
        let grid = self.grid.read();
        let dimension = grid.claim.dimension();
        if rel_x >= dimension || rel_z >= dimension {
            return None;
        }
        grid.slots.get(rel_x * dimension + rel_z).cloned()
    }

    /// Replace the column at absolute chunk coordinates, returning the old one
    pub fn set_chunk_at(&self, x: i32, z: i32, column: C) -> ShipResult<Arc<C>> {
        let mut grid = self.grid.write();
        let index = grid.claim.slot_index(x, z).ok_or_else(|| grid.claim.bounds_error(x, z))?;
        Ok(std::mem::replace(&mut grid.slots[index], Arc::new(column)))
    }

    /// Copy-on-write edit of one column
    ///
    /// `edit` builds the replacement from the current column; the slot is then
    /// swapped in one step. Readers holding the old `Arc` are unaffected.
    pub fn update_chunk_at<R>(
        &self,
        x: i32,
        z: i32,
        edit: impl FnOnce(&C) -> (C, R),
    ) -> ShipResult<R> {
        let mut grid = self.grid.write();
        let index = grid.claim.slot_index(x, z).ok_or_else(|| grid.claim.bounds_error(x, z))?;
        let (replacement, result) = edit(&grid.slots[index]);
        grid.slots[index] = Arc::new(replacement);
        Ok(result)
    }

    /// Grow the claim around the same center, keeping every existing column
    pub fn grow(&self, new_radius: i32) -> ShipResult<ChunkClaim> {
        let mut grid = self.grid.write();
        let grown = grid.claim.grown(new_radius)?;
        if grown == grid.claim {
            return Ok(grown);
        }

        let old_claim = grid.claim;
        let slots = grown
            .iter()
            .map(|pos| match old_claim.slot_index(pos.x, pos.z) {
                Some(index) => Arc::clone(&grid.slots[index]),
                None => Arc::new(C::empty(pos)),
            })
            .collect();

        log::info!(
            "Claim at ({}, {}) grew from radius {} to {}",
            grown.center_x(),
            grown.center_z(),
            old_claim.radius(),
            grown.radius()
        );

        grid.claim = grown;
        grid.slots = slots;
        Ok(grown)
    }

    /// Snapshot of every column, in claim iteration order
    pub fn columns(&self) -> Vec<Arc<C>> {
        self.grid.read().slots.clone()
    }
}

impl ClaimedChunkCache<VoxelColumn> {
    /// Block at a voxel position, air outside the claim
    pub fn block_at(&self, pos: VoxelPos) -> BlockId {
        let chunk = pos.chunk_pos();
        match self.chunk_at(chunk.x, chunk.z) {
            Ok(column) => column.block_at(pos),
            Err(_) => BlockId::AIR,
        }
    }

    /// Every non-air voxel in the claim
    pub fn voxels(&self) -> Vec<(VoxelPos, BlockId)> {
        self.columns()
            .iter()
            .flat_map(|column| column.iter().collect::<Vec<_>>())
            .collect()
    }
}

impl VoxelQuery for ClaimedChunkCache<VoxelColumn> {
    fn block_at(&self, pos: VoxelPos) -> BlockId {
        ClaimedChunkCache::block_at(self, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShipError;
    use std::thread;

    fn cache(radius: i32) -> ClaimedChunkCache<VoxelColumn> {
        ClaimedChunkCache::new_empty(ChunkClaim::new(100, -50, radius))
    }

    #[test]
    fn test_every_slot_populated() {
        let cache = cache(2);
        let claim = cache.claim();
        for pos in claim.iter() {
            let column = cache.chunk_at(pos.x, pos.z).expect("inside claim");
            assert_eq!(column.pos(), pos);
        }
        assert_eq!(cache.columns().len(), 25);
    }

    #[test]
    fn test_out_of_claim_read_and_write_fail() {
        let cache = cache(1);
        let outside = (102, -50);

        let read = cache.chunk_at(outside.0, outside.1);
        assert!(matches!(read, Err(ShipError::ChunkNotInClaim { x: 102, z: -50, .. })));

        let write = cache.set_chunk_at(outside.0, outside.1, VoxelColumn::new(ChunkPos::new(102, -50)));
        assert!(matches!(write, Err(ShipError::ChunkNotInClaim { .. })));

        let update = cache.update_chunk_at(99, -52, |c| (c.clone(), ()));
        assert!(matches!(update, Err(ref e) if e.is_bounds_violation()));
    }

    #[test]
    fn test_set_and_relative_lookup() {
        let cache = cache(1);
        let pos = VoxelPos::new(99 * 16 + 3, 10, -51 * 16 + 2);
        let (column, _) = VoxelColumn::new(ChunkPos::new(99, -51)).with_block(pos, BlockId(4));
        cache.set_chunk_at(99, -51, column).expect("inside claim");

        let relative = cache.chunk_relative(0, 0).expect("min corner");
        assert_eq!(relative.block_at(pos), BlockId(4));
        assert_eq!(cache.block_at(pos), BlockId(4));
        assert!(cache.chunk_relative(3, 0).is_none());
    }

    #[test]
    fn test_reader_keeps_old_column_after_replace() {
        let cache = cache(0);
        let pos = VoxelPos::new(100 * 16, 5, -50 * 16);
        let before = cache.chunk_at(100, -50).expect("inside claim");

        cache
            .update_chunk_at(100, -50, |column| column.with_block(pos, BlockId(9)))
            .expect("inside claim");

        assert_eq!(before.block_at(pos), BlockId::AIR);
        assert_eq!(cache.block_at(pos), BlockId(9));
    }

    #[test]
    fn test_grow_preserves_columns() {
        let cache = cache(1);
        let pos = VoxelPos::new(101 * 16 + 1, 1, -49 * 16 + 1);
        cache
            .update_chunk_at(101, -49, |column| column.with_block(pos, BlockId(3)))
            .expect("inside claim");

        let grown = cache.grow(3).expect("grow");
        assert_eq!(grown.radius(), 3);
        assert_eq!(cache.columns().len(), 49);
        assert_eq!(cache.block_at(pos), BlockId(3));
        assert!(cache.chunk_at(103, -47).is_ok());
        assert!(cache.grow(2).is_err());
        assert_eq!(cache.claim().radius(), 3);
    }

    #[test]
    fn test_load_replaces_failed_columns() {
        let claim = ChunkClaim::new(0, 0, 1);
        let cache: ClaimedChunkCache<VoxelColumn> = ClaimedChunkCache::load(claim, |pos| {
            if pos == ChunkPos::new(1, 1) {
                Err("corrupt column")
            } else {
                let voxel = VoxelPos::new(pos.x_start(), 0, pos.z_start());
                Ok(VoxelColumn::new(pos).with_block(voxel, BlockId(1)).0)
            }
        });

        assert_eq!(cache.voxels().len(), 8);
        assert!(cache.chunk_at(1, 1).expect("inside claim").is_empty());
    }

    #[test]
    fn test_concurrent_readers_see_whole_columns() {
        let cache = Arc::new(cache(0));
        let base = VoxelPos::new(100 * 16, 0, -50 * 16);

        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..200 {
                    cache
                        .update_chunk_at(100, -50, |column| {
                            let (a, _) = column.with_block(base, BlockId(i));
                            let (b, _) = a.with_block(base.offset(1, 0, 0), BlockId(i));
                            (b, ())
                        })
                        .expect("inside claim");
                }
            })
        };

        for _ in 0..200 {
            let column = cache.chunk_at(100, -50).expect("inside claim");
            assert_eq!(column.block_at(base), column.block_at(base.offset(1, 0, 0)));
        }
        writer.join().expect("writer thread");
    }
}
