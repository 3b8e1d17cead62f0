use rustc_hash::FxHashMap;

use crate::world::{BlockId, ChunkPos, VoxelPos};

/// Column type storable in a `ClaimedChunkCache`
pub trait ClaimedColumn: Send + Sync {
    /// Column used for fresh claims and for slots that failed to load
    fn empty(pos: ChunkPos) -> Self;
}

/// Voxel storage for one 16×16 chunk column of a ship
///
/// Columns are never mutated once they sit in a cache slot; edits produce a new
/// column that replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelColumn {
    pos: ChunkPos,
    blocks: FxHashMap<VoxelPos, BlockId>,
}

impl VoxelColumn {
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            blocks: FxHashMap::default(),
        }
    }

    /// Build a column from existing contents; voxels from other columns are dropped
    pub fn from_blocks(pos: ChunkPos, blocks: impl IntoIterator<Item = (VoxelPos, BlockId)>) -> Self {
        let blocks = blocks
            .into_iter()
            .filter(|(voxel, block)| voxel.chunk_pos() == pos && !block.is_air())
            .collect();
        Self { pos, blocks }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn block_at(&self, pos: VoxelPos) -> BlockId {
        self.blocks.get(&pos).copied().unwrap_or(BlockId::AIR)
    }

    /// Copy of this column with one voxel replaced; also returns the previous block
    ///
    /// Clones the whole column; see `with_blocks` for bulk edits.
    pub fn with_block(&self, pos: VoxelPos, block: BlockId) -> (Self, BlockId) {
        let mut next = self.clone();
        let previous = next.put(pos, block);
        (next, previous)
    }

    /// Copy of this column with every edit applied in order
    ///
    /// Each copy clones the whole column, so callers placing many voxels
    /// should batch them here rather than call `with_block` per voxel. The
    /// previous block of each edit is returned in edit order.
    pub fn with_blocks(&self, edits: &[(VoxelPos, BlockId)]) -> (Self, Vec<BlockId>) {
        let mut next = self.clone();
        let previous = edits
            .iter()
            .map(|&(pos, block)| next.put(pos, block))
            .collect();
        (next, previous)
    }

    fn put(&mut self, pos: VoxelPos, block: BlockId) -> BlockId {
        let previous = if block.is_air() {
            self.blocks.remove(&pos)
        } else {
            self.blocks.insert(pos, block)
        };
        previous.unwrap_or(BlockId::AIR)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VoxelPos, BlockId)> + '_ {
        self.blocks.iter().map(|(pos, block)| (*pos, *block))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl ClaimedColumn for VoxelColumn {
    fn empty(pos: ChunkPos) -> Self {
        Self::new(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_block_leaves_original_untouched() {
        let column = VoxelColumn::new(ChunkPos::new(0, 0));
        let pos = VoxelPos::new(3, 64, 4);
        let (next, previous) = column.with_block(pos, BlockId(7));

        assert_eq!(previous, BlockId::AIR);
        assert_eq!(column.block_at(pos), BlockId::AIR);
        assert_eq!(next.block_at(pos), BlockId(7));

        let (cleared, previous) = next.with_block(pos, BlockId::AIR);
        assert_eq!(previous, BlockId(7));
        assert!(cleared.is_empty());
    }

    #[test]
    fn test_with_blocks_reports_previous_in_edit_order() {
        let pos = VoxelPos::new(1, 10, 1);
        let column = VoxelColumn::from_blocks(ChunkPos::new(0, 0), vec![(pos, BlockId(2))]);
        let other = VoxelPos::new(2, 10, 1);

        let (next, previous) = column.with_blocks(&[(pos, BlockId(3)), (other, BlockId(4)), (pos, BlockId::AIR)]);
        assert_eq!(previous, vec![BlockId(2), BlockId::AIR, BlockId(3)]);
        assert_eq!(next.block_at(pos), BlockId::AIR);
        assert_eq!(next.block_at(other), BlockId(4));
        assert_eq!(next.len(), 1);
        assert_eq!(column.block_at(pos), BlockId(2));
    }

    #[test]
    fn test_from_blocks_filters_foreign_voxels() {
        let column = VoxelColumn::from_blocks(
            ChunkPos::new(0, 0),
            vec![
                (VoxelPos::new(1, 1, 1), BlockId(2)),
                (VoxelPos::new(17, 1, 1), BlockId(2)),
                (VoxelPos::new(2, 1, 1), BlockId::AIR),
            ],
        );
        assert_eq!(column.len(), 1);
    }
}
