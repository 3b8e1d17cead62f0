use std::sync::atomic::{AtomicI32, Ordering};

use super::ChunkClaim;
use crate::constants::shipyard::{
    CLAIM_SPACING, DEFAULT_CLAIM_RADIUS, MAX_CLAIM_RADIUS, SHIPYARD_ORIGIN_CHUNK_X,
    SHIPYARD_ORIGIN_CHUNK_Z,
};
use crate::error::{ShipError, ShipResult};

/// Hands out disjoint claims in the shipyard region
///
/// Claims are laid out along +X, `CLAIM_SPACING` chunks apart, so even claims
/// grown to `MAX_CLAIM_RADIUS` never touch their neighbours.
#[derive(Debug)]
pub struct ShipyardAllocator {
    next_index: AtomicI32,
}

impl Default for ShipyardAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShipyardAllocator {
    pub fn new() -> Self {
        Self::resume_from(0)
    }

    /// Continue allocating after `next_index` claims were handed out previously
    pub fn resume_from(next_index: i32) -> Self {
        Self {
            next_index: AtomicI32::new(next_index),
        }
    }

    pub fn next_index(&self) -> i32 {
        self.next_index.load(Ordering::Acquire)
    }

    pub fn allocate_default(&self) -> ShipResult<ChunkClaim> {
        self.allocate(DEFAULT_CLAIM_RADIUS)
    }

    pub fn allocate(&self, radius: i32) -> ShipResult<ChunkClaim> {
        if radius > MAX_CLAIM_RADIUS {
            return Err(ShipError::ClaimTooLarge {
                requested: radius,
                max: MAX_CLAIM_RADIUS,
            });
        }
        let index = self.next_index.fetch_add(1, Ordering::AcqRel);
        Ok(ChunkClaim::new(slot_center_x(index), SHIPYARD_ORIGIN_CHUNK_Z, radius))
    }

    /// Keep future allocations clear of a claim handed out elsewhere, e.g. by a loaded save
    pub fn reserve(&self, claim: &ChunkClaim) {
        if let Some(index) = slot_of(claim) {
            self.next_index.fetch_max(index + 1, Ordering::AcqRel);
        }
    }
}

fn slot_center_x(index: i32) -> i32 {
    SHIPYARD_ORIGIN_CHUNK_X + MAX_CLAIM_RADIUS + index * CLAIM_SPACING
}

/// Shipyard slot whose spacing band holds the claim's center
fn slot_of(claim: &ChunkClaim) -> Option<i32> {
    if claim.center_x() < SHIPYARD_ORIGIN_CHUNK_X {
        return None;
    }
    let offset = claim.center_x() - SHIPYARD_ORIGIN_CHUNK_X - MAX_CLAIM_RADIUS;
    // Round to the nearest slot so a claim off its slot center still blocks it
    Some((offset + CLAIM_SPACING / 2).div_euclid(CLAIM_SPACING).max(0))
}

/// Whether a chunk column belongs to the shipyard rather than the regular world
pub fn is_chunk_in_shipyard(chunk_x: i32, _chunk_z: i32) -> bool {
    chunk_x >= SHIPYARD_ORIGIN_CHUNK_X
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_never_overlap_at_max_radius() {
        let allocator = ShipyardAllocator::new();
        let claims: Vec<ChunkClaim> = (0..8)
            .map(|_| allocator.allocate_default().expect("claim"))
            .collect();

        for (i, a) in claims.iter().enumerate() {
            let a = a.grown(MAX_CLAIM_RADIUS).expect("grow");
            assert!(is_chunk_in_shipyard(a.min_x(), a.min_z()));
            for b in claims.iter().skip(i + 1) {
                let b = b.grown(MAX_CLAIM_RADIUS).expect("grow");
                assert!(!a.overlaps(&b));
            }
        }
    }

    #[test]
    fn test_resume_continues_sequence() {
        let first = ShipyardAllocator::new();
        first.allocate_default().expect("claim");
        let second_claim = first.allocate_default().expect("claim");

        let resumed = ShipyardAllocator::resume_from(1);
        assert_eq!(resumed.allocate_default().expect("claim"), second_claim);
    }

    #[test]
    fn test_reserve_skips_claims_in_use() {
        let original = ShipyardAllocator::new();
        original.allocate_default().expect("claim");
        let loaded = original.allocate_default().expect("claim");

        let allocator = ShipyardAllocator::new();
        allocator.reserve(&loaded);
        assert_eq!(allocator.next_index(), 2);
        let fresh = allocator.allocate_default().expect("claim");
        assert!(!fresh.grown(MAX_CLAIM_RADIUS).expect("grow").overlaps(&loaded.grown(MAX_CLAIM_RADIUS).expect("grow")));

        // Reserving an older claim never moves the sequence backwards
        allocator.reserve(&ChunkClaim::new(slot_center_x(0), SHIPYARD_ORIGIN_CHUNK_Z, DEFAULT_CLAIM_RADIUS));
        assert_eq!(allocator.next_index(), 3);
    }

    #[test]
    fn test_rejects_oversized_claims() {
        let allocator = ShipyardAllocator::new();
        assert!(allocator.allocate(MAX_CLAIM_RADIUS + 1).is_err());
        assert_eq!(allocator.next_index(), 0);
    }
}
