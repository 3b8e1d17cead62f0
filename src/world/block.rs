use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a block type
///
/// Block type registration belongs to the host; the ship core only needs to
/// tell air apart from everything else and to key mass and provider tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);

    pub fn is_air(&self) -> bool {
        *self == BlockId::AIR
    }
}

impl Default for BlockId {
    fn default() -> Self {
        BlockId::AIR
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BlockId::AIR => write!(f, "Air"),
            BlockId(id) => write!(f, "Block#{}", id),
        }
    }
}
