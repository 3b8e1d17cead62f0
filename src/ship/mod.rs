//! Ship runtime aggregate

pub mod handle;
pub mod names;
pub mod state;

pub use handle::{ShipHandle, ShipParts};
pub use names::{generate_name, random_name};
pub use state::{DeconstructionState, ShipMotion};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ship identifier, unique within a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShipId(pub u64);

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
