// Ship Physics Constants - SINGLE SOURCE OF TRUTH
//
// This file contains the tunable constants used throughout the crate.
// Runtime-adjustable values live in `PhysicsConfig`; the defaults for those
// values are defined here so there is exactly one place to change them.

/// Block grid geometry
pub mod core {
    /// Chunk columns are 16×16 voxels wide
    pub const CHUNK_SHIFT: i32 = 4;
    pub const CHUNK_SIZE: i32 = 1 << CHUNK_SHIFT;

    /// Vertical extent of a voxel column
    pub const COLUMN_HEIGHT: i32 = 256;

    /// Voxel center offset from its integer corner
    pub const VOXEL_CENTER_OFFSET: f64 = 0.5;
}

/// Shipyard layout - where ship subspaces live in chunk coordinates
pub mod shipyard {
    /// First chunk X of the shipyard region
    pub const SHIPYARD_ORIGIN_CHUNK_X: i32 = 320_000;

    /// All claims are centered on this chunk Z
    pub const SHIPYARD_ORIGIN_CHUNK_Z: i32 = 0;

    /// Radius handed to new claims unless a caller asks for more
    pub const DEFAULT_CLAIM_RADIUS: i32 = 7;

    /// Largest radius a claim may grow to; also fixes the spacing between claims
    pub const MAX_CLAIM_RADIUS: i32 = 31;

    /// Distance in chunks between neighbouring claim centers
    pub const CLAIM_SPACING: i32 = MAX_CLAIM_RADIUS * 2 + 1;
}

/// Rigid body defaults (SI-like units: blocks, seconds, kilograms)
pub mod physics_constants {
    /// Gravitational acceleration (blocks/s²)
    pub const GRAVITY: [f64; 3] = [0.0, -9.8, 0.0];

    /// Per-game-tick velocity retention
    pub const DRAG_CONSTANT: f64 = 0.99;

    /// Game ticks per second used as the drag exponent scale
    pub const DRAG_REFERENCE_RATE: f64 = 20.0;

    /// Squared speed above which a ship is considered broken
    pub const INSTABILITY_THRESHOLD: f64 = 50_000.0;

    /// Vertical limits for ship centers of mass
    pub const SHIP_LOWER_LIMIT: f64 = -64.0;
    pub const SHIP_UPPER_LIMIT: f64 = 1_000.0;

    /// Physics timeline rate (passes per second)
    pub const PHYSICS_TICK_RATE_HZ: f64 = 100.0;
    pub const SUBSTEPS_PER_TICK: u32 = 1;

    /// Seconds a grid-aligning ship would need to close its remaining angle
    pub const GRID_ALIGNMENT_TIME_CONSTANT: f64 = 1.0;

    /// Remaining angle (radians) below which a ship counts as grid aligned
    pub const GRID_ALIGNMENT_EPSILON: f64 = 1.0e-6;

    /// Relative deviation tolerated between incremental and recomputed inertia
    pub const INERTIA_DRIFT_TOLERANCE: f64 = 1.0e-6;

    /// Mass assigned to solid blocks without a registered mass (kg)
    pub const DEFAULT_BLOCK_MASS: f64 = 100.0;

    /// Number of pass durations kept for the rolling average
    pub const TICK_STATS_WINDOW: usize = 100;
}

/// Persistence constants
pub mod persistence_constants {
    /// Version of the ship record format
    pub const SHIP_FORMAT_VERSION: u32 = 1;

    /// Magic bytes identifying ship records
    pub const SHIP_MAGIC: &[u8; 4] = b"VSHP";

    /// File extension for saved ships
    pub const SHIP_FILE_EXTENSION: &str = "ship";

    /// Tolerated deviation of a stored quaternion norm from 1 before it is rejected
    pub const ROTATION_NORM_TOLERANCE: f64 = 1.0e-3;
}

/// Ship naming
pub mod naming {
    /// Nouns per generated ship name
    pub const DEFAULT_NOUNS_PER_NAME: usize = 3;
}
