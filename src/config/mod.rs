//! Physics configuration
//!
//! `PhysicsConfig` is an immutable value handed to the scheduler and every
//! integrator at construction. Changing a setting means building a new value
//! (the `with_*` methods) and handing it over; nothing mutates a shared config
//! in place.

use std::path::Path;
use std::time::Duration;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::physics_constants as defaults;
use crate::error::{ShipError, ShipResult};

/// Immutable physics settings for one world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravitational acceleration in global space
    pub gravity: [f64; 3],
    pub gravity_enabled: bool,
    /// Whether per-voxel force and torque providers run
    pub voxel_forces_enabled: bool,
    /// Velocity retained per reference tick, in (0, 1]
    pub drag_constant: f64,
    /// Reference ticks per second in the drag exponent
    pub drag_reference_rate: f64,
    /// Squared linear or angular speed that marks a ship as broken
    pub instability_threshold: f64,
    pub ship_lower_limit: f64,
    pub ship_upper_limit: f64,
    /// Scheduler passes per second
    pub tick_rate_hz: f64,
    pub substeps_per_tick: u32,
    pub grid_alignment_time_constant: f64,
    pub grid_alignment_epsilon: f64,
    pub inertia_drift_tolerance: f64,
    /// Pass durations kept for the rolling average
    pub tick_stats_window: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: defaults::GRAVITY,
            gravity_enabled: true,
            voxel_forces_enabled: true,
            drag_constant: defaults::DRAG_CONSTANT,
            drag_reference_rate: defaults::DRAG_REFERENCE_RATE,
            instability_threshold: defaults::INSTABILITY_THRESHOLD,
            ship_lower_limit: defaults::SHIP_LOWER_LIMIT,
            ship_upper_limit: defaults::SHIP_UPPER_LIMIT,
            tick_rate_hz: defaults::PHYSICS_TICK_RATE_HZ,
            substeps_per_tick: defaults::SUBSTEPS_PER_TICK,
            grid_alignment_time_constant: defaults::GRID_ALIGNMENT_TIME_CONSTANT,
            grid_alignment_epsilon: defaults::GRID_ALIGNMENT_EPSILON,
            inertia_drift_tolerance: defaults::INERTIA_DRIFT_TOLERANCE,
            tick_stats_window: defaults::TICK_STATS_WINDOW,
        }
    }
}

impl PhysicsConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> ShipResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ShipError::InvalidConfig(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing keys take their defaults
    pub fn from_json_str(source: &str) -> ShipResult<Self> {
        let config: Self = serde_json::from_str(source)
            .map_err(|e| ShipError::InvalidConfig(format!("JSON parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> ShipResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ShipError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_toml_str(&source),
        }
    }

    /// Reject settings the integrator cannot work with
    pub fn validate(&self) -> ShipResult<()> {
        let invalid = |msg: String| Err(ShipError::InvalidConfig(msg));

        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return invalid(format!("tick_rate_hz must be positive, got {}", self.tick_rate_hz));
        }
        if self.substeps_per_tick == 0 {
            return invalid("substeps_per_tick must be at least 1".to_string());
        }
        if !(self.drag_constant > 0.0 && self.drag_constant <= 1.0) {
            return invalid(format!("drag_constant must be in (0, 1], got {}", self.drag_constant));
        }
        if !(self.drag_reference_rate.is_finite() && self.drag_reference_rate >= 0.0) {
            return invalid(format!(
                "drag_reference_rate must be non-negative, got {}",
                self.drag_reference_rate
            ));
        }
        if !(self.instability_threshold > 0.0) {
            return invalid(format!(
                "instability_threshold must be positive, got {}",
                self.instability_threshold
            ));
        }
        if !(self.ship_lower_limit < self.ship_upper_limit) {
            return invalid(format!(
                "ship_lower_limit ({}) must be below ship_upper_limit ({})",
                self.ship_lower_limit, self.ship_upper_limit
            ));
        }
        if !(self.grid_alignment_time_constant > 0.0) {
            return invalid(format!(
                "grid_alignment_time_constant must be positive, got {}",
                self.grid_alignment_time_constant
            ));
        }
        if !(self.grid_alignment_epsilon > 0.0) {
            return invalid("grid_alignment_epsilon must be positive".to_string());
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return invalid(format!("gravity must be finite, got {:?}", self.gravity));
        }
        if self.tick_stats_window == 0 {
            return invalid("tick_stats_window must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn gravity_vector(&self) -> DVec3 {
        DVec3::from_array(self.gravity)
    }

    /// Wall-clock duration of one scheduler pass
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    /// Simulated seconds advanced by one substep
    pub fn substep_dt(&self) -> f64 {
        1.0 / (self.tick_rate_hz * self.substeps_per_tick as f64)
    }

    /// Velocity scale applied once per substep of length `dt`
    pub fn drag_for_substep(&self, dt: f64) -> f64 {
        self.drag_constant.powf(dt * self.drag_reference_rate)
    }

    pub fn with_gravity(mut self, gravity: DVec3) -> Self {
        self.gravity = gravity.to_array();
        self
    }

    pub fn with_gravity_enabled(mut self, enabled: bool) -> Self {
        self.gravity_enabled = enabled;
        self
    }

    pub fn with_voxel_forces_enabled(mut self, enabled: bool) -> Self {
        self.voxel_forces_enabled = enabled;
        self
    }

    pub fn with_drag_constant(mut self, drag_constant: f64) -> Self {
        self.drag_constant = drag_constant;
        self
    }

    pub fn with_tick_rate(mut self, tick_rate_hz: f64, substeps_per_tick: u32) -> Self {
        self.tick_rate_hz = tick_rate_hz;
        self.substeps_per_tick = substeps_per_tick;
        self
    }

    pub fn with_vertical_limits(mut self, lower: f64, upper: f64) -> Self {
        self.ship_lower_limit = lower;
        self.ship_upper_limit = upper;
        self
    }

    pub fn with_instability_threshold(mut self, threshold: f64) -> Self {
        self.instability_threshold = threshold;
        self
    }

    pub fn with_grid_alignment(mut self, time_constant: f64, epsilon: f64) -> Self {
        self.grid_alignment_time_constant = time_constant;
        self.grid_alignment_epsilon = epsilon;
        self
    }
}
