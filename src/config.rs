//! Tunables for a [`GravitySystem`](crate::GravitySystem).
//!
//! Defaults favour visual stability over physical realism. A config can be
//! built in code or loaded from TOML:
//!
//! ```toml
//! gravitational_constant = 1.0
//! dt = 0.05
//! strategy = "barnes_hut"
//! opening_angle_theta = 0.7
//! max_speed = 40.0
//!
//! [bounds]
//! low = { x = -500.0, y = -500.0 }
//! high = { x = 500.0, y = 500.0 }
//! ```

use serde::{Deserialize, Serialize};

use crate::bounds::AxisAlignedBox;
use crate::error::{GravityError, Result};

/// How forces are accumulated each iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Exact pairwise summation, O(n²).
    #[default]
    BruteForce,
    /// Quadtree clusters under the opening-angle criterion, O(n log n).
    BarnesHut,
    /// Every body pulled toward one point at the global centroid. Coarse.
    SingleAggregate,
}

/// How velocity moves a body during integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionUpdate {
    /// `pos += vel`. The time step only enters through the force impulse.
    #[default]
    Unscaled,
    /// `pos += vel * dt`.
    Scaled,
}

/// What happens to bodies that drift outside `bounds`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Pin the body to the nearest point inside and drop its outward velocity.
    #[default]
    Clamp,
    /// Grow the quadtree root to cover every body for that rebuild.
    Grow,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Added to every squared separation; keeps the force finite at contact.
    pub min_distance_squared_floor: f64,
    pub gravitational_constant: f64,
    /// Integration sub-steps per call to `advance`.
    pub iterations_per_tick: usize,
    pub dt: f64,
    /// Entries a quadtree leaf holds before it splits.
    pub quadtree_capacity: usize,
    /// Levels the quadtree may use, root included.
    pub quadtree_max_depth: usize,
    /// Barnes-Hut opening angle: width / distance threshold.
    pub opening_angle_theta: f64,
    pub strategy: Strategy,
    /// Ceiling on `|vel|² · dt`, expressed as a speed. `None` disables clamping.
    pub max_speed: Option<f64>,
    pub position_update: PositionUpdate,
    pub bounds_policy: BoundsPolicy,
    /// Run force queries on the rayon pool.
    pub parallel: bool,
    /// Region bodies are expected to stay within. Kept last so it serializes
    /// as a trailing TOML table.
    pub bounds: AxisAlignedBox,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            min_distance_squared_floor: Self::DEFAULT_MIN_DISTANCE_SQUARED_FLOOR,
            gravitational_constant: Self::DEFAULT_GRAVITATIONAL_CONSTANT,
            iterations_per_tick: Self::DEFAULT_ITERATIONS,
            dt: Self::DEFAULT_DT,
            quadtree_capacity: Self::DEFAULT_CAPACITY,
            quadtree_max_depth: Self::DEFAULT_MAX_DEPTH,
            opening_angle_theta: Self::DEFAULT_THETA,
            strategy: Strategy::default(),
            max_speed: None,
            position_update: PositionUpdate::default(),
            bounds_policy: BoundsPolicy::default(),
            parallel: false,
            bounds: AxisAlignedBox::square(Self::DEFAULT_HALF_EXTENT),
        }
    }
}

impl SystemConfig {
    /// Default constants.
    pub const DEFAULT_MIN_DISTANCE_SQUARED_FLOOR: f64 = 1.0;
    pub const DEFAULT_GRAVITATIONAL_CONSTANT: f64 = 6.7;
    pub const DEFAULT_ITERATIONS: usize = 5;
    pub const DEFAULT_DT: f64 = 0.1;
    pub const DEFAULT_CAPACITY: usize = 20;
    pub const DEFAULT_MAX_DEPTH: usize = 10;
    pub const DEFAULT_THETA: f64 = 1.0;
    pub const DEFAULT_HALF_EXTENT: f64 = 10_000.0;

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| GravityError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| GravityError::InvalidConfig(e.to_string()))
    }

    /// Rejects values that would halt or poison the tick loop.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(GravityError::InvalidConfig(msg))
        }

        if !(self.min_distance_squared_floor >= 0.0 && self.min_distance_squared_floor.is_finite()) {
            return invalid(format!(
                "min_distance_squared_floor must be finite and >= 0, got {}",
                self.min_distance_squared_floor
            ));
        }
        if !self.gravitational_constant.is_finite() {
            return invalid(format!(
                "gravitational_constant must be finite, got {}",
                self.gravitational_constant
            ));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return invalid(format!("dt must be positive and finite, got {}", self.dt));
        }
        if self.quadtree_capacity == 0 {
            return invalid("quadtree_capacity must be at least 1".into());
        }
        if self.quadtree_max_depth == 0 {
            return invalid("quadtree_max_depth must be at least 1".into());
        }
        if !(self.opening_angle_theta >= 0.0) {
            return invalid(format!(
                "opening_angle_theta must be >= 0, got {}",
                self.opening_angle_theta
            ));
        }
        if let Some(max) = self.max_speed {
            if !(max > 0.0) {
                return invalid(format!("max_speed must be positive, got {max}"));
            }
        }
        Ok(())
    }
}
