use rayon::prelude::*;

use crate::{
    body::Body,
    bounds::AxisAlignedBox,
    config::{BoundsPolicy, PositionUpdate, Strategy, SystemConfig},
    error::{GravityError, Result},
    forces::Accumulator,
    quadtree::Quadtree,
    vector::Vector2,
};

/// Owns the bodies and advances them under mutual gravity.
///
/// The caller builds one with a [`SystemConfig`], adds bodies, then calls
/// [`advance`](Self::advance) once per frame and reads [`bodies`](Self::bodies).
#[derive(Clone, Debug)]
pub struct GravitySystem {
    config: SystemConfig,
    bodies: Vec<Body>,
    /// Tree from the last iteration, kept for inspection and reused between rebuilds.
    quadtree: Quadtree,
    /// Completed calls to `advance`.
    frame: usize,
}

impl Default for GravitySystem {
    fn default() -> Self {
        let config = SystemConfig::default();
        let quadtree = Quadtree::new(config.bounds, config.quadtree_capacity, config.quadtree_max_depth);
        Self {
            config,
            bodies: Vec::new(),
            quadtree,
            frame: 0,
        }
    }
}

impl GravitySystem {
    /// Fails with `InvalidConfig` if any tunable is out of range.
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;
        log::info!(
            "gravity system: strategy={:?} G={} dt={} iterations={} theta={} bounds={:?}",
            config.strategy,
            config.gravitational_constant,
            config.dt,
            config.iterations_per_tick,
            config.opening_angle_theta,
            config.bounds,
        );

        let quadtree = Quadtree::new(config.bounds, config.quadtree_capacity, config.quadtree_max_depth);
        Ok(Self {
            config,
            bodies: Vec::new(),
            quadtree,
            frame: 0,
        })
    }

    /// Builds a system and adds every body, failing on the first invalid one.
    pub fn with_bodies(config: SystemConfig, bodies: impl IntoIterator<Item = Body>) -> Result<Self> {
        let mut system = Self::new(config)?;
        for body in bodies {
            system.add(body)?;
        }
        log::debug!("gravity system populated with {} bodies", system.bodies.len());
        Ok(system)
    }

    /// Adds a body and returns its index.
    ///
    /// Under `BoundsPolicy::Clamp` a body starting outside `bounds` is rejected
    /// with `OutOfBounds`; under `Grow` it is accepted.
    pub fn add(&mut self, body: Body) -> Result<usize> {
        body.validate()?;
        if self.config.bounds_policy == BoundsPolicy::Clamp && !self.config.bounds.contains(body.pos) {
            return Err(GravityError::OutOfBounds { position: body.pos });
        }
        self.bodies.push(body);
        Ok(self.bodies.len() - 1)
    }

    /// Removes every body and resets the frame counter.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.quadtree.clear(self.config.bounds);
        self.frame = 0;
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn quadtree(&self) -> &Quadtree {
        &self.quadtree
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        log::debug!("strategy {:?} -> {:?}", self.config.strategy, strategy);
        self.config.strategy = strategy;
    }

    /// Advances the simulation by one tick of `iterations_per_tick` sub-steps.
    ///
    /// Each sub-step integrates positions, rebuilds the quadtree, aggregates it,
    /// then applies forces with the configured strategy. The call is atomic: if
    /// any body leaves the finite range, the bodies and the quadtree are restored
    /// to their state before the call and `NonFinite` is returned.
    pub fn advance(&mut self) -> Result<()> {
        if self.bodies.is_empty() {
            return Ok(());
        }

        let bodies = self.bodies.clone();
        let quadtree = self.quadtree.clone();
        for _ in 0..self.config.iterations_per_tick {
            if let Err(e) = self.iterate() {
                log::warn!("tick {} abandoned: {e}", self.frame);
                self.bodies = bodies;
                self.quadtree = quadtree;
                return Err(e);
            }
        }
        self.frame += 1;

        log::trace!(
            "frame {}: {} bodies, {} nodes, depth {}",
            self.frame,
            self.bodies.len(),
            self.quadtree.node_count(),
            self.quadtree.depth(),
        );
        Ok(())
    }

    fn iterate(&mut self) -> Result<()> {
        self.integrate();
        self.check_finite()?;
        self.rebuild()?;
        self.attract();
        self.check_finite()
    }

    /// First body whose position or velocity is no longer finite.
    fn check_finite(&self) -> Result<()> {
        match self.bodies.iter().position(|b| !b.pos.is_finite() || !b.vel.is_finite()) {
            Some(index) => Err(GravityError::NonFinite { index }),
            None => Ok(()),
        }
    }

    /// Moves every body along its velocity, clamping speed and position per config.
    fn integrate(&mut self) {
        let config = &self.config;
        let clamped = if config.parallel {
            self.bodies
                .par_iter_mut()
                .map(|body| integrate_body(body, config))
                .filter(|&c| c)
                .count()
        } else {
            self.bodies
                .iter_mut()
                .map(|body| integrate_body(body, config))
                .filter(|&c| c)
                .count()
        };

        if clamped > 0 {
            log::debug!("clamped {clamped} bodies back into bounds");
        }
    }

    /// Rebuilds the quadtree from current positions and aggregates it when the
    /// strategy needs cluster data.
    fn rebuild(&mut self) -> Result<()> {
        let bounds = match self.config.bounds_policy {
            BoundsPolicy::Clamp => self.config.bounds,
            BoundsPolicy::Grow => AxisAlignedBox::containing(self.bodies.iter().map(|b| b.pos))
                .map_or(self.config.bounds, |b| b.union(&self.config.bounds)),
        };

        self.quadtree.clear(bounds);
        for body in &self.bodies {
            self.quadtree.insert(body.pos, body.mass)?;
        }

        if self.config.strategy != Strategy::BruteForce {
            self.quadtree.compute_aggregates();
        }
        Ok(())
    }

    /// Accumulates gravitational impulses onto every body's velocity.
    fn attract(&mut self) {
        Accumulator::from_config(&self.config).apply(self.config.strategy, &mut self.bodies, &self.quadtree);
    }

    /// Adds `impulse` to the velocity of every body within `radius` of `center`.
    /// Returns how many bodies were affected.
    pub fn apply_impulse(&mut self, center: Vector2, radius: f64, impulse: Vector2) -> usize {
        let r_sq = radius * radius;
        let mut affected = 0;
        for body in &mut self.bodies {
            if (body.pos - center).length_squared() < r_sq {
                body.vel += impulse;
                affected += 1;
            }
        }
        affected
    }

    pub fn total_mass(&self) -> f64 {
        self.bodies.iter().map(|b| b.mass).sum()
    }

    /// Mass-weighted mean position, `None` without bodies.
    pub fn center_of_mass(&self) -> Option<Vector2> {
        let mass = self.total_mass();
        if mass == 0.0 {
            return None;
        }
        let weighted = self.bodies.iter().fold(Vector2::ZERO, |acc, b| acc + b.pos * b.mass);
        Some(weighted / mass)
    }

    pub fn momentum(&self) -> Vector2 {
        self.bodies.iter().fold(Vector2::ZERO, |acc, b| acc + b.momentum())
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.bodies.iter().map(|b| b.kinetic_energy()).sum()
    }
}

/// Speed clamp, position step, then bounds clamp. Returns whether the body was
/// pushed back inside.
fn integrate_body(body: &mut Body, config: &SystemConfig) -> bool {
    if let Some(max_speed) = config.max_speed {
        let ceiling = max_speed * max_speed;
        let energy = body.vel.length_squared() * config.dt;
        if energy > ceiling {
            body.vel *= (ceiling / energy).sqrt();
        }
    }

    body.pos += match config.position_update {
        PositionUpdate::Unscaled => body.vel,
        PositionUpdate::Scaled => body.vel * config.dt,
    };

    if config.bounds_policy != BoundsPolicy::Clamp || config.bounds.contains(body.pos) || !body.pos.is_finite() {
        return false;
    }

    let (low, high) = (config.bounds.low(), config.bounds.high());
    if (body.pos.x < low.x && body.vel.x < 0.0) || (body.pos.x > high.x && body.vel.x > 0.0) {
        body.vel.x = 0.0;
    }
    if (body.pos.y < low.y && body.vel.y < 0.0) || (body.pos.y > high.y && body.vel.y > 0.0) {
        body.vel.y = 0.0;
    }
    body.pos = config.bounds.clamp(body.pos);
    true
}
