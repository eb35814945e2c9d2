//! Force law and the three accumulation strategies.
//!
//! Forces are applied as velocity impulses: every contribution is scaled by the
//! source mass and `dt²` and added straight onto the receiving body's velocity.

use rayon::prelude::*;

use crate::body::Body;
use crate::config::{Strategy, SystemConfig};
use crate::quadtree::{PointMass, Quadtree};
use crate::vector::Vector2;

/// Softened inverse-square attraction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceLaw {
    pub gravitational_constant: f64,
    pub min_distance_squared_floor: f64,
}

impl ForceLaw {
    pub fn new(gravitational_constant: f64, min_distance_squared_floor: f64) -> Self {
        Self {
            gravitational_constant,
            min_distance_squared_floor,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.gravitational_constant, config.min_distance_squared_floor)
    }

    /// Pull exerted on `a` by a unit mass at `b`: `G / (|d|² + floor)` along `d = b - a`.
    ///
    /// Coincident points with a zero floor have no direction and yield zero.
    #[inline]
    pub fn gravity(&self, a: Vector2, b: Vector2) -> Vector2 {
        let diff = b - a;
        let dist_sq = diff.length_squared() + self.min_distance_squared_floor;
        if dist_sq == 0.0 {
            return Vector2::ZERO;
        }

        let force = self.gravitational_constant / dist_sq;
        diff / dist_sq.sqrt() * force
    }
}

/// Applies one round of forces to a set of bodies.
#[derive(Clone, Copy, Debug)]
pub struct Accumulator {
    pub law: ForceLaw,
    pub dt_sq: f64,
    pub theta: f64,
    pub parallel: bool,
}

impl Accumulator {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            law: ForceLaw::from_config(config),
            dt_sq: config.dt * config.dt,
            theta: config.opening_angle_theta,
            parallel: config.parallel,
        }
    }

    /// Updates every body's velocity using `strategy`.
    ///
    /// `tree` must already hold every body; `BarnesHut` and `SingleAggregate` also
    /// need its aggregates computed.
    pub fn apply(&self, strategy: Strategy, bodies: &mut [Body], tree: &Quadtree) {
        match strategy {
            Strategy::BruteForce if self.parallel => self.brute_force_parallel(bodies),
            Strategy::BruteForce => self.brute_force(bodies),
            Strategy::BarnesHut => self.barnes_hut(bodies, tree),
            Strategy::SingleAggregate => self.single_aggregate(bodies, tree),
        }
    }

    /// Velocity deltas for `a` and `b` from one evaluation of their mutual pull.
    /// The two are opposite once each is weighted by its own body's mass.
    #[inline]
    pub fn pair_impulse(&self, a: &Body, b: &Body) -> (Vector2, Vector2) {
        let force = self.law.gravity(a.pos, b.pos) * self.dt_sq;
        (force * b.mass, -(force * a.mass))
    }

    /// Adds the impulse from each source onto `vel`, one source at a time.
    #[inline]
    fn pull_into(&self, pos: Vector2, vel: &mut Vector2, sources: &[PointMass]) {
        for s in sources {
            *vel += self.law.gravity(pos, s.pos) * self.dt_sq * s.mass;
        }
    }

    /// Every unordered pair once, applying Newton's third law to both sides.
    pub fn brute_force(&self, bodies: &mut [Body]) {
        let n = bodies.len();
        for i in 0..n.saturating_sub(1) {
            for j in i + 1..n {
                let (da, db) = self.pair_impulse(&bodies[i], &bodies[j]);
                bodies[i].vel += da;
                bodies[j].vel += db;
            }
        }
    }

    /// Each body sums over all others independently; every pair is evaluated twice
    /// but no two workers write the same body.
    fn brute_force_parallel(&self, bodies: &mut [Body]) {
        let sources: Vec<PointMass> = bodies.iter().map(|b| PointMass::new(b.pos, b.mass)).collect();

        bodies.par_iter_mut().enumerate().for_each(|(i, body)| {
            for (j, s) in sources.iter().enumerate() {
                if i != j {
                    body.vel += self.law.gravity(body.pos, s.pos) * self.dt_sq * s.mass;
                }
            }
        });
    }

    pub fn barnes_hut(&self, bodies: &mut [Body], tree: &Quadtree) {
        if self.parallel {
            bodies.par_iter_mut().for_each_init(Vec::new, |clusters, body| {
                clusters.clear();
                tree.collect_clusters(body.pos, self.theta, clusters);
                self.pull_into(body.pos, &mut body.vel, clusters);
            });
        } else {
            let mut clusters = Vec::new();
            for body in bodies.iter_mut() {
                clusters.clear();
                tree.collect_clusters(body.pos, self.theta, &mut clusters);
                self.pull_into(body.pos, &mut body.vel, &clusters);
            }
        }
    }

    /// Pulls every body toward the tree's root centroid carrying the total mass.
    pub fn single_aggregate(&self, bodies: &mut [Body], tree: &Quadtree) {
        let root = tree.root();
        if root.is_empty() {
            return;
        }
        let aggregate = [PointMass::new(root.centroid, root.mass)];

        if self.parallel {
            bodies
                .par_iter_mut()
                .for_each(|body| self.pull_into(body.pos, &mut body.vel, &aggregate));
        } else {
            for body in bodies.iter_mut() {
                self.pull_into(body.pos, &mut body.vel, &aggregate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator(parallel: bool) -> Accumulator {
        Accumulator {
            law: ForceLaw::new(1.0, 0.0),
            dt_sq: 1.0,
            theta: 0.5,
            parallel,
        }
    }

    #[test]
    fn gravity_is_inverse_square() {
        let law = ForceLaw::new(2.0, 0.0);
        let f = law.gravity(Vector2::new(1.0, 1.0), Vector2::new(1.0, 5.0));
        assert_eq!(f, Vector2::new(0.0, 2.0 / 16.0));
    }

    #[test]
    fn floor_caps_close_range_force() {
        let law = ForceLaw::new(1.0, 1.0);
        let f = law.gravity(Vector2::ZERO, Vector2::new(1e-9, 0.0));
        assert!(f.length() < 1e-8);
        assert_eq!(law.gravity(Vector2::ZERO, Vector2::ZERO), Vector2::ZERO);
        assert_eq!(ForceLaw::new(1.0, 0.0).gravity(Vector2::ZERO, Vector2::ZERO), Vector2::ZERO);
    }

    #[test]
    fn pair_impulse_obeys_third_law() {
        let acc = accumulator(false);
        let a = Body::new(Vector2::new(-3.0, 1.0), Vector2::ZERO, 2.0);
        let b = Body::new(Vector2::new(4.0, -2.0), Vector2::ZERO, 8.0);
        let (da, db) = acc.pair_impulse(&a, &b);
        assert_eq!(da * a.mass, -(db * b.mass));
    }

    #[test]
    fn parallel_brute_force_matches_sequential() {
        let mut rng = fastrand::Rng::with_seed(42);
        let bodies: Vec<Body> = (0..64)
            .map(|_| {
                Body::new(
                    Vector2::new(rng.f64() * 100.0, rng.f64() * 100.0),
                    Vector2::ZERO,
                    rng.f64() + 0.5,
                )
            })
            .collect();

        let mut sequential = bodies.clone();
        accumulator(false).brute_force(&mut sequential);
        let mut parallel = bodies;
        accumulator(true).brute_force_parallel(&mut parallel);

        for (s, p) in sequential.iter().zip(&parallel) {
            assert!((s.vel - p.vel).length() < 1e-12);
        }
    }
}
