use std::ops::Range;

use crate::body::Body;
use crate::bounds::AxisAlignedBox;
use crate::vector::Vector2;

/// Shape of a generated disc galaxy.
#[derive(Clone, Copy, Debug)]
pub struct DiscParams {
    /// Mass of the body pinned at the origin.
    pub central_mass: f64,
    /// No orbiting body starts closer than this.
    pub inner_radius: f64,
    /// Outer radius grows as `spacing * sqrt(n)`.
    pub spacing: f64,
    /// Mass of each orbiting body.
    pub body_mass: f64,
    pub gravitational_constant: f64,
    /// Multiplies every orbital speed, e.g. by `dt` when positions advance by the raw velocity.
    pub speed_scale: f64,
}

impl Default for DiscParams {
    fn default() -> Self {
        Self {
            central_mass: 1e6,
            inner_radius: 25.0,
            spacing: 5.0,
            body_mass: 1.0,
            gravitational_constant: 1.0,
            speed_scale: 1.0,
        }
    }
}

/// Generates `n` bodies in a uniform disc around a heavy central body.
///
/// Each orbiting body gets the circular-orbit speed `sqrt(G * M / r)` for the mass
/// `M` enclosed by its radius, perpendicular to its position.
pub fn uniform_disc(n: usize, seed: u64, params: &DiscParams) -> Vec<Body> {
    if n == 0 {
        return Vec::new();
    }

    let mut rng = fastrand::Rng::with_seed(seed);
    let inner_radius = params.inner_radius;
    let outer_radius = (n as f64).sqrt() * params.spacing;

    let mut bodies: Vec<Body> = Vec::with_capacity(n);
    bodies.push(Body::new(Vector2::ZERO, Vector2::ZERO, params.central_mass));

    while bodies.len() < n {
        let a = rng.f64() * std::f64::consts::TAU;
        let (sin, cos) = a.sin_cos();

        // Uniform over the annulus area.
        let t = inner_radius / outer_radius;
        let r = rng.f64() * (1.0 - t * t) + t * t;
        let pos = Vector2::new(cos, sin) * (outer_radius * r.sqrt());

        // Unit direction, scaled to orbital speed below.
        let vel = Vector2::new(sin, -cos);
        bodies.push(Body::new(pos, vel, params.body_mass));
    }

    bodies.sort_by(|a, b| a.pos.length_squared().total_cmp(&b.pos.length_squared()));

    let mut enclosed = 0.0;
    for body in &mut bodies {
        enclosed += body.mass;
        if body.pos == Vector2::ZERO {
            continue;
        }

        let v = (params.gravitational_constant * enclosed / body.pos.length()).sqrt();
        body.vel *= v * params.speed_scale;
    }

    bodies
}

/// Scatters `n` bodies at rest uniformly over `bounds`, with masses drawn from `mass`.
pub fn random_field(n: usize, seed: u64, bounds: &AxisAlignedBox, mass: Range<f64>) -> Vec<Body> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let (low, span) = (bounds.low(), bounds.high() - bounds.low());

    (0..n)
        .map(|_| {
            let pos = Vector2::new(low.x + rng.f64() * span.x, low.y + rng.f64() * span.y);
            let m = mass.start + rng.f64() * (mass.end - mass.start);
            Body::new(pos, Vector2::ZERO, m)
        })
        .collect()
}
