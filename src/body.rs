use crate::error::{GravityError, Result};
use crate::vector::Vector2;

/// A point mass moving through the simulation.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Position vector.
    pub pos: Vector2,
    /// Velocity vector.
    pub vel: Vector2,
    /// Mass of the body, strictly positive.
    pub mass: f64,
}

impl Body {
    pub fn new(pos: Vector2, vel: Vector2, mass: f64) -> Self {
        Self { pos, vel, mass }
    }

    /// Checks the invariants a body must hold before it joins a system.
    pub fn validate(&self) -> Result<()> {
        if !(self.mass > 0.0 && self.mass.is_finite()) {
            return Err(GravityError::InvalidBody(format!(
                "mass must be positive and finite, got {}",
                self.mass
            )));
        }
        if !self.pos.is_finite() || !self.vel.is_finite() {
            return Err(GravityError::InvalidBody(format!(
                "non-finite state pos={:?} vel={:?}",
                self.pos, self.vel
            )));
        }
        Ok(())
    }

    pub fn momentum(&self) -> Vector2 {
        self.vel * self.mass
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.vel.length_squared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        let ok = Body::new(Vector2::new(1.0, 2.0), Vector2::ZERO, 3.0);
        assert!(ok.validate().is_ok());

        for mass in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let body = Body { mass, ..ok };
            assert!(matches!(body.validate(), Err(GravityError::InvalidBody(_))));
        }

        let body = Body { vel: Vector2::new(f64::NAN, 0.0), ..ok };
        assert!(body.validate().is_err());
    }

    #[test]
    fn momentum_and_energy() {
        let body = Body::new(Vector2::ZERO, Vector2::new(3.0, 4.0), 2.0);
        assert_eq!(body.momentum(), Vector2::new(6.0, 8.0));
        assert_eq!(body.kinetic_energy(), 25.0);
    }
}
