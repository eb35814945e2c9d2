use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

use crate::error::{GravityError, Result};

/// A 2D point or displacement.
///
/// Plain `#[repr(C)]` storage for the C interface and serde; arithmetic is carried
/// out on [`DVec2`]. Every named operation takes `self` by value and returns a new
/// vector, so chains such as `a.minus(b).rotate(t)` never alias the caller's copy
/// of `a`. The compound assignment operators (`+=`, `-=`, `*=`) are the in-place
/// variants used on the hot integration path.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    fn uv(self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn plus(self, other: Self) -> Self {
        (self.uv() + other.uv()).into()
    }

    pub fn minus(self, other: Self) -> Self {
        (self.uv() - other.uv()).into()
    }

    pub fn scale(self, scalar: f64) -> Self {
        (self.uv() * scalar).into()
    }

    /// Checked division. Fails on an exact zero divisor instead of producing
    /// infinities; use the `/` operator where IEEE semantics are wanted.
    pub fn divide(self, scalar: f64) -> Result<Self> {
        if scalar == 0.0 {
            return Err(GravityError::DivisionByZero);
        }
        Ok(self / scalar)
    }

    pub fn dot(self, other: Self) -> f64 {
        self.uv().dot(other.uv())
    }

    pub fn length_squared(self) -> f64 {
        self.uv().mag_sq()
    }

    pub fn length(self) -> f64 {
        self.uv().mag()
    }

    /// Unit vector in the same direction.
    pub fn normalize(self) -> Result<Self> {
        let length = self.length();
        if length == 0.0 {
            return Err(GravityError::DegenerateVector);
        }
        Ok(self / length)
    }

    /// Rotates counter-clockwise about the origin by `angle` radians.
    pub fn rotate(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Rotates about `pivot` by `angle` radians.
    pub fn rotate_around(self, angle: f64, pivot: Self) -> Self {
        self.minus(pivot).rotate(angle).plus(pivot)
    }

    /// The vector rotated a quarter turn counter-clockwise: `(-y, x)`.
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.plus(rhs)
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.minus(rhs)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

/// IEEE division: a zero divisor yields infinities or NaN. This is intentional for
/// the force kernels, whose divisors are kept away from zero by the distance floor.
impl Div<f64> for Vector2 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        (self.uv() / rhs).into()
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        (-self.uv()).into()
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.plus(rhs);
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.minus(rhs);
    }
}

impl MulAssign<f64> for Vector2 {
    fn mul_assign(&mut self, rhs: f64) {
        *self = self.scale(rhs);
    }
}

impl From<DVec2> for Vector2 {
    fn from(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Vector2> for DVec2 {
    fn from(v: Vector2) -> Self {
        v.uv()
    }
}

impl From<(f64, f64)> for Vector2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn close(a: Vector2, b: Vector2) -> bool {
        (a - b).length() < 1e-12
    }

    #[test]
    fn arithmetic_does_not_alias() {
        let a = Vector2::new(3.0, 4.0);
        let b = a.minus(Vector2::new(1.0, 1.0)).scale(2.0);
        assert_eq!(a, Vector2::new(3.0, 4.0));
        assert_eq!(b, Vector2::new(4.0, 6.0));
        assert_eq!(a.length(), 5.0);
        assert_eq!(a.length_squared(), 25.0);
    }

    #[test]
    fn checked_divide_rejects_zero() {
        assert_eq!(Vector2::new(1.0, 2.0).divide(0.0), Err(GravityError::DivisionByZero));
        assert_eq!(Vector2::new(1.0, 2.0).divide(2.0), Ok(Vector2::new(0.5, 1.0)));
        assert!(!(Vector2::new(1.0, 0.0) / 0.0).is_finite());
    }

    #[test]
    fn normalize_zero_is_degenerate() {
        assert_eq!(Vector2::ZERO.normalize(), Err(GravityError::DegenerateVector));
        assert_eq!(Vector2::new(0.0, -3.0).normalize(), Ok(Vector2::new(0.0, -1.0)));
    }

    #[test]
    fn rotation() {
        assert!(close(Vector2::new(1.0, 0.0).rotate(FRAC_PI_2), Vector2::new(0.0, 1.0)));
        assert!(close(Vector2::new(1.0, 1.0).rotate(PI), Vector2::new(-1.0, -1.0)));

        let pivot = Vector2::new(1.0, 1.0);
        let rotated = Vector2::new(2.0, 1.0).rotate_around(FRAC_PI_2, pivot);
        assert!(close(rotated, Vector2::new(1.0, 2.0)));
    }

    #[test]
    fn perpendicular_is_quarter_turn() {
        let v = Vector2::new(2.0, 5.0);
        assert_eq!(v.perpendicular(), Vector2::new(-5.0, 2.0));
        assert_eq!(v.perpendicular().dot(v), 0.0);
    }

    #[test]
    fn ultraviolet_interop() {
        let v: DVec2 = Vector2::new(1.5, -2.5).into();
        assert_eq!(v.mag_sq(), 8.5);
        assert_eq!(Vector2::from(v), Vector2::new(1.5, -2.5));

        let (a, b) = (Vector2::new(3.0, -1.0), Vector2::new(0.5, 2.0));
        assert_eq!(a.dot(b), DVec2::from(a).dot(b.into()));
        assert_eq!(a + b, Vector2::from(DVec2::from(a) + DVec2::from(b)));
        assert_eq!(-a * 2.0, Vector2::new(-6.0, 2.0));

        let mut c = a;
        c += b;
        c -= a;
        c *= 4.0;
        assert_eq!(c, Vector2::new(2.0, 8.0));
    }
}
