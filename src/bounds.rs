use serde::{Deserialize, Serialize};

use crate::error::{GravityError, Result};
use crate::vector::Vector2;

/// Quadrant indices, in the order children are stored.
pub const NW: usize = 0;
pub const NE: usize = 1;
pub const SE: usize = 2;
pub const SW: usize = 3;

/// An immutable axis-aligned rectangle spanning `low..=high`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoxRepr", into = "BoxRepr")]
pub struct AxisAlignedBox {
    low: Vector2,
    high: Vector2,
}

#[derive(Serialize, Deserialize)]
struct BoxRepr {
    low: Vector2,
    high: Vector2,
}

impl TryFrom<BoxRepr> for AxisAlignedBox {
    type Error = GravityError;

    fn try_from(repr: BoxRepr) -> Result<Self> {
        Self::new(repr.low, repr.high)
    }
}

impl From<AxisAlignedBox> for BoxRepr {
    fn from(b: AxisAlignedBox) -> Self {
        Self {
            low: b.low,
            high: b.high,
        }
    }
}

impl AxisAlignedBox {
    /// Fails with `InvalidBounds` if `low` exceeds `high` on either axis or a
    /// corner is not finite.
    pub fn new(low: Vector2, high: Vector2) -> Result<Self> {
        if !low.is_finite() || !high.is_finite() || low.x > high.x || low.y > high.y {
            return Err(GravityError::InvalidBounds { low, high });
        }
        Ok(Self { low, high })
    }

    /// Box of side `2 * half_extent` centered on the origin. The sign of the
    /// extent is ignored; a non-finite extent gives a zero-sized box.
    pub fn square(half_extent: f64) -> Self {
        let h = if half_extent.is_finite() { half_extent.abs() } else { 0.0 };
        Self {
            low: Vector2::new(-h, -h),
            high: Vector2::new(h, h),
        }
    }

    /// Smallest box enclosing every point, or `None` if there are none.
    pub fn containing(points: impl IntoIterator<Item = Vector2>) -> Option<Self> {
        let mut low = Vector2::new(f64::MAX, f64::MAX);
        let mut high = Vector2::new(f64::MIN, f64::MIN);
        let mut any = false;

        for p in points {
            low.x = low.x.min(p.x);
            low.y = low.y.min(p.y);
            high.x = high.x.max(p.x);
            high.y = high.y.max(p.y);
            any = true;
        }

        any.then_some(Self { low, high })
    }

    pub fn low(&self) -> Vector2 {
        self.low
    }

    pub fn high(&self) -> Vector2 {
        self.high
    }

    pub fn width(&self) -> f64 {
        self.high.x - self.low.x
    }

    pub fn height(&self) -> f64 {
        self.high.y - self.low.y
    }

    /// The split point shared by all four quadrants.
    pub fn center(&self) -> Vector2 {
        self.low + (self.high - self.low) / 2.0
    }

    /// Inclusive on both corners.
    pub fn contains(&self, p: Vector2) -> bool {
        p.x >= self.low.x && p.x <= self.high.x && p.y >= self.low.y && p.y <= self.high.y
    }

    pub fn clamp(&self, p: Vector2) -> Vector2 {
        Vector2::new(
            p.x.clamp(self.low.x, self.high.x),
            p.y.clamp(self.low.y, self.high.y),
        )
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            low: Vector2::new(self.low.x.min(other.low.x), self.low.y.min(other.low.y)),
            high: Vector2::new(self.high.x.max(other.high.x), self.high.y.max(other.high.y)),
        }
    }

    /// Which quadrant a position routes to. Ties on the midpoint go to the
    /// east/south side.
    pub fn find_quadrant(&self, pos: Vector2) -> usize {
        let mid = self.center();
        if pos.x < mid.x {
            if pos.y < mid.y { NW } else { SW }
        } else if pos.y < mid.y {
            NE
        } else {
            SE
        }
    }

    /// Splits the box at its center into `[NW, NE, SE, SW]`.
    pub fn quadrants(&self) -> [AxisAlignedBox; 4] {
        let (a, b, h) = (self.low, self.high, self.center());
        [
            Self { low: a, high: h },
            Self { low: Vector2::new(h.x, a.y), high: Vector2::new(b.x, h.y) },
            Self { low: h, high: b },
            Self { low: Vector2::new(a.x, h.y), high: Vector2::new(h.x, b.y) },
        ]
    }
}
