use crate::vector::Vector2;

/// Errors raised by precondition checks across the simulation.
///
/// None of these are retried: they report a malformed configuration, a body the
/// caller should not have added, or numeric state that has escaped the finite range.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GravityError {
    #[error("invalid bounds: low {low:?} exceeds high {high:?} on at least one axis")]
    InvalidBounds { low: Vector2, high: Vector2 },

    #[error("position {position:?} lies outside the quadtree bounds")]
    OutOfBounds { position: Vector2 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot normalize a zero-length vector")]
    DegenerateVector,

    #[error("internal invariant violated: {0}")]
    InvariantViolation(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid body: {0}")]
    InvalidBody(String),

    #[error("body {index} left the finite range")]
    NonFinite { index: usize },
}

pub type Result<T> = std::result::Result<T, GravityError>;
