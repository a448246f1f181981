//! Common types and traits for 3D cargo geometry.
//!
//! Lengths are in feet, weights in pounds. The axes follow the trailer:
//! `x` runs along the length (nose to doors), `y` across the width and
//! `z` up from the floor.

use std::ops::Add;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for dimension and boundary comparisons so that an item of exactly the
/// remaining length is not rejected because of accumulated rounding.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 3D vector or point in container space.
///
/// # Examples
/// ```
/// use load_planner::types::Vec3;
///
/// let position = Vec3::new(10.0, 0.0, 0.0);
/// let dims = Vec3::new(10.0, 4.0, 4.0);
/// assert_eq!((position + dims).x, 20.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    ///
    /// # Parameters
    /// * `x` - X component (length axis)
    /// * `y` - Y component (width axis)
    /// * `z` - Z component (height axis)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// # Parameters
    /// * `outer` - The outer vector (e.g., container dimensions)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.x <= outer.x + tolerance
            && self.y <= outer.y + tolerance
            && self.z <= outer.z + tolerance
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

/// Trait for objects with a 3D extent.
pub trait Dimensional {
    /// Returns the dimensions of the object (length, width, height).
    fn dimensions(&self) -> Vec3;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

/// Axis-Aligned Bounding Box (AABB) in container space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + dimensions)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from its lower corner and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks if the interiors of two boxes intersect.
    ///
    /// Boxes that only share a face, edge or corner do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }

    /// Checks if the XY footprints of two boxes touch or intersect.
    ///
    /// Unlike [`BoundingBox::intersects`] a shared boundary counts.
    #[inline]
    pub fn touches_xy(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Grows the box by `margin` on every side of the XY footprint.
    #[inline]
    pub fn expanded_xy(&self, margin: f64) -> Self {
        Self {
            min: Vec3::new(self.min.x - margin, self.min.y - margin, self.min.z),
            max: Vec3::new(self.max.x + margin, self.max.y + margin, self.max.z),
        }
    }
}
