//! Geometric predicates for placement and segregation checks.
//!
//! All predicates are pure functions over axis-aligned boxes in container
//! space. Boxes are closed at the container walls and open against each other:
//! an item may end exactly at the wall, and two items may share a face.

use crate::model::Container;
use crate::types::{BoundingBox, Dimensional, EPSILON_GENERAL};

/// Checks whether a placed box lies within the container on every axis.
///
/// # Parameters
/// * `bounds` - The placed box
/// * `container` - The container
///
/// # Returns
/// `true` if `[min, max]` is inside `[0, dim]` on all three axes
pub fn fits(bounds: &BoundingBox, container: &Container) -> bool {
    fits_with_tolerance(bounds, container, EPSILON_GENERAL)
}

/// Like [`fits`], allowing each wall to be exceeded by at most `tolerance`.
pub fn fits_with_tolerance(bounds: &BoundingBox, container: &Container, tolerance: f64) -> bool {
    let dims = container.dimensions();
    bounds.min.x >= -tolerance
        && bounds.min.y >= -tolerance
        && bounds.min.z >= -tolerance
        && bounds.max.fits_within(&dims, tolerance)
}

/// Checks whether two boxes overlap.
///
/// Uses the separating axis test on open intervals, so boxes that only touch
/// (zero-volume intersection) do not overlap.
///
/// # Example
/// ```
/// use load_planner::geometry::overlaps;
/// use load_planner::types::{BoundingBox, Vec3};
///
/// let a = BoundingBox::from_position_and_dims(Vec3::zero(), Vec3::new(10.0, 4.0, 4.0));
/// let b = BoundingBox::from_position_and_dims(Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 4.0, 4.0));
/// assert!(!overlaps(&a, &b));
/// ```
pub fn overlaps(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.intersects(b)
}

/// Checks whether two footprints come within `clearance` of each other in the
/// XY plane. Touching footprints are always within clearance.
pub fn within_clearance(a: &BoundingBox, b: &BoundingBox, clearance: f64) -> bool {
    a.expanded_xy(clearance.max(0.0)).touches_xy(b)
}
