//! Intersection and projection primitives shared by the curve edits.
//!
//! All functions are pure and total: degenerate input (parallel lines,
//! zero-length segments, empty point sets) yields `None` instead of NaN.

use super::core::{Point2, Point3, Tolerance, Vec3};

// ============================================================================
// Plane / Ray
// ============================================================================

/// An infinite plane through `origin` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3,
    pub normal: Vec3,
}

impl Plane {
    /// Returns `None` when `normal` has zero length.
    #[must_use]
    pub fn new(origin: Point3, normal: Vec3) -> Option<Self> {
        let normal = normal.normalized()?;
        Some(Self { origin, normal })
    }

    /// Signed distance of `p`; positive on the side the normal points to.
    #[must_use]
    pub fn signed_distance(&self, p: Point3) -> f64 {
        (p - self.origin).dot(self.normal)
    }

    /// Mirror image of `p` across the plane.
    #[must_use]
    pub fn reflect(&self, p: Point3) -> Point3 {
        p - self.normal * (2.0 * self.signed_distance(p))
    }

    #[must_use]
    pub fn intersect_line(&self, p0: Point3, p1: Point3) -> Option<Point3> {
        intersect_line_plane(p0, p1, self.origin, self.normal)
    }
}

/// A view ray: the origin on the near plane and the (unit) direction into the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vec3,
}

impl Ray {
    #[must_use]
    pub const fn new(origin: Point3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[must_use]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

// ============================================================================
// 2D
// ============================================================================

/// Intersection of the closed segments `a0-a1` and `b0-b1`.
///
/// Touching endpoints count as a hit. Parallel (including collinear
/// overlapping) segments return `None`.
#[must_use]
pub fn intersect_segments_2d(a0: Point2, a1: Point2, b0: Point2, b1: Point2) -> Option<Point2> {
    let d1 = (a1.x - a0.x, a1.y - a0.y);
    let d2 = (b1.x - b0.x, b1.y - b0.y);
    let cross = d1.0 * d2.1 - d1.1 * d2.0;

    if cross.abs() < Tolerance::PARALLEL.eps {
        return None;
    }

    let d = (b0.x - a0.x, b0.y - a0.y);
    let t = (d.0 * d2.1 - d.1 * d2.0) / cross;
    let u = (d.0 * d1.1 - d.1 * d1.0) / cross;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a0.lerp(a1, t))
    } else {
        None
    }
}

// ============================================================================
// 3D
// ============================================================================

/// Intersection of the infinite line through `p0` and `p1` with a plane.
///
/// `None` when the line is parallel to the plane or `p0 == p1`.
#[must_use]
pub fn intersect_line_plane(
    p0: Point3,
    p1: Point3,
    plane_origin: Point3,
    plane_normal: Vec3,
) -> Option<Point3> {
    let dir = p1 - p0;
    let denom = plane_normal.dot(dir);
    if denom.abs() < Tolerance::PARALLEL.eps {
        return None;
    }
    let t = plane_normal.dot(plane_origin - p0) / denom;
    if !t.is_finite() {
        return None;
    }
    Some(p0 + dir * t)
}

/// Closest points between the infinite lines `a0-a1` and `b0-b1`.
///
/// Returns the point on the first line and the point on the second line.
/// `None` for parallel or degenerate lines.
#[must_use]
pub fn closest_points_line_line(
    a0: Point3,
    a1: Point3,
    b0: Point3,
    b1: Point3,
) -> Option<(Point3, Point3)> {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let r = a0 - b0;

    let a = d1.dot(d1);
    let e = d2.dot(d2);
    if a <= Tolerance::ZERO_LENGTH.eps || e <= Tolerance::ZERO_LENGTH.eps {
        return None;
    }

    let b = d1.dot(d2);
    let c = d1.dot(r);
    let f = d2.dot(r);
    let denom = a * e - b * b;
    if denom.abs() <= Tolerance::PARALLEL.eps * a * e {
        return None;
    }

    let s = (b * f - c * e) / denom;
    let t = (a * f - b * c) / denom;
    Some((a0 + d1 * s, b0 + d2 * t))
}

/// Arithmetic mean of `points`, `None` for an empty slice.
#[must_use]
pub fn average(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vec3::ZERO, |acc, p| acc + p.to_vec3());
    let avg = sum / points.len() as f64;
    Some(Point3::new(avg.x, avg.y, avg.z))
}

/// Angle in degrees at `vertex` between the directions to `prev` and `next`,
/// `None` when either neighbour coincides with the vertex.
#[must_use]
pub fn corner_angle_degrees(prev: Point3, vertex: Point3, next: Point3) -> Option<f64> {
    (prev - vertex)
        .angle_to(next - vertex)
        .map(f64::to_degrees)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_rejects_zero_normal() {
        assert!(Plane::new(Point3::ORIGIN, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_reflect_is_involution() {
        let plane = Plane::new(Point3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)).unwrap();
        let p = Point3::new(3.0, 1.0, -2.0);
        let once = plane.reflect(p);
        assert_eq!(once, Point3::new(-1.0, 1.0, -2.0));
        assert_eq!(plane.reflect(once), p);
    }

    #[test]
    fn test_corner_angle_straight_line() {
        let angle = corner_angle_degrees(
            Point3::new(-1.0, 0.0, 0.0),
            Point3::ORIGIN,
            Point3::new(2.0, 0.0, 0.0),
        )
        .unwrap();
        assert!((angle - 180.0).abs() < 1e-9);
        assert!(corner_angle_degrees(Point3::ORIGIN, Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)).is_none());
    }
}
