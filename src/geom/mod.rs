//! Geometric primitives for curve editing: vectors, transforms, tolerances,
//! intersections and the viewport projection seam.

mod core;
mod intersect;
mod view;

pub use self::core::{Point2, Point3, Tolerance, Transform, Vec3, round_to};
pub use intersect::{
    Plane, Ray, average, closest_points_line_line, corner_angle_degrees, intersect_line_plane,
    intersect_segments_2d,
};
pub use view::{ViewProjection, ViewportProjection, orthographic_matrix, perspective_matrix};

#[cfg(test)]
mod tests;
