//! Viewport projection seam.
//!
//! The curve edits never talk to a renderer. They only need to map points to
//! screen pixels and pixels back to view rays, which is what
//! [`ViewProjection`] offers. [`ViewportProjection`] implements it for a plain
//! view-projection matrix, which is all a web host or a test needs.

use super::core::{Point2, Point3, Tolerance, Transform};
use super::intersect::Ray;

/// 3D ↔ screen mapping consumed by the knife and slide tools.
///
/// `Sync` so hit searches can fan out over splines with the `parallel` feature.
pub trait ViewProjection: Sync {
    /// Viewport width and height in pixels.
    fn viewport_size(&self) -> (f64, f64);

    /// Screen position of `p`, or `None` when it cannot be projected (behind
    /// a perspective camera).
    fn project_to_screen(&self, p: Point3) -> Option<Point2>;

    /// View ray through the screen position `p`.
    fn unproject_ray(&self, p: Point2) -> Option<Ray>;

    fn is_orthographic(&self) -> bool;

    /// Inclusive bounds check against the viewport rectangle.
    fn is_on_screen(&self, p: Point2) -> bool {
        let (width, height) = self.viewport_size();
        (0.0..=width).contains(&p.x) && (0.0..=height).contains(&p.y)
    }
}

/// A viewport described by a combined view-projection matrix (OpenGL clip
/// conventions, NDC in `[-1, 1]`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportProjection {
    matrix: Transform,
    inverse: Transform,
    width: f64,
    height: f64,
    orthographic: bool,
}

impl ViewportProjection {
    /// Returns `None` for a singular matrix or an empty viewport.
    #[must_use]
    pub fn new(matrix: Transform, width: f64, height: f64, orthographic: bool) -> Option<Self> {
        if !(width > 0.0 && height > 0.0) {
            return None;
        }
        let inverse = matrix.inverse()?;
        Some(Self {
            matrix,
            inverse,
            width,
            height,
            orthographic,
        })
    }

    /// Orthographic camera looking down -Z onto the XY plane, showing
    /// `[-half_extent, half_extent]` vertically around `center`.
    #[must_use]
    pub fn top_orthographic(center: Point3, half_extent: f64, width: f64, height: f64) -> Option<Self> {
        let aspect = width / height;
        let projection = orthographic_matrix(
            -half_extent * aspect,
            half_extent * aspect,
            -half_extent,
            half_extent,
            0.1,
            1000.0,
        );
        let view = Transform::from_rows([
            [1.0, 0.0, 0.0, -center.x],
            [0.0, 1.0, 0.0, -center.y],
            [0.0, 0.0, 1.0, -center.z - 100.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Self::new(projection * view, width, height, true)
    }

    /// Perspective camera at `eye` looking down -Z.
    #[must_use]
    pub fn top_perspective(eye: Point3, fov_y: f64, width: f64, height: f64) -> Option<Self> {
        let projection = perspective_matrix(fov_y, width / height, 0.1, 1000.0);
        let view = Transform::from_rows([
            [1.0, 0.0, 0.0, -eye.x],
            [0.0, 1.0, 0.0, -eye.y],
            [0.0, 0.0, 1.0, -eye.z],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Self::new(projection * view, width, height, false)
    }

    fn screen_to_ndc(&self, p: Point2) -> (f64, f64) {
        (2.0 * p.x / self.width - 1.0, 2.0 * p.y / self.height - 1.0)
    }

    fn unproject(&self, x: f64, y: f64, z: f64) -> Option<Point3> {
        let v = self.inverse.apply_homogeneous([x, y, z, 1.0]);
        if v[3].abs() <= Tolerance::ZERO_LENGTH.eps {
            return None;
        }
        Some(Point3::new(v[0] / v[3], v[1] / v[3], v[2] / v[3]))
    }
}

impl ViewProjection for ViewportProjection {
    fn viewport_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn project_to_screen(&self, p: Point3) -> Option<Point2> {
        let clip = self.matrix.apply_homogeneous([p.x, p.y, p.z, 1.0]);
        if clip[3] <= Tolerance::ZERO_LENGTH.eps {
            return None;
        }
        let ndc_x = clip[0] / clip[3];
        let ndc_y = clip[1] / clip[3];
        Some(Point2::new(
            (ndc_x + 1.0) * 0.5 * self.width,
            (ndc_y + 1.0) * 0.5 * self.height,
        ))
    }

    fn unproject_ray(&self, p: Point2) -> Option<Ray> {
        let (x, y) = self.screen_to_ndc(p);
        let near = self.unproject(x, y, -1.0)?;
        let far = self.unproject(x, y, 1.0)?;
        let direction = (far - near).normalized()?;
        Some(Ray::new(near, direction))
    }

    fn is_orthographic(&self) -> bool {
        self.orthographic
    }
}

#[must_use]
pub fn orthographic_matrix(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Transform {
    Transform::from_rows([
        [2.0 / (right - left), 0.0, 0.0, -(right + left) / (right - left)],
        [0.0, 2.0 / (top - bottom), 0.0, -(top + bottom) / (top - bottom)],
        [0.0, 0.0, -2.0 / (far - near), -(far + near) / (far - near)],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

#[must_use]
pub fn perspective_matrix(fov_y: f64, aspect: f64, near: f64, far: f64) -> Transform {
    let f = 1.0 / (fov_y * 0.5).tan();
    Transform::from_rows([
        [f / aspect, 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, (far + near) / (near - far), 2.0 * far * near / (near - far)],
        [0.0, 0.0, -1.0, 0.0],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_orthographic_maps_center_to_middle() {
        let view = ViewportProjection::top_orthographic(Point3::ORIGIN, 10.0, 200.0, 200.0).unwrap();
        let p = view.project_to_screen(Point3::ORIGIN).unwrap();
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);

        let corner = view.project_to_screen(Point3::new(10.0, 10.0, 0.0)).unwrap();
        assert!((corner.x - 200.0).abs() < 1e-9);
        assert!((corner.y - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthographic_ray_points_down() {
        let view = ViewportProjection::top_orthographic(Point3::ORIGIN, 10.0, 200.0, 200.0).unwrap();
        let ray = view.unproject_ray(Point2::new(150.0, 100.0)).unwrap();
        assert!((ray.direction.z + 1.0).abs() < 1e-9);
        assert!((ray.origin.x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_perspective_rejects_points_behind_camera() {
        let view = ViewportProjection::top_perspective(
            Point3::new(0.0, 0.0, 10.0),
            std::f64::consts::FRAC_PI_2,
            100.0,
            100.0,
        )
        .unwrap();
        assert!(view.project_to_screen(Point3::new(0.0, 0.0, 20.0)).is_none());
        let p = view.project_to_screen(Point3::ORIGIN).unwrap();
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!(view.is_on_screen(p));
        assert!(!view.is_on_screen(Point2::new(-1.0, 5.0)));
    }
}
