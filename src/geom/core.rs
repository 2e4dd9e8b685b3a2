use std::ops::{Add, Div, Mul, Neg, Sub};

// ─────────────────────────────────────────────────────────────────────────────
// Vec3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y).hypot(self.z)
    }

    /// Unit vector in the same direction, `None` for zero or non-finite input.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        (len.is_finite() && len > 0.0).then(|| self / len)
    }

    /// Unsigned angle to `rhs` in radians, `None` if either vector has zero length.
    #[must_use]
    pub fn angle_to(self, rhs: Self) -> Option<f64> {
        let denom = self.length() * rhs.length();
        if !denom.is_finite() || denom <= 0.0 {
            return None;
        }
        Some((self.dot(rhs) / denom).clamp(-1.0, 1.0).acos())
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + -rhs
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, s: f64) -> Self {
        Self::new(self.x / s, self.y / s, self.z / s)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        self * -1.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Position vector from the origin.
    #[must_use]
    pub const fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (self - other).length()
    }
}

impl From<[f64; 3]> for Point3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        p.to_array()
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;
    fn add(self, v: Vec3) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}

impl Sub<Vec3> for Point3 {
    type Output = Self;
    fn sub(self, v: Vec3) -> Self {
        self + -v
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Vec3 {
        self.to_vec3() - rhs.to_vec3()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point2
// ─────────────────────────────────────────────────────────────────────────────

/// A position in screen space (pixels, origin bottom left).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        Self::new(self.x + (rhs.x - self.x) * t, self.y + (rhs.y - self.y) * t)
    }

    /// Snap to the pixel grid, the way viewport hit tests report locations.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }
}

impl From<[f64; 2]> for Point2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────────────────────────────────────

/// Row-major 4x4 matrix. Object frames, mirror frames and view projections all
/// use it, so `apply_homogeneous` keeps the full projective row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: [[f64; 4]; 4],
}

impl Transform {
    #[must_use]
    pub const fn identity() -> Self {
        Self::translate(Vec3::ZERO)
    }

    #[must_use]
    pub const fn from_rows(m: [[f64; 4]; 4]) -> Self {
        Self { m }
    }

    /// Build from 16 values in row-major order, `None` on a wrong length.
    #[must_use]
    pub fn from_row_major(values: &[f64]) -> Option<Self> {
        if values.len() != 16 {
            return None;
        }
        let mut m = [[0.0; 4]; 4];
        for (row, chunk) in m.iter_mut().zip(values.chunks_exact(4)) {
            row.copy_from_slice(chunk);
        }
        Some(Self { m })
    }

    #[must_use]
    pub const fn translate(offset: Vec3) -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, offset.x],
            [0.0, 1.0, 0.0, offset.y],
            [0.0, 0.0, 1.0, offset.z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Inverse by Gauss-Jordan elimination with partial pivoting.
    ///
    /// `None` when the matrix is singular or holds non-finite values.
    #[must_use]
    pub fn inverse(self) -> Option<Self> {
        let mut a = self.m;
        let mut inv = Self::identity().m;

        for col in 0..4 {
            let pivot = (col..4).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
            let p = a[pivot][col];
            if !p.is_finite() || p.abs() <= Tolerance::ZERO_LENGTH.eps {
                return None;
            }
            a.swap(col, pivot);
            inv.swap(col, pivot);

            for k in 0..4 {
                a[col][k] /= p;
                inv[col][k] /= p;
            }
            for row in (0..4).filter(|&r| r != col) {
                let factor = a[row][col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..4 {
                    a[row][k] -= factor * a[col][k];
                    inv[row][k] -= factor * inv[col][k];
                }
            }
        }
        Some(Self { m: inv })
    }

    #[must_use]
    pub fn apply_point(self, p: Point3) -> Point3 {
        let [x, y, z, _] = self.apply_homogeneous([p.x, p.y, p.z, 1.0]);
        Point3::new(x, y, z)
    }

    #[must_use]
    pub fn apply_vec(self, v: Vec3) -> Vec3 {
        let [x, y, z, _] = self.apply_homogeneous([v.x, v.y, v.z, 0.0]);
        Vec3::new(x, y, z)
    }

    /// Multiply `[x, y, z, w]` by the full matrix, without the perspective divide.
    #[must_use]
    pub fn apply_homogeneous(self, v: [f64; 4]) -> [f64; 4] {
        self.m
            .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// `a * b` applies `b` first.
impl Mul for Transform {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        Self { m }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tolerance
// ─────────────────────────────────────────────────────────────────────────────

/// Tolerance configuration for curve edits.
///
/// Two different comparison styles are in use:
/// - epsilon comparisons (`eps`) for parallel/degenerate detection,
/// - decimal rounding (`ON_PLANE_DECIMALS`, `REDUNDANT_ANGLE_DECIMALS`) for the
///   on-plane and straight-angle tests. Those are rounded before comparing, so
///   `1e-7` counts as zero while `1e-5` does not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    pub const DEFAULT: Self = Self { eps: 1e-9 };

    /// Parallel test for line/segment intersections.
    pub const PARALLEL: Self = Self { eps: 1e-9 };

    /// Zero-length vectors, pivots and homogeneous weights.
    pub const ZERO_LENGTH: Self = Self { eps: 1e-12 };

    /// Decimal places used when deciding whether a point lies on a plane.
    pub const ON_PLANE_DECIMALS: i32 = 6;

    /// Decimal places of the degree value used by the redundant point test.
    pub const REDUNDANT_ANGLE_DECIMALS: i32 = 2;

    #[must_use]
    pub const fn default_geom() -> Self {
        Self::DEFAULT
    }

    #[must_use]
    pub fn approx_eq_point3(self, a: Point3, b: Point3) -> bool {
        a.distance_to(b) <= self.eps
    }

    /// True when `value` rounds to zero at [`Self::ON_PLANE_DECIMALS`].
    #[must_use]
    pub fn rounds_to_zero(value: f64) -> bool {
        round_to(value, Self::ON_PLANE_DECIMALS) == 0.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Round half away from zero at `decimals` places. Negative zero is folded to zero.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 { 0.0 } else { rounded }
}
