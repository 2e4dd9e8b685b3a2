//! Slide a single selected point along one of its adjoining segments.
//!
//! The caller supplies the view ray under the cursor. The point moves to
//! the spot on the chosen segment line closest to that ray.

use crate::curve::{CurveSnapshot, PointData, RebuildPlan, SelectionKey, rebuild_spline};
use crate::geom::{Point3, Ray, Vec3, closest_points_line_line};

/// Share of the displacement applied in precision mode.
const PRECISION_FACTOR: f64 = 0.2;

/// Segment adjoining the slid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideSegment {
    Previous,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlideOptions {
    /// Scale the move down for fine adjustment.
    pub precision: bool,
    /// Always slide along this segment when the point has both.
    pub locked: Option<SlideSegment>,
}

impl SlideOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            precision: false,
            locked: None,
        }
    }

    #[must_use]
    pub const fn precision(mut self, precision: bool) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub const fn locked(mut self, segment: SlideSegment) -> Self {
        self.locked = Some(segment);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlideError {
    #[error("exactly one point must be selected, got {count}")]
    NotSinglePoint { count: usize },

    #[error("cannot slide the only point of a spline")]
    NoSegment,

    #[error("view ray is parallel to the slide segment")]
    ParallelRay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideDiagnostics {
    pub point: SelectionKey,
    /// Segment the cursor favours, regardless of any lock.
    pub hovered: SlideSegment,
    /// Segment actually used.
    pub segment: SlideSegment,
    pub from: Point3,
    pub to: Point3,
}

/// Point on the line `co + t * dir` closest to `ray`, and how well the
/// cursor direction matches `dir`.
fn project_on_segment(co: Point3, dir: Vec3, ray: &Ray) -> Option<(Point3, f64)> {
    let (on_line, on_ray) =
        closest_points_line_line(co, co + dir, ray.origin, ray.origin + ray.direction)?;
    let alignment = (on_ray - co).normalized().map_or(0.0, |d| d.dot(dir));
    Some((on_line, alignment))
}

/// Slides the single selected point towards `ray`.
///
/// Neighbours are taken by index only; the closing segment of a cyclic
/// spline is not a slide direction.
///
/// # Errors
/// [`SlideError`] unless exactly one point is selected on a spline with
/// more than one point, or when the ray runs parallel to the segment.
pub fn slide_point(
    snapshot: &CurveSnapshot,
    ray: Ray,
    options: SlideOptions,
) -> Result<(RebuildPlan, SlideDiagnostics), SlideError> {
    let selection = snapshot.selection();
    let key = match selection.iter().next() {
        Some(&key) if selection.len() == 1 => key,
        _ => {
            return Err(SlideError::NotSinglePoint {
                count: selection.len(),
            });
        }
    };

    let spline = snapshot
        .spline(key.spline)
        .ok_or(SlideError::NotSinglePoint { count: 0 })?;
    if spline.points.len() < 2 {
        return Err(SlideError::NoSegment);
    }

    let co = spline.points[key.point].co();
    let direction = |i: usize| (spline.points[i].co() - co).normalized();
    let prev_dir = key.point.checked_sub(1).and_then(direction);
    let next_dir = (key.point < spline.last_index())
        .then(|| direction(key.point + 1))
        .flatten();

    let prev = prev_dir.and_then(|d| project_on_segment(co, d, &ray));
    let next = next_dir.and_then(|d| project_on_segment(co, d, &ray));

    let (hovered, segment, slid) = match (prev, next) {
        (Some((prev_co, prev_dot)), Some((next_co, next_dot))) => {
            let hovered = if next_dot > prev_dot {
                SlideSegment::Next
            } else {
                SlideSegment::Previous
            };
            match options.locked.unwrap_or(hovered) {
                SlideSegment::Previous => (hovered, SlideSegment::Previous, prev_co),
                SlideSegment::Next => (hovered, SlideSegment::Next, next_co),
            }
        }
        (Some((prev_co, _)), None) => (SlideSegment::Previous, SlideSegment::Previous, prev_co),
        (None, Some((next_co, _))) => (SlideSegment::Next, SlideSegment::Next, next_co),
        (None, None) => return Err(SlideError::ParallelRay),
    };

    let target = if options.precision {
        co + (slid - co) * PRECISION_FACTOR
    } else {
        slid
    };

    let mut points: Vec<PointData> = spline.points.clone();
    points[key.point].point.co = target;
    log::debug!("slide point {key:?} along {segment:?} to {target:?}");

    let diagnostics = SlideDiagnostics {
        point: key,
        hovered,
        segment,
        from: co,
        to: target,
    };
    Ok((
        RebuildPlan::replace(spline.id, vec![rebuild_spline(spline, Some(points))]),
        diagnostics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Curve, Spline};

    /// L-shaped spline: the middle point has a segment along -X and one along +Y.
    fn corner_curve() -> Curve {
        let mut curve = Curve::new();
        curve.add_spline(
            Spline::poly(&[[-4.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 4.0, 0.0]]).with_selected(&[1]),
        );
        curve
    }

    fn ray_down_at(x: f64, y: f64) -> Ray {
        Ray::new(Point3::new(x, y, 10.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn test_slide_follows_hovered_segment() {
        let mut curve = corner_curve();
        let (plan, diag) = slide_point(&curve.snapshot(), ray_down_at(0.3, 2.0), SlideOptions::new()).unwrap();
        assert_eq!(diag.segment, SlideSegment::Next);
        assert_eq!(diag.to, Point3::new(0.0, 2.0, 0.0));
        curve.apply(plan);
        assert_eq!(curve.spline_at(0).unwrap().points[1].co, Point3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_slide_lock_overrides_hover() {
        let curve = corner_curve();
        let options = SlideOptions::new().locked(SlideSegment::Previous);
        let (_, diag) = slide_point(&curve.snapshot(), ray_down_at(-1.0, 2.0), options).unwrap();
        assert_eq!(diag.hovered, SlideSegment::Next);
        assert_eq!(diag.segment, SlideSegment::Previous);
        assert_eq!(diag.to, Point3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_slide_precision_scales_move() {
        let curve = corner_curve();
        let options = SlideOptions::new().precision(true);
        let (_, diag) = slide_point(&curve.snapshot(), ray_down_at(-2.0, 0.5), options).unwrap();
        assert_eq!(diag.segment, SlideSegment::Previous);
        assert!((diag.to.x + 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_slide_end_point_uses_only_neighbour() {
        let mut curve = Curve::new();
        curve.add_spline(Spline::poly(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]]).with_selected(&[0]));
        let (_, diag) = slide_point(&curve.snapshot(), ray_down_at(1.0, 3.0), SlideOptions::new()).unwrap();
        assert_eq!(diag.segment, SlideSegment::Next);
        assert_eq!(diag.to, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_slide_requires_single_selection() {
        let mut curve = Curve::new();
        curve.add_spline(Spline::poly(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]]).with_selected(&[0, 1]));
        assert_eq!(
            slide_point(&curve.snapshot(), ray_down_at(1.0, 0.0), SlideOptions::new()).unwrap_err(),
            SlideError::NotSinglePoint { count: 2 }
        );

        let single = Curve::with_single_point(Point3::ORIGIN);
        assert_eq!(
            slide_point(&single.snapshot(), ray_down_at(1.0, 0.0), SlideOptions::new()).unwrap_err(),
            SlideError::NoSegment
        );
    }
}
