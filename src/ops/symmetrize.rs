//! Symmetrize: mirror the active spline across a plane.
//!
//! Points on the positive side of the plane (the side the normal points to)
//! are retained. Segments crossing the plane get an intersection point, and
//! the retained runs between intersections are completed by their mirror
//! image.
//!
//! Two regimes fall out of the classification:
//! - **Easy**: everything is retained and nothing touches the plane, so the
//!   result is simply a mirrored copy appended next to the original.
//! - **Complex**: the spline is replaced by one spline per retained run,
//!   each made of the run and its reflection, joined at the plane.

use crate::curve::{
    CurveSnapshot, NewSpline, Point, PointData, RebuildPlan, SplineData, SplineRef, SplineType,
    rebuild_spline,
};
use crate::geom::{Plane, Point3, Tolerance, Transform, Vec3, corner_angle_degrees, round_to};

/// One of the six signed axes of a mirror frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorAxis {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl MirrorAxis {
    #[must_use]
    pub const fn direction(self) -> Vec3 {
        match self {
            Self::PositiveX => Vec3::X,
            Self::NegativeX => Vec3::new(-1.0, 0.0, 0.0),
            Self::PositiveY => Vec3::Y,
            Self::NegativeY => Vec3::new(0.0, -1.0, 0.0),
            Self::PositiveZ => Vec3::Z,
            Self::NegativeZ => Vec3::new(0.0, 0.0, -1.0),
        }
    }

    /// Mirror plane through the origin of `frame`, normal along this axis.
    ///
    /// `frame` maps the mirror frame into the curve's local space: identity
    /// for the object itself, `object⁻¹ · cursor` for a 3D cursor. It is
    /// expected to be rigid.
    #[must_use]
    pub fn plane_in(self, frame: Transform) -> Option<Plane> {
        Plane::new(
            frame.apply_point(Point3::ORIGIN),
            frame.apply_vec(self.direction()),
        )
    }

    /// Parses `"+X"`, `"-y"`, `"POSITIVE_Z"` and friends.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "X" | "+X" | "POSITIVE_X" => Some(Self::PositiveX),
            "-X" | "NEGATIVE_X" => Some(Self::NegativeX),
            "Y" | "+Y" | "POSITIVE_Y" => Some(Self::PositiveY),
            "-Y" | "NEGATIVE_Y" => Some(Self::NegativeY),
            "Z" | "+Z" | "POSITIVE_Z" => Some(Self::PositiveZ),
            "-Z" | "NEGATIVE_Z" => Some(Self::NegativeZ),
            _ => None,
        }
    }
}

/// Options for symmetrize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetrizeOptions {
    /// Drop intersection points that sit on a straight line between their
    /// neighbours (complex regime only).
    pub remove_redundant: bool,
}

impl SymmetrizeOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            remove_redundant: true,
        }
    }

    #[must_use]
    pub const fn remove_redundant(mut self, remove: bool) -> Self {
        self.remove_redundant = remove;
        self
    }
}

impl Default for SymmetrizeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during symmetrize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymmetrizeError {
    #[error("symmetrize needs an active spline")]
    NoActiveSpline,

    #[error("symmetrize supports POLY and NURBS splines, got {0:?}")]
    UnsupportedType(SplineType),

    #[error("mirror plane normal has zero length")]
    DegeneratePlane,

    #[error("invalid symmetry: no point of the active spline lies on the kept side of the mirror plane")]
    NothingRetained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymmetrizeKind {
    #[default]
    Easy,
    Complex,
}

/// Diagnostics for symmetrize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymmetrizeDiagnostics {
    pub kind: SymmetrizeKind,
    /// Intersection points inserted on crossing segments.
    pub intersections_inserted: usize,
    /// Source points on the discarded side.
    pub discarded: usize,
    /// Redundant intersection points found, removed or not.
    pub redundant: usize,
    pub redundant_removed: bool,
    /// `(source, mirrored)` location pairs, for previews.
    pub mirror_lines: Vec<(Point3, Point3)>,
    /// Locations of redundant points, for previews.
    pub redundant_points: Vec<Point3>,
    pub splines_created: usize,
}

#[derive(Debug, Clone, Copy)]
struct Tagged {
    point: Point,
    is_intersect: bool,
    is_gap: bool,
    keep: bool,
    is_first: bool,
}

impl Tagged {
    const fn new(point: Point, is_gap: bool) -> Self {
        Self {
            point,
            is_intersect: false,
            is_gap,
            keep: false,
            is_first: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RunPoint {
    point: Point,
    is_intersect: bool,
    is_first: bool,
    is_redundant: bool,
}

/// Resolves `axis` in `frame` and symmetrizes across it.
///
/// # Errors
/// See [`symmetrize`]; additionally [`SymmetrizeError::DegeneratePlane`] when
/// the frame collapses the axis.
pub fn symmetrize_across_axis(
    snapshot: &CurveSnapshot,
    axis: MirrorAxis,
    frame: Transform,
    options: SymmetrizeOptions,
) -> Result<(RebuildPlan, SymmetrizeDiagnostics), SymmetrizeError> {
    let plane = axis.plane_in(frame).ok_or(SymmetrizeError::DegeneratePlane)?;
    symmetrize(snapshot, plane, options)
}

/// Mirrors the active spline across `plane`.
///
/// # Errors
/// [`SymmetrizeError::NoActiveSpline`] and
/// [`SymmetrizeError::UnsupportedType`] for an unusable active spline,
/// [`SymmetrizeError::NothingRetained`] when every point lies on the
/// discarded side.
pub fn symmetrize(
    snapshot: &CurveSnapshot,
    plane: Plane,
    options: SymmetrizeOptions,
) -> Result<(RebuildPlan, SymmetrizeDiagnostics), SymmetrizeError> {
    let spline = snapshot
        .active_spline()
        .ok_or(SymmetrizeError::NoActiveSpline)?;
    if !spline.settings.kind.is_editable() {
        return Err(SymmetrizeError::UnsupportedType(spline.settings.kind));
    }

    let mut diagnostics = SymmetrizeDiagnostics::default();
    let mut tagged = tag_intersections(spline, &plane, &mut diagnostics);
    classify_sides(&mut tagged, &plane);
    diagnostics.discarded = tagged.iter().filter(|p| !p.keep).count();

    if !tagged.iter().any(|p| p.keep) {
        return Err(SymmetrizeError::NothingRetained);
    }

    let mut plan = RebuildPlan::new();
    if tagged.iter().any(|p| p.is_intersect || !p.keep) {
        diagnostics.kind = SymmetrizeKind::Complex;
        let runs = complex_runs(spline, tagged, &plane, &mut diagnostics);
        diagnostics.redundant_removed = options.remove_redundant && diagnostics.redundant > 0;

        plan.remove.push(spline.id);
        for (cyclic, run) in runs {
            let points: Vec<PointData> = run
                .into_iter()
                .filter(|p| !(options.remove_redundant && p.is_redundant))
                .map(|p| PointData::new(0, p.point))
                .collect();
            if points.is_empty() {
                continue;
            }
            let mut new_spline = rebuild_spline(spline, Some(points));
            new_spline.settings.cyclic = cyclic;
            plan.insert.push(new_spline);
        }
        if !plan.insert.is_empty() {
            plan.new_active = Some(SplineRef::Inserted(0));
        }
    } else {
        diagnostics.kind = SymmetrizeKind::Easy;
        plan.insert.push(easy_mirror(spline, &tagged, &plane, &mut diagnostics));
        plan.new_active = Some(SplineRef::Existing(spline.id));
    }
    diagnostics.splines_created = plan.insert.len();

    log::debug!(
        "symmetrize: {:?}, {} inserted, {} discarded, {} redundant",
        diagnostics.kind,
        diagnostics.intersections_inserted,
        diagnostics.discarded,
        diagnostics.redundant
    );

    Ok((plan, diagnostics))
}

/// Copies the points and inserts an intersection point on every segment that
/// properly crosses the plane.
fn tag_intersections(
    spline: &SplineData,
    plane: &Plane,
    diagnostics: &mut SymmetrizeDiagnostics,
) -> Vec<Tagged> {
    let len = spline.points.len();
    let cyclic = spline.settings.cyclic;
    let is_gap = |idx: usize| cyclic && (idx == 0 || idx + 1 == len);

    let mut tagged = Vec::with_capacity(len + 4);
    for (idx, data) in spline.points.iter().enumerate() {
        tagged.push(Tagged::new(data.point, is_gap(idx)));

        let next_idx = if idx + 1 < len {
            idx + 1
        } else if cyclic {
            0
        } else {
            continue;
        };
        let next = &spline.points[next_idx];
        let (co, next_co) = (data.co(), next.co());

        let Some(hit) = plane.intersect_line(co, next_co) else {
            continue;
        };
        if Tolerance::rounds_to_zero(hit.distance_to(co)) {
            if let Some(current) = tagged.last_mut() {
                current.is_intersect = true;
            }
            continue;
        }
        if Tolerance::rounds_to_zero(hit.distance_to(next_co)) {
            // Picked up when the next point is classified.
            continue;
        }

        let dir = next_co - co;
        let hit_dir = hit - co;
        let ahead = match (dir.normalized(), hit_dir.normalized()) {
            (Some(d), Some(h)) => d.dot(h) > 0.99,
            _ => false,
        };
        if ahead && hit_dir.length() < dir.length() {
            let in_gap = is_gap(idx) && is_gap(next_idx);
            if in_gap {
                if let Some(current) = tagged.last_mut() {
                    current.is_gap = false;
                }
            }
            let point = Point::new(hit)
                .with_radius((data.point.radius + next.point.radius) / 2.0)
                .with_tilt((data.point.tilt + next.point.tilt) / 2.0);
            let mut intersection = Tagged::new(point, in_gap);
            intersection.is_intersect = true;
            tagged.push(intersection);
            diagnostics.intersections_inserted += 1;
        }
    }
    tagged
}

fn classify_sides(tagged: &mut [Tagged], plane: &Plane) {
    for p in tagged {
        if p.is_intersect {
            p.keep = true;
            continue;
        }
        let distance = plane.signed_distance(p.point.co);
        if Tolerance::rounds_to_zero(distance) {
            p.is_intersect = true;
            p.keep = true;
        } else {
            p.keep = distance > 0.0;
        }
    }
}

fn mirrored(point: &Point, plane: &Plane, tilt: f64) -> Point {
    Point::new(plane.reflect(point.co))
        .with_radius(point.radius)
        .with_tilt(tilt)
}

fn easy_mirror(
    spline: &SplineData,
    tagged: &[Tagged],
    plane: &Plane,
    diagnostics: &mut SymmetrizeDiagnostics,
) -> NewSpline {
    let points = tagged
        .iter()
        .map(|t| {
            let m = mirrored(&t.point, plane, -t.point.tilt);
            diagnostics.mirror_lines.push((t.point.co, m.co));
            PointData::new(0, m)
        })
        .collect();
    let mut new_spline = rebuild_spline(spline, Some(points));
    new_spline.active = false;
    new_spline
}

/// Splits the retained points into runs and completes each with its mirror
/// image. Returns `(cyclic, points)` per output spline.
fn complex_runs(
    spline: &SplineData,
    mut tagged: Vec<Tagged>,
    plane: &Plane,
    diagnostics: &mut SymmetrizeDiagnostics,
) -> Vec<(bool, Vec<RunPoint>)> {
    // A closed source whose seam survives would otherwise produce a run that
    // wraps around the end of the list.
    let kept_gaps = tagged.iter().filter(|p| p.is_gap && p.keep).count();
    if spline.settings.cyclic && kept_gaps == 2 {
        if let Some(first_removed) = tagged.iter().position(|p| !p.keep && !p.is_gap) {
            tagged[0].is_first = true;
            tagged.rotate_left(first_removed);
        }
    }

    let mut runs: Vec<Vec<Tagged>> = Vec::new();
    let mut open_run = false;
    for p in tagged.into_iter().filter(|p| p.keep) {
        if runs.is_empty() || p.is_intersect {
            open_run = !open_run;
            if open_run {
                runs.push(Vec::new());
            }
        }
        if let Some(run) = runs.last_mut() {
            run.push(p);
        }
    }

    runs.into_iter()
        .filter(|run| !run.is_empty())
        .map(|run| {
            let first_is_intersect = run.first().is_some_and(|p| p.is_intersect);
            let last_is_intersect = run.last().is_some_and(|p| p.is_intersect);
            let cyclic = run.len() > 2 && first_is_intersect && last_is_intersect;

            let originals = run.iter().map(|p| RunPoint {
                point: p.point,
                is_intersect: p.is_intersect,
                is_first: p.is_first,
                is_redundant: false,
            });
            let reflections: Vec<RunPoint> = run
                .iter()
                .rev()
                .filter(|p| !p.is_intersect)
                .map(|p| {
                    let m = mirrored(&p.point, plane, p.point.tilt);
                    diagnostics.mirror_lines.push((p.point.co, m.co));
                    RunPoint {
                        point: m,
                        is_intersect: false,
                        is_first: false,
                        is_redundant: false,
                    }
                })
                .collect();

            let mut points: Vec<RunPoint> = if last_is_intersect {
                originals.chain(reflections).collect()
            } else {
                reflections.into_iter().chain(originals).collect()
            };

            if cyclic {
                if let Some(first) = points.iter().position(|p| p.is_first) {
                    points.rotate_left(first);
                }
            }

            mark_redundant(&mut points, cyclic, diagnostics);
            (cyclic, points)
        })
        .collect()
}

/// Flags intersection points whose neighbours lie on a straight line
/// through them (180° after rounding to [`Tolerance::REDUNDANT_ANGLE_DECIMALS`]).
fn mark_redundant(points: &mut [RunPoint], cyclic: bool, diagnostics: &mut SymmetrizeDiagnostics) {
    let len = points.len();
    for idx in 0..len {
        if !points[idx].is_intersect {
            continue;
        }
        let prev = if idx > 0 {
            Some(idx - 1)
        } else if cyclic {
            Some(len - 1)
        } else {
            None
        };
        let next = if idx + 1 < len {
            Some(idx + 1)
        } else if cyclic {
            Some(0)
        } else {
            None
        };
        let (Some(prev), Some(next)) = (prev, next) else {
            continue;
        };

        let straight = corner_angle_degrees(points[prev].point.co, points[idx].point.co, points[next].point.co)
            .is_some_and(|deg| round_to(deg, Tolerance::REDUNDANT_ANGLE_DECIMALS) == 180.0);
        if straight {
            points[idx].is_redundant = true;
            diagnostics.redundant += 1;
            diagnostics.redundant_points.push(points[idx].point.co);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Curve, Spline};

    fn active_curve(spline: Spline) -> Curve {
        let mut curve = Curve::new();
        let id = curve.add_spline(spline).unwrap();
        curve.set_active(Some(id));
        curve
    }

    fn x_plane(x: f64) -> Plane {
        Plane::new(Point3::new(x, 0.0, 0.0), Vec3::X).unwrap()
    }

    fn coords(spline: &Spline) -> Vec<[f64; 3]> {
        spline
            .points
            .iter()
            .map(|p| {
                let c = p.co;
                [round_to(c.x, 9), round_to(c.y, 9), round_to(c.z, 9)]
            })
            .collect()
    }

    #[test]
    fn test_line_through_plane() {
        let source = Spline::poly(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);

        let mut curve = active_curve(source.clone());
        let options = SymmetrizeOptions::new().remove_redundant(false);
        let (plan, diag) = symmetrize(&curve.snapshot(), x_plane(1.0), options).unwrap();
        assert_eq!(diag.kind, SymmetrizeKind::Complex);
        assert_eq!(diag.discarded, 1);
        assert_eq!(diag.intersections_inserted, 0);
        assert_eq!(diag.redundant, 1);
        curve.apply(plan);

        assert_eq!(curve.len(), 1);
        let spline = curve.active_spline().unwrap();
        assert!(!spline.settings.cyclic);
        assert_eq!(
            coords(spline),
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]
        );

        // The point on the plane is straight between its neighbours.
        let mut curve = active_curve(source);
        let (plan, diag) = symmetrize(&curve.snapshot(), x_plane(1.0), SymmetrizeOptions::new()).unwrap();
        assert!(diag.redundant_removed);
        curve.apply(plan);
        assert_eq!(coords(curve.active_spline().unwrap()), vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_easy_mirror_appends_copy() {
        let mut curve = active_curve(
            Spline::poly(&[[2.0, 0.0, 0.0], [3.0, 1.0, 0.0]]),
        );
        let original = curve.active();
        let mut snap = curve.snapshot();
        let plane = x_plane(1.0);
        let (plan, diag) = symmetrize(&snap, plane, SymmetrizeOptions::new()).unwrap();
        assert_eq!(diag.kind, SymmetrizeKind::Easy);
        curve.apply(plan);

        assert_eq!(curve.len(), 2);
        assert_eq!(curve.active(), original);
        let copy = curve.spline_at(1).unwrap();
        assert_eq!(coords(copy), vec![[0.0, 0.0, 0.0], [-1.0, 1.0, 0.0]]);

        // Mirroring the copy again reproduces the source.
        snap = curve.snapshot();
        for (src, m) in snap.splines[0].points.iter().zip(&snap.splines[1].points) {
            assert!(Tolerance::default_geom().approx_eq_point3(src.co(), plane.reflect(m.co())));
        }
    }

    #[test]
    fn test_easy_mirror_negates_tilt() {
        let mut spline = Spline::poly(&[[2.0, 0.0, 0.0], [3.0, 0.0, 0.0]]);
        spline.points[0].tilt = 0.5;
        spline.points[0].radius = 2.0;
        let curve = active_curve(spline);
        let (plan, _) = symmetrize(&curve.snapshot(), x_plane(0.0), SymmetrizeOptions::new()).unwrap();
        let mirrored = &plan.insert[0].points[0].point;
        assert_eq!(mirrored.tilt, -0.5);
        assert_eq!(mirrored.radius, 2.0);
    }

    #[test]
    fn test_nothing_retained_is_invalid() {
        let curve = active_curve(Spline::poly(&[[-2.0, 0.0, 0.0], [-1.0, 0.0, 0.0]]));
        assert_eq!(
            symmetrize(&curve.snapshot(), x_plane(0.0), SymmetrizeOptions::new()),
            Err(SymmetrizeError::NothingRetained)
        );
    }

    #[test]
    fn test_crossing_segment_inserts_intersection() {
        let mut spline = Spline::poly(&[[-1.0, 0.0, 0.0], [1.0, 2.0, 0.0]]);
        spline.points[0].radius = 1.0;
        spline.points[1].radius = 3.0;
        let mut curve = active_curve(spline);
        let (plan, diag) = symmetrize(&curve.snapshot(), x_plane(0.0), SymmetrizeOptions::new()).unwrap();
        assert_eq!(diag.intersections_inserted, 1);
        curve.apply(plan);

        let spline = curve.active_spline().unwrap();
        assert_eq!(
            coords(spline),
            vec![[-1.0, 2.0, 0.0], [0.0, 1.0, 0.0], [1.0, 2.0, 0.0]]
        );
        assert_eq!(spline.points[1].radius, 2.0);
    }

    #[test]
    fn test_closed_square_keeps_redundant_points_on_request() {
        let square = Spline::poly(&[
            [-1.0, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ])
        .cyclic(true);

        let curve = active_curve(square.clone());
        let options = SymmetrizeOptions::new().remove_redundant(false);
        let (plan, diag) = symmetrize(&curve.snapshot(), x_plane(0.0), options).unwrap();
        assert_eq!(diag.redundant, 2);
        assert_eq!(plan.insert.len(), 1);
        assert!(plan.insert[0].settings.cyclic);
        assert_eq!(plan.insert[0].len(), 6);

        let mut curve = active_curve(square);
        let (plan, _) = symmetrize(&curve.snapshot(), x_plane(0.0), SymmetrizeOptions::new()).unwrap();
        curve.apply(plan);
        let spline = curve.active_spline().unwrap();
        assert_eq!(
            coords(spline),
            vec![[1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0], [-1.0, -1.0, 0.0]]
        );
    }

    #[test]
    fn test_closed_seam_restores_first_point() {
        let square = Spline::poly(&[
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
            [-1.0, -1.0, 0.0],
            [1.0, -1.0, 0.0],
        ])
        .cyclic(true);
        let mut curve = active_curve(square);
        let (plan, _) = symmetrize(&curve.snapshot(), x_plane(0.0), SymmetrizeOptions::new()).unwrap();
        curve.apply(plan);

        let spline = curve.active_spline().unwrap();
        assert!(spline.settings.cyclic);
        assert_eq!(
            coords(spline),
            vec![[1.0, 1.0, 0.0], [-1.0, 1.0, 0.0], [-1.0, -1.0, 0.0], [1.0, -1.0, 0.0]]
        );
    }

    #[test]
    fn test_axis_in_cursor_frame() {
        let frame = Transform::translate(Vec3::new(0.0, 2.0, 0.0));
        let plane = MirrorAxis::NegativeY.plane_in(frame).unwrap();
        assert_eq!(plane.origin, Point3::new(0.0, 2.0, 0.0));
        assert_eq!(plane.normal, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(MirrorAxis::parse("-y"), Some(MirrorAxis::NegativeY));
        assert_eq!(MirrorAxis::parse("POSITIVE_X"), Some(MirrorAxis::PositiveX));
        assert_eq!(MirrorAxis::parse("w"), None);
    }
}
