//! Knife: cut splines along a screen-space line.
//!
//! The cut line lives in screen space. Every spline segment with at least
//! one on-screen endpoint is projected and intersected with it in 2D; the 3D
//! cut position is then recovered by intersecting the segment with the plane
//! spanned by the view rays through the two ends of the cut line.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::curve::{CurveSnapshot, NewSpline, Point, PointData, RebuildPlan, SplineData, rebuild_spline};
use crate::geom::{Plane, Point2, Point3, ViewProjection, intersect_segments_2d};

/// Options for knife cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KnifeOptions {
    /// Split the affected splines at every cut instead of only inserting points.
    pub split: bool,
}

impl KnifeOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self { split: false }
    }

    #[must_use]
    pub const fn split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }
}

/// One crossing of the cut line with a projected segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnifeHit {
    pub spline: usize,
    /// Point indices of the segment, `(from, to)`. The closing segment of a
    /// cyclic spline is `(last, 0)`.
    pub segment: (usize, usize),
    pub screen: Point2,
}

/// Diagnostics for knife cuts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnifeDiagnostics {
    pub segments_tested: usize,
    pub hits: usize,
    /// Hits that produced a 3D cut point.
    pub cuts: usize,
    pub splines_cut: usize,
    /// Splines produced by the split pass.
    pub splines_created: usize,
    pub warnings: Vec<String>,
}

struct Cut {
    segment: (usize, usize),
    co: Point3,
}

#[derive(Clone, Copy)]
struct KnifePoint {
    point: Point,
    is_split: bool,
}

/// Finds all crossings of the screen-space line `start-end` with the
/// projected spline segments.
///
/// Segments whose endpoints are both off screen are skipped. Projected
/// positions are snapped to whole pixels.
#[must_use]
pub fn find_knife_hits(
    snapshot: &CurveSnapshot,
    start: Point2,
    end: Point2,
    view: &dyn ViewProjection,
) -> Vec<KnifeHit> {
    spline_hits(&snapshot.splines, start, end, view)
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(feature = "parallel")]
fn spline_hits(
    splines: &[SplineData],
    start: Point2,
    end: Point2,
    view: &dyn ViewProjection,
) -> Vec<Vec<KnifeHit>> {
    splines
        .par_iter()
        .map(|spline| hits_for_spline(spline, start, end, view))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn spline_hits(
    splines: &[SplineData],
    start: Point2,
    end: Point2,
    view: &dyn ViewProjection,
) -> Vec<Vec<KnifeHit>> {
    splines
        .iter()
        .map(|spline| hits_for_spline(spline, start, end, view))
        .collect()
}

fn hits_for_spline(
    spline: &SplineData,
    start: Point2,
    end: Point2,
    view: &dyn ViewProjection,
) -> Vec<KnifeHit> {
    if !spline.settings.kind.is_editable() {
        return Vec::new();
    }

    let screen: Vec<Option<Point2>> = spline
        .points
        .iter()
        .map(|p| view.project_to_screen(p.co()).map(Point2::rounded))
        .collect();
    let on_screen = |p: Option<Point2>| p.is_some_and(|p| view.is_on_screen(p));

    knifeable_segments(spline)
        .filter_map(|(a, b)| {
            if !on_screen(screen[a]) && !on_screen(screen[b]) {
                return None;
            }
            let (a2, b2) = (screen[a]?, screen[b]?);
            intersect_segments_2d(a2, b2, start, end).map(|hit| KnifeHit {
                spline: spline.index,
                segment: (a, b),
                screen: hit,
            })
        })
        .collect()
}

fn knifeable_segments(spline: &SplineData) -> impl Iterator<Item = (usize, usize)> + '_ {
    let len = spline.points.len();
    (0..len).filter_map(move |i| {
        if i + 1 < len {
            Some((i, i + 1))
        } else if spline.settings.cyclic && len > 1 {
            Some((i, 0))
        } else {
            None
        }
    })
}

/// Plane through the view rays at both ends of the cut line.
fn cut_plane(view: &dyn ViewProjection, start: Point2, end: Point2) -> Option<Plane> {
    let start_ray = view.unproject_ray(start)?;
    let end_ray = view.unproject_ray(end)?;

    let normal = if view.is_orthographic() {
        (end_ray.origin - start_ray.origin)
            .normalized()?
            .cross(start_ray.direction.normalized()?)
    } else {
        start_ray
            .direction
            .normalized()?
            .cross(end_ray.direction.normalized()?)
    };
    Plane::new(start_ray.origin, normal)
}

/// Cuts every spline crossed by the screen-space line `start-end`.
///
/// Each hit inserts a new point on its segment, with radius and tilt
/// averaged from the segment ends. Without `split` the inserted points are
/// the new selection. With `split` every cut point is inserted twice and the
/// spline is broken into open pieces between them, with nothing selected.
///
/// No hits, or `start == end`, give an empty plan.
#[must_use]
pub fn knife(
    snapshot: &CurveSnapshot,
    start: Point2,
    end: Point2,
    view: &dyn ViewProjection,
    options: KnifeOptions,
) -> (RebuildPlan, KnifeDiagnostics) {
    let mut diagnostics = KnifeDiagnostics::default();
    let mut plan = RebuildPlan::new();

    if start == end {
        diagnostics.warnings.push("cut line has zero length".to_string());
        return (plan, diagnostics);
    }

    diagnostics.segments_tested = snapshot
        .splines
        .iter()
        .filter(|s| s.settings.kind.is_editable())
        .map(|s| knifeable_segments(s).count())
        .sum();

    let hits = find_knife_hits(snapshot, start, end, view);
    diagnostics.hits = hits.len();
    if hits.is_empty() {
        return (plan, diagnostics);
    }

    let Some(plane) = cut_plane(view, start, end) else {
        diagnostics
            .warnings
            .push("could not derive a cut plane from the view".to_string());
        return (plan, diagnostics);
    };

    for spline in &snapshot.splines {
        let cuts: Vec<Cut> = hits
            .iter()
            .filter(|hit| hit.spline == spline.index)
            .filter_map(|hit| {
                let (a, b) = hit.segment;
                let co = plane.intersect_line(spline.points[a].co(), spline.points[b].co());
                if co.is_none() {
                    log::warn!("knife: skipping segment {a}-{b} of spline {}", spline.index);
                    diagnostics.warnings.push(format!(
                        "segment {a}-{b} of spline {} is parallel to the cut plane",
                        spline.index
                    ));
                }
                co.map(|co| Cut { segment: hit.segment, co })
            })
            .collect();

        if cuts.is_empty() {
            continue;
        }
        diagnostics.cuts += cuts.len();
        diagnostics.splines_cut += 1;

        let points = insert_cut_points(spline, &cuts, options.split);
        plan.remove.push(spline.id);
        if options.split {
            let pieces = split_at_cuts(spline, points);
            diagnostics.splines_created += pieces.len();
            plan.insert.extend(pieces);
        } else {
            let points = points.into_iter().map(|p| PointData::new(0, p.point)).collect();
            plan.insert.push(rebuild_spline(spline, Some(points)));
            diagnostics.splines_created += 1;
        }
    }

    log::debug!(
        "knife: {} hits, {} cuts over {} splines (split: {})",
        diagnostics.hits,
        diagnostics.cuts,
        diagnostics.splines_cut,
        options.split
    );

    (plan, diagnostics)
}

fn insert_cut_points(spline: &SplineData, cuts: &[Cut], split: bool) -> Vec<KnifePoint> {
    let mut points = Vec::with_capacity(spline.points.len() + cuts.len() * 2);

    for data in &spline.points {
        points.push(KnifePoint {
            point: data.point.selected(false),
            is_split: false,
        });

        for cut in cuts.iter().filter(|c| c.segment.0 == data.index) {
            let next = &spline.points[cut.segment.1];

            // The closing segment of a cyclic spline can take the cut at
            // either end of the point list.
            let is_after = if spline.settings.cyclic && next.index == 0 {
                data.co().distance_to(cut.co) < next.co().distance_to(cut.co)
            } else {
                true
            };

            let cut_point = KnifePoint {
                point: Point::new(cut.co)
                    .with_radius((data.point.radius + next.point.radius) / 2.0)
                    .with_tilt((data.point.tilt + next.point.tilt) / 2.0)
                    .selected(true),
                is_split: split,
            };
            let copies = if split { 2 } else { 1 };
            for _ in 0..copies {
                if is_after {
                    points.push(cut_point);
                } else {
                    points.insert(0, cut_point);
                }
            }
        }
    }

    points
}

fn split_at_cuts(spline: &SplineData, mut points: Vec<KnifePoint>) -> Vec<NewSpline> {
    let split_indices: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_split)
        .map(|(i, _)| i)
        .collect();

    if spline.settings.cyclic {
        if let Some(&pivot) = split_indices.get(1) {
            points.rotate_left(pivot);
        }
    }

    let mut pieces: Vec<Vec<PointData>> = vec![Vec::new()];
    let last = points.len().saturating_sub(1);
    for (idx, knife_point) in points.into_iter().enumerate() {
        let Some(current) = pieces.last_mut() else {
            break;
        };
        let starts_piece = current.is_empty();
        current.push(PointData::new(0, knife_point.point.selected(false)));

        if !starts_piece && knife_point.is_split && idx != last {
            pieces.push(Vec::new());
        }
    }

    pieces
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            let mut new_spline = rebuild_spline(spline, Some(piece));
            new_spline.settings.cyclic = false;
            new_spline
        })
        .collect()
}
