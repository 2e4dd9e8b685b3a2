//! Merge: collapse selected spline points, either into the last selected
//! point or into their average.
//!
//! # Operations
//! - **To last**: every other selected point is merged into the most recently
//!   selected one. Works within one spline (the in-between points must all be
//!   selected) or across two open splines (joining them end to end).
//! - **To center**: each continuous selection run becomes one averaged point.
//!   Runs at the ends of two different splines join those splines.

use std::collections::{BTreeMap, BTreeSet};

use crate::curve::{CurveSnapshot, PointData, RebuildPlan, SelectionKey, SplineData, rebuild_spline};
use crate::geom::{Point3, average};

const NOTHING_MERGED: &str = "Nothing could be merged! Make a selection that, once merged, \
     doesn't create a self-intersecting spline or a cyclic loop";

const PARTIALLY_MERGED: &str = "Some, but not all of the selected points could be merged";

/// Errors that can occur during merge operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("merging needs at least 2 selected points, got {count}")]
    InsufficientSelection { count: usize },

    #[error("no merge target: select the point to merge into last")]
    MissingTarget,

    #[error("merge target {0:?} is not a selected point of the curve")]
    StaleTarget(SelectionKey),

    #[error("illegal selection: you can't merge spline points across more than 2 splines (got {count})")]
    TooManySplines { count: usize },

    #[error(
        "illegal selection: to center merge points across two splines, you need to have a \
         continuous selection at either end of the two splines"
    )]
    NotAtSplineEnds,
}

/// How the merge was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeKind {
    /// Nothing was merged.
    #[default]
    None,
    SameSpline,
    TwoSplines,
}

/// Diagnostics for merge operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeDiagnostics {
    pub kind: MergeKind,
    /// Number of selected points consumed by the merge.
    pub merged: usize,
    /// Selected points that had to be left alone.
    pub could_not_merge: Vec<SelectionKey>,
    /// Averaged location (to center merges only).
    pub merge_location: Option<Point3>,
    /// User-facing notes.
    pub warnings: Vec<String>,
}

// ============================================================================
// Merge to last
// ============================================================================

/// Merges the selection into the last entry of `history`.
///
/// Candidates on the target's spline are merged when every point between
/// them and the target is selected too; those simply disappear. Otherwise,
/// candidates on another spline are merged when both splines are open, the
/// target is an end point, and the candidate is an end point or everything
/// from it to one end of its spline is selected. Only the lowest such
/// spline is joined; its merged run is dropped and the rest is attached to
/// the target's end.
///
/// Zero mergeable candidates give an empty plan with a warning.
///
/// # Errors
/// Returns [`MergeError`] when there is no valid target or fewer than two
/// selected points.
pub fn merge_to_last(
    snapshot: &CurveSnapshot,
    history: &[SelectionKey],
) -> Result<(RebuildPlan, MergeDiagnostics), MergeError> {
    let mut selection = snapshot.selection();
    if selection.len() < 2 {
        return Err(MergeError::InsufficientSelection {
            count: selection.len(),
        });
    }
    let target = history.last().copied().ok_or(MergeError::MissingTarget)?;
    if !selection.remove(&target) {
        return Err(MergeError::StaleTarget(target));
    }
    let target_spline = snapshot
        .spline(target.spline)
        .ok_or(MergeError::StaleTarget(target))?;

    let mut diagnostics = MergeDiagnostics::default();
    let mut same_spline = BTreeSet::new();
    let mut other_spline = BTreeSet::new();

    for &key in &selection {
        let mergeable = if key.spline == target.spline {
            let (lo, hi) = if key.point < target.point {
                (key.point, target.point)
            } else {
                (target.point, key.point)
            };
            let all_between = ((lo + 1)..hi).all(|p| selection.contains(&SelectionKey::new(key.spline, p)));
            if all_between {
                same_spline.insert(key);
            }
            all_between
        } else if let Some(candidate) = snapshot.spline(key.spline) {
            let joinable = is_joinable(target_spline, target, candidate, key, &selection);
            if joinable {
                other_spline.insert(key);
            }
            joinable
        } else {
            false
        };

        if !mergeable {
            diagnostics.could_not_merge.push(key);
        }
    }

    let new_points = if !same_spline.is_empty() {
        diagnostics.kind = MergeKind::SameSpline;
        diagnostics.merged = same_spline.len();
        diagnostics.could_not_merge.extend(other_spline.iter().copied());
        target_spline
            .points
            .iter()
            .filter(|p| !same_spline.contains(&SelectionKey::new(target.spline, p.index)))
            .copied()
            .collect::<Vec<_>>()
    } else if let Some(first) = other_spline.first() {
        let other = &snapshot.splines[first.spline];
        let merge_points: BTreeSet<usize> = other_spline
            .iter()
            .filter(|k| k.spline == other.index)
            .map(|k| k.point)
            .collect();
        let (new_points, trimmed) = join_at_target(target_spline, target.point, other, &merge_points);
        diagnostics.kind = MergeKind::TwoSplines;
        diagnostics.merged = trimmed.len();
        diagnostics.could_not_merge.extend(
            other_spline
                .iter()
                .filter(|k| k.spline != other.index || !trimmed.contains(&k.point))
                .copied(),
        );
        new_points
    } else {
        log::debug!("merge to last: nothing mergeable out of {} points", selection.len());
        diagnostics.warnings.push(NOTHING_MERGED.to_string());
        return Ok((RebuildPlan::new(), diagnostics));
    };

    diagnostics.could_not_merge.sort_unstable();
    if !diagnostics.could_not_merge.is_empty() {
        log::warn!(
            "merge to last: {} selected points could not be merged",
            diagnostics.could_not_merge.len()
        );
        diagnostics.warnings.push(PARTIALLY_MERGED.to_string());
    }

    let mut plan = RebuildPlan::new();
    plan.remove.push(target_spline.id);
    if diagnostics.kind == MergeKind::TwoSplines {
        if let Some(first) = other_spline.first() {
            plan.remove.push(snapshot.splines[first.spline].id);
        }
    }
    plan.insert.push(rebuild_spline(target_spline, Some(new_points)));

    Ok((plan, diagnostics))
}

fn is_joinable(
    target_spline: &SplineData,
    target: SelectionKey,
    candidate: &SplineData,
    key: SelectionKey,
    selection: &BTreeSet<SelectionKey>,
) -> bool {
    if target_spline.settings.cyclic || candidate.settings.cyclic {
        return false;
    }
    if !target_spline.is_endpoint(target.point) {
        return false;
    }
    if candidate.is_endpoint(key.point) {
        return true;
    }
    let selected = |p: usize| selection.contains(&SelectionKey::new(key.spline, p));
    ((key.point + 1)..candidate.points.len()).all(selected) || (0..key.point).all(selected)
}

/// Attaches the unmerged part of `other` to the target's end of `target_spline`.
///
/// Returns the joined points and the indices of `other` actually merged away.
fn join_at_target(
    target_spline: &SplineData,
    target_point: usize,
    other: &SplineData,
    merge_points: &BTreeSet<usize>,
) -> (Vec<PointData>, BTreeSet<usize>) {
    // The merged run has to touch one end of the other spline; trim it from there.
    let from_start = merge_points.first() == Some(&0);
    let trimmed: BTreeSet<usize> = if from_start {
        other
            .points
            .iter()
            .take_while(|p| merge_points.contains(&p.index))
            .map(|p| p.index)
            .collect()
    } else {
        other
            .points
            .iter()
            .rev()
            .take_while(|p| merge_points.contains(&p.index))
            .map(|p| p.index)
            .collect()
    };

    let kept = |forward: bool| -> Vec<PointData> {
        let iter: Box<dyn Iterator<Item = &PointData>> = if forward {
            Box::new(other.points.iter())
        } else {
            Box::new(other.points.iter().rev())
        };
        iter.filter(|p| !trimmed.contains(&p.index)).copied().collect()
    };

    let mut new_points = Vec::with_capacity(target_spline.points.len() + other.points.len());
    if target_point == 0 {
        new_points.extend(kept(!from_start));
        new_points.extend(target_spline.points.iter().copied());
    } else {
        new_points.extend(target_spline.points.iter().copied());
        new_points.extend(kept(from_start));
    }
    (new_points, trimmed)
}

// ============================================================================
// Merge to center
// ============================================================================

/// Merges each continuous selection run into one point at the average of
/// all merged locations.
///
/// Runs with gaps are ignored. A single run collapses in place; two runs
/// must each touch an end of their spline and are fused into one spline
/// joined at the merged point.
///
/// # Errors
/// [`MergeError::InsufficientSelection`] for fewer than two selected points,
/// [`MergeError::TooManySplines`] for runs on more than two splines and
/// [`MergeError::NotAtSplineEnds`] when a two-spline merge would not join
/// the splines at their ends.
pub fn merge_to_center(
    snapshot: &CurveSnapshot,
) -> Result<(RebuildPlan, MergeDiagnostics), MergeError> {
    let selection = snapshot.selection();
    if selection.len() < 2 {
        return Err(MergeError::InsufficientSelection {
            count: selection.len(),
        });
    }

    let mut diagnostics = MergeDiagnostics::default();
    let groups = continuous_groups(&selection, &mut diagnostics);

    let mut plan = RebuildPlan::new();
    match groups.len() {
        0 => {
            diagnostics.warnings.push(NOTHING_MERGED.to_string());
        }
        1 => {
            let Some((&sidx, sel)) = groups.iter().next() else {
                return Ok((plan, diagnostics));
            };
            let spline = &snapshot.splines[sidx];
            let Some(merge_co) = average(&coords(spline, sel)) else {
                return Ok((plan, diagnostics));
            };
            diagnostics.kind = MergeKind::SameSpline;
            diagnostics.merged = sel.len();
            diagnostics.merge_location = Some(merge_co);

            let new_points = collapse_run(spline.points.iter(), sel, merge_co);
            plan.remove.push(spline.id);
            plan.insert.push(rebuild_spline(spline, Some(new_points)));
        }
        2 => {
            let mut iter = groups.iter();
            let (Some((&sidx1, sel1)), Some((&sidx2, sel2))) = (iter.next(), iter.next()) else {
                return Ok((plan, diagnostics));
            };
            let spline1 = &snapshot.splines[sidx1];
            let spline2 = &snapshot.splines[sidx2];

            if !touches_end(spline1, sel1) || !touches_end(spline2, sel2) {
                return Err(MergeError::NotAtSplineEnds);
            }

            let mut all = coords(spline1, sel1);
            all.extend(coords(spline2, sel2));
            let Some(merge_co) = average(&all) else {
                return Ok((plan, diagnostics));
            };
            diagnostics.kind = MergeKind::TwoSplines;
            diagnostics.merged = sel1.len() + sel2.len();
            diagnostics.merge_location = Some(merge_co);

            let new_points = fuse_runs(spline1, sel1, spline2, sel2, merge_co);
            plan.remove.push(spline1.id);
            plan.remove.push(spline2.id);
            plan.insert.push(rebuild_spline(spline1, Some(new_points)));
        }
        count => return Err(MergeError::TooManySplines { count }),
    }

    log::debug!(
        "merge to center: {:?}, {} points merged",
        diagnostics.kind,
        diagnostics.merged
    );
    Ok((plan, diagnostics))
}

/// Groups the selection by spline, dropping splines whose selection has gaps.
fn continuous_groups(
    selection: &BTreeSet<SelectionKey>,
    diagnostics: &mut MergeDiagnostics,
) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for key in selection {
        groups.entry(key.spline).or_default().push(key.point);
    }
    groups.retain(|&sidx, sel| {
        let continuous = sel.windows(2).all(|w| w[1] == w[0] + 1);
        if !continuous {
            diagnostics
                .could_not_merge
                .extend(sel.iter().map(|&p| SelectionKey::new(sidx, p)));
        }
        continuous
    });
    groups
}

fn coords(spline: &SplineData, sel: &[usize]) -> Vec<Point3> {
    sel.iter().map(|&p| spline.points[p].co()).collect()
}

fn touches_end(spline: &SplineData, sel: &[usize]) -> bool {
    sel.first() == Some(&0) || sel.last() == Some(&spline.last_index())
}

/// Replaces the points of `sel` by one copy of the first of them, moved to `merge_co`.
fn collapse_run<'a>(
    points: impl Iterator<Item = &'a PointData>,
    sel: &[usize],
    merge_co: Point3,
) -> Vec<PointData> {
    let mut merged = false;
    let mut new_points = Vec::new();
    for p in points {
        if sel.contains(&p.index) {
            if !merged {
                let mut merged_point = *p;
                merged_point.point.co = merge_co;
                merged_point.point.weight = 1.0;
                new_points.push(merged_point);
                merged = true;
            }
        } else {
            new_points.push(*p);
        }
    }
    new_points
}

fn fuse_runs(
    spline1: &SplineData,
    sel1: &[usize],
    spline2: &SplineData,
    sel2: &[usize],
    merge_co: Point3,
) -> Vec<PointData> {
    let unselected = |spline: &SplineData, sel: &[usize], forward: bool| -> Vec<PointData> {
        let iter: Box<dyn Iterator<Item = &PointData>> = if forward {
            Box::new(spline.points.iter())
        } else {
            Box::new(spline.points.iter().rev())
        };
        iter.filter(|p| !sel.contains(&p.index)).copied().collect()
    };
    let starts_at_zero = |sel: &[usize]| sel.first() == Some(&0);

    if starts_at_zero(sel1) {
        // Second spline first, oriented to end at the merged point.
        let mut new_points = if starts_at_zero(sel2) {
            collapse_run(spline2.points.iter().rev(), sel2, merge_co)
        } else {
            collapse_run(spline2.points.iter(), sel2, merge_co)
        };
        new_points.extend(unselected(spline1, sel1, true));
        new_points
    } else {
        let mut new_points = collapse_run(spline1.points.iter(), sel1, merge_co);
        new_points.extend(unselected(spline2, sel2, starts_at_zero(sel2)));
        new_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Curve, Spline};

    fn line(xs: &[f64], y: f64) -> Spline {
        Spline::poly(&xs.iter().map(|&x| [x, y, 0.0]).collect::<Vec<_>>())
    }

    fn xs(curve: &Curve, index: usize) -> Vec<f64> {
        curve.spline_at(index).unwrap().points.iter().map(|p| p.co.x).collect()
    }

    #[test]
    fn test_to_last_same_spline_removes_between_points() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0, 3.0, 4.0], 0.0).with_selected(&[1, 2, 3]));
        let history = [SelectionKey::new(0, 1), SelectionKey::new(0, 2), SelectionKey::new(0, 3)];

        let (plan, diag) = merge_to_last(&curve.snapshot(), &history).unwrap();
        assert_eq!(diag.kind, MergeKind::SameSpline);
        assert_eq!(diag.merged, 2);
        curve.apply(plan);
        assert_eq!(xs(&curve, 0), vec![0.0, 3.0, 4.0]);
    }

    #[test]
    fn test_to_last_gap_is_reported() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0, 3.0], 0.0).with_selected(&[0, 1, 3]));
        let history = [SelectionKey::new(0, 1)];

        let (plan, diag) = merge_to_last(&curve.snapshot(), &history).unwrap();
        assert_eq!(diag.could_not_merge, vec![SelectionKey::new(0, 3)]);
        assert_eq!(diag.warnings, vec![PARTIALLY_MERGED.to_string()]);
        curve.apply(plan);
        assert_eq!(xs(&curve, 0), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_to_last_joins_other_spline_end_to_end() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0], 0.0).with_selected(&[2]));
        curve.add_spline(line(&[5.0, 4.0, 3.0], 0.0).with_selected(&[2]));
        // Merge the second spline's end into the first spline's end.
        let history = [SelectionKey::new(1, 2), SelectionKey::new(0, 2)];

        let (plan, diag) = merge_to_last(&curve.snapshot(), &history).unwrap();
        assert_eq!(diag.kind, MergeKind::TwoSplines);
        curve.apply(plan);
        assert_eq!(curve.len(), 1);
        assert_eq!(xs(&curve, 0), vec![0.0, 1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_to_last_leaves_far_end_of_other_spline() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0], 0.0).with_selected(&[1]));
        curve.add_spline(line(&[6.0, 7.0, 8.0], 1.0).with_selected(&[0, 2]));
        let history = [SelectionKey::new(1, 0), SelectionKey::new(1, 2), SelectionKey::new(0, 1)];

        let (plan, diag) = merge_to_last(&curve.snapshot(), &history).unwrap();
        assert_eq!(diag.kind, MergeKind::TwoSplines);
        assert_eq!(diag.merged, 1);
        assert_eq!(diag.could_not_merge, vec![SelectionKey::new(1, 2)]);
        assert_eq!(diag.warnings, vec![PARTIALLY_MERGED.to_string()]);
        curve.apply(plan);
        assert_eq!(curve.len(), 1);
        assert_eq!(xs(&curve, 0), vec![0.0, 1.0, 7.0, 8.0]);
    }

    #[test]
    fn test_to_last_target_at_start() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0], 0.0).with_selected(&[0]));
        curve.add_spline(line(&[-1.0, -2.0, -3.0], 0.0).with_selected(&[0]));
        let history = [SelectionKey::new(1, 0), SelectionKey::new(0, 0)];

        let (plan, _) = merge_to_last(&curve.snapshot(), &history).unwrap();
        curve.apply(plan);
        assert_eq!(xs(&curve, 0), vec![-3.0, -2.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_to_last_cyclic_cannot_join() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0], 0.0).cyclic(true).with_selected(&[2]));
        curve.add_spline(line(&[5.0, 4.0], 0.0).with_selected(&[1]));
        let history = [SelectionKey::new(0, 2)];

        let (plan, diag) = merge_to_last(&curve.snapshot(), &history).unwrap();
        assert!(plan.is_empty());
        assert_eq!(diag.kind, MergeKind::None);
        assert_eq!(diag.warnings, vec![NOTHING_MERGED.to_string()]);
    }

    #[test]
    fn test_to_last_requires_target() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0], 0.0).with_selected(&[0, 1]));
        assert_eq!(merge_to_last(&curve.snapshot(), &[]), Err(MergeError::MissingTarget));
        assert_eq!(
            merge_to_last(&curve.snapshot(), &[SelectionKey::new(0, 2)]),
            Err(MergeError::StaleTarget(SelectionKey::new(0, 2)))
        );
    }

    #[test]
    fn test_to_center_single_run() {
        let mut curve = Curve::new();
        let spline = line(&[0.0, 1.0, 2.0, 3.0], 0.0).with_selected(&[1, 2]);
        curve.add_spline(spline);

        let (plan, diag) = merge_to_center(&curve.snapshot()).unwrap();
        assert_eq!(diag.merge_location, Some(Point3::new(1.5, 0.0, 0.0)));
        curve.apply(plan);
        assert_eq!(xs(&curve, 0), vec![0.0, 1.5, 3.0]);
    }

    #[test]
    fn test_to_center_joins_two_splines() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0], 0.0).with_selected(&[2]));
        curve.add_spline(line(&[4.0, 5.0, 6.0], 0.0).with_selected(&[0]));

        let (plan, diag) = merge_to_center(&curve.snapshot()).unwrap();
        assert_eq!(diag.kind, MergeKind::TwoSplines);
        curve.apply(plan);
        assert_eq!(curve.len(), 1);
        assert_eq!(xs(&curve, 0), vec![0.0, 1.0, 3.0, 5.0, 6.0]);
    }

    #[test]
    fn test_to_center_rejects_interior_runs() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0], 0.0).with_selected(&[1]));
        curve.add_spline(line(&[4.0, 5.0, 6.0], 0.0).with_selected(&[0]));
        assert_eq!(merge_to_center(&curve.snapshot()), Err(MergeError::NotAtSplineEnds));
    }

    #[test]
    fn test_to_center_rejects_three_splines() {
        let mut curve = Curve::new();
        for y in [0.0, 1.0, 2.0] {
            curve.add_spline(line(&[0.0, 1.0], y).with_selected(&[0]));
        }
        assert_eq!(
            merge_to_center(&curve.snapshot()),
            Err(MergeError::TooManySplines { count: 3 })
        );
    }

    #[test]
    fn test_to_center_gaps_are_noop() {
        let mut curve = Curve::new();
        curve.add_spline(line(&[0.0, 1.0, 2.0], 0.0).with_selected(&[0, 2]));
        let (plan, diag) = merge_to_center(&curve.snapshot()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(diag.could_not_merge.len(), 2);
    }
}
