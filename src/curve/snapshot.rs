use std::collections::BTreeSet;

use super::{Curve, Point, SplineId, SplineSettings};
use crate::geom::{Point3, average};

/// Address of a selected point: `(spline index, point index)` in snapshot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectionKey {
    pub spline: usize,
    pub point: usize,
}

impl SelectionKey {
    #[must_use]
    pub const fn new(spline: usize, point: usize) -> Self {
        Self { spline, point }
    }
}

impl From<(usize, usize)> for SelectionKey {
    fn from((spline, point): (usize, usize)) -> Self {
        Self::new(spline, point)
    }
}

/// A point together with its position in the spline at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointData {
    pub index: usize,
    pub point: Point,
}

impl PointData {
    #[must_use]
    pub const fn new(index: usize, point: Point) -> Self {
        Self { index, point }
    }

    #[must_use]
    pub const fn co(&self) -> Point3 {
        self.point.co
    }

    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.point.selected
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplineData {
    pub id: SplineId,
    pub index: usize,
    pub settings: SplineSettings,
    pub is_active: bool,
    pub points: Vec<PointData>,
}

impl SplineData {
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    #[must_use]
    pub fn is_endpoint(&self, index: usize) -> bool {
        index == 0 || index == self.last_index()
    }

    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.points.iter().filter(|p| p.is_selected()).map(|p| p.index)
    }
}

/// Immutable copy of a curve taken before an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSnapshot {
    pub splines: Vec<SplineData>,
    /// Index of the active spline.
    pub active: Option<usize>,
    /// Selected points of the active spline, in point order.
    pub active_selection: Vec<PointData>,
    pub active_selection_mid_point: Option<Point3>,
}

impl CurveSnapshot {
    pub(super) fn from_curve(curve: &Curve) -> Self {
        let active_id = curve.active();
        let splines: Vec<SplineData> = curve
            .ids()
            .zip(curve.splines())
            .enumerate()
            .map(|(index, (id, spline))| SplineData {
                id,
                index,
                settings: spline.settings,
                is_active: active_id == Some(id),
                points: spline
                    .points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| PointData::new(i, *p))
                    .collect(),
            })
            .collect();

        let active = splines.iter().position(|s| s.is_active);
        let active_selection: Vec<PointData> = active
            .map(|i| {
                splines[i]
                    .points
                    .iter()
                    .filter(|p| p.is_selected())
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        let coords: Vec<Point3> = active_selection.iter().map(PointData::co).collect();
        let active_selection_mid_point = average(&coords);

        Self {
            splines,
            active,
            active_selection,
            active_selection_mid_point,
        }
    }

    #[must_use]
    pub fn spline(&self, index: usize) -> Option<&SplineData> {
        self.splines.get(index)
    }

    #[must_use]
    pub fn active_spline(&self) -> Option<&SplineData> {
        self.active.and_then(|i| self.splines.get(i))
    }

    #[must_use]
    pub fn point(&self, key: SelectionKey) -> Option<&PointData> {
        self.splines.get(key.spline)?.points.get(key.point)
    }

    /// Every selected point across all splines.
    #[must_use]
    pub fn selection(&self) -> BTreeSet<SelectionKey> {
        self.splines
            .iter()
            .flat_map(|s| s.selected_indices().map(move |p| SelectionKey::new(s.index, p)))
            .collect()
    }

    /// Whether the selected points of the active spline have consecutive indices.
    /// An empty selection counts as continuous.
    #[must_use]
    pub fn is_selection_continuous(&self) -> bool {
        self.active_selection
            .windows(2)
            .all(|w| w[1].index == w[0].index + 1)
    }

    /// Whether the first or last point of the active spline is selected.
    #[must_use]
    pub fn is_active_end_selected(&self) -> bool {
        self.active_spline().is_some_and(|s| {
            let first = s.points.first().is_some_and(PointData::is_selected);
            let last = s.points.last().is_some_and(PointData::is_selected);
            first || last
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Spline;

    fn curve_with_selection(indices: &[usize]) -> Curve {
        let mut curve = Curve::new();
        let id = curve
            .add_spline(
                Spline::poly(&[
                    [0.0, 0.0, 0.0],
                    [1.0, 0.0, 0.0],
                    [2.0, 0.0, 0.0],
                    [3.0, 0.0, 0.0],
                ])
                .with_selected(indices),
            )
            .unwrap();
        curve.set_active(Some(id));
        curve
    }

    #[test]
    fn test_selection_and_mid_point() {
        let snap = curve_with_selection(&[1, 3]).snapshot();
        let sel: Vec<_> = snap.selection().into_iter().collect();
        assert_eq!(sel, vec![SelectionKey::new(0, 1), SelectionKey::new(0, 3)]);
        assert_eq!(snap.active_selection_mid_point, Some(Point3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_selection_continuity() {
        assert!(curve_with_selection(&[1, 2, 3]).snapshot().is_selection_continuous());
        assert!(!curve_with_selection(&[0, 2]).snapshot().is_selection_continuous());
        assert!(curve_with_selection(&[]).snapshot().is_selection_continuous());
    }

    #[test]
    fn test_active_end_selected() {
        assert!(curve_with_selection(&[3]).snapshot().is_active_end_selected());
        assert!(!curve_with_selection(&[1, 2]).snapshot().is_active_end_selected());
    }
}
