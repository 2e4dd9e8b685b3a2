use super::{Point, Spline, SplineId, SplineSettings};
use super::snapshot::{PointData, SplineData};

/// A spline computed by an edit, waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSpline {
    pub settings: SplineSettings,
    /// Points with indices renumbered `0..len`.
    pub points: Vec<PointData>,
    /// Inherited from an active template.
    pub active: bool,
}

impl NewSpline {
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub(super) fn into_spline(self) -> Spline {
        Spline::new(
            self.settings,
            self.points.into_iter().map(|p| p.point).collect(),
        )
    }
}

/// Which spline ends up active after a plan is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplineRef {
    Existing(SplineId),
    /// Position inside [`RebuildPlan::insert`].
    Inserted(usize),
}

/// Deferred write-back of one edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildPlan {
    pub remove: Vec<SplineId>,
    pub insert: Vec<NewSpline>,
    pub new_active: Option<SplineRef>,
}

impl RebuildPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A plan that replaces `old` with `new_splines`.
    #[must_use]
    pub fn replace(old: SplineId, new_splines: Vec<NewSpline>) -> Self {
        Self {
            remove: vec![old],
            insert: new_splines,
            new_active: None,
        }
    }

    /// An empty plan leaves the curve untouched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.insert.is_empty() && self.new_active.is_none()
    }
}

/// Builds a new spline from `template`'s scalar attributes.
///
/// `points` defaults to the template's own points. Whatever the input
/// indices are, the result is numbered `0..len`.
#[must_use]
pub fn rebuild_spline(template: &SplineData, points: Option<Vec<PointData>>) -> NewSpline {
    let points = points.unwrap_or_else(|| template.points.clone());
    NewSpline {
        settings: template.settings,
        points: renumber(points.into_iter().map(|p| p.point)),
        active: template.is_active,
    }
}

pub(crate) fn renumber(points: impl IntoIterator<Item = Point>) -> Vec<PointData> {
    points
        .into_iter()
        .enumerate()
        .map(|(i, p)| PointData::new(i, p))
        .collect()
}
