//! Curve model: points, splines and the curve arena.
//!
//! A [`Curve`] owns its splines behind stable [`SplineId`] handles. Point
//! indices are positions inside a spline and change on every rebuild, so the
//! edit operations never hold on to them across a write.
//!
//! The edit cycle is always the same:
//! 1. [`Curve::snapshot`] produces an immutable [`CurveSnapshot`],
//! 2. an operation computes a [`RebuildPlan`] from the snapshot,
//! 3. [`Curve::apply`] swaps the old splines for the rebuilt ones in one step.

mod history;
mod rebuild;
mod snapshot;

pub use history::SelectionHistory;
pub use rebuild::{NewSpline, RebuildPlan, SplineRef, rebuild_spline};
pub use snapshot::{CurveSnapshot, PointData, SelectionKey, SplineData};

use serde::{Deserialize, Serialize};

use crate::geom::Point3;

// ============================================================================
// Point / Spline
// ============================================================================

/// A control point. `co` plus `weight` form the homogeneous coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub co: Point3,
    pub weight: f64,
    pub radius: f64,
    pub tilt: f64,
    pub hidden: bool,
    pub selected: bool,
}

impl Point {
    #[must_use]
    pub const fn new(co: Point3) -> Self {
        Self {
            co,
            weight: 1.0,
            radius: 1.0,
            tilt: 0.0,
            hidden: false,
            selected: false,
        }
    }

    #[must_use]
    pub const fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    #[must_use]
    pub const fn with_tilt(mut self, tilt: f64) -> Self {
        self.tilt = tilt;
        self
    }

    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// Spline interpolation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplineType {
    Poly,
    Nurbs,
    /// Only accepted as input to type conversion. Points are stored as
    /// `[handle_left, control, handle_right]` triples.
    Bezier,
}

impl SplineType {
    /// Whether the point-editing operations accept this type.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Poly | Self::Nurbs)
    }
}

/// Scalar spline attributes carried over verbatim by every rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineSettings {
    pub kind: SplineType,
    pub cyclic: bool,
    pub smooth: bool,
    /// NURBS order.
    pub order: u32,
    /// NURBS resolution.
    pub resolution: u32,
    /// NURBS endpoint clamping.
    pub use_endpoint: bool,
}

impl SplineSettings {
    #[must_use]
    pub const fn new(kind: SplineType) -> Self {
        Self {
            kind,
            cyclic: false,
            smooth: false,
            order: 4,
            resolution: 12,
            use_endpoint: false,
        }
    }

    #[must_use]
    pub const fn cyclic(mut self, cyclic: bool) -> Self {
        self.cyclic = cyclic;
        self
    }

    #[must_use]
    pub const fn smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    #[must_use]
    pub const fn use_endpoint(mut self, use_endpoint: bool) -> Self {
        self.use_endpoint = use_endpoint;
        self
    }
}

impl Default for SplineSettings {
    fn default() -> Self {
        Self::new(SplineType::Poly)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    pub settings: SplineSettings,
    pub points: Vec<Point>,
}

impl Spline {
    #[must_use]
    pub const fn new(settings: SplineSettings, points: Vec<Point>) -> Self {
        Self { settings, points }
    }

    /// Open POLY spline through `coords`.
    #[must_use]
    pub fn poly(coords: &[[f64; 3]]) -> Self {
        Self::new(
            SplineSettings::default(),
            coords.iter().map(|&c| Point::new(c.into())).collect(),
        )
    }

    #[must_use]
    pub const fn cyclic(mut self, cyclic: bool) -> Self {
        self.settings.cyclic = cyclic;
        self
    }

    /// Mark the points at `indices` as selected. Out of range indices are ignored.
    #[must_use]
    pub fn with_selected(mut self, indices: &[usize]) -> Self {
        for &i in indices {
            if let Some(p) = self.points.get_mut(i) {
                p.selected = true;
            }
        }
        self
    }
}

// ============================================================================
// Curve
// ============================================================================

/// Stable handle of a spline inside one [`Curve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SplineId(u64);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    splines: Vec<(SplineId, Spline)>,
    active: Option<SplineId>,
    next_id: u64,
}

impl Curve {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A curve holding one selected single-point POLY spline at `location`,
    /// which is also the active spline.
    #[must_use]
    pub fn with_single_point(location: Point3) -> Self {
        let mut curve = Self::new();
        let spline = Spline::new(
            SplineSettings::default(),
            vec![Point::new(location).selected(true)],
        );
        if let Some(id) = curve.add_spline(spline) {
            curve.active = Some(id);
        }
        curve
    }

    /// Appends `spline`. Splines without points are rejected.
    pub fn add_spline(&mut self, spline: Spline) -> Option<SplineId> {
        if spline.points.is_empty() {
            return None;
        }
        let id = SplineId(self.next_id);
        self.next_id += 1;
        self.splines.push((id, spline));
        Some(id)
    }

    pub fn remove_spline(&mut self, id: SplineId) -> Option<Spline> {
        let pos = self.splines.iter().position(|(sid, _)| *sid == id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Some(self.splines.remove(pos).1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.splines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splines.is_empty()
    }

    pub fn splines(&self) -> impl Iterator<Item = &Spline> {
        self.splines.iter().map(|(_, s)| s)
    }

    pub fn ids(&self) -> impl Iterator<Item = SplineId> + '_ {
        self.splines.iter().map(|(id, _)| *id)
    }

    #[must_use]
    pub fn spline(&self, id: SplineId) -> Option<&Spline> {
        self.splines.iter().find(|(sid, _)| *sid == id).map(|(_, s)| s)
    }

    #[must_use]
    pub fn spline_at(&self, index: usize) -> Option<&Spline> {
        self.splines.get(index).map(|(_, s)| s)
    }

    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<SplineId> {
        self.splines.get(index).map(|(id, _)| *id)
    }

    #[must_use]
    pub const fn active(&self) -> Option<SplineId> {
        self.active
    }

    #[must_use]
    pub fn active_spline(&self) -> Option<&Spline> {
        self.active.and_then(|id| self.spline(id))
    }

    /// Makes `id` the active spline. Returns `false` for foreign handles.
    pub fn set_active(&mut self, id: Option<SplineId>) -> bool {
        match id {
            Some(id) if self.spline(id).is_none() => false,
            _ => {
                self.active = id;
                true
            }
        }
    }

    /// Sets the selection flag of one point. Returns `false` when the address is stale.
    pub fn set_point_selected(&mut self, spline_index: usize, point_index: usize, selected: bool) -> bool {
        match self
            .splines
            .get_mut(spline_index)
            .and_then(|(_, s)| s.points.get_mut(point_index))
        {
            Some(point) => {
                point.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn deselect_all(&mut self) {
        for (_, spline) in &mut self.splines {
            for point in &mut spline.points {
                point.selected = false;
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CurveSnapshot {
        CurveSnapshot::from_curve(self)
    }

    /// Applies a rebuild plan in one step.
    ///
    /// Removed splines go first, inserted ones are appended in plan order
    /// (empty ones are dropped). The active spline is resolved from
    /// `plan.new_active`, falling back to the last inserted spline that
    /// inherited the active flag. Returns the ids of the inserted splines.
    pub fn apply(&mut self, plan: RebuildPlan) -> Vec<SplineId> {
        for id in &plan.remove {
            self.remove_spline(*id);
        }

        let mut inserted: Vec<Option<SplineId>> = Vec::with_capacity(plan.insert.len());
        let mut inherited_active = None;
        for new_spline in plan.insert {
            let active = new_spline.active;
            let id = self.add_spline(new_spline.into_spline());
            if active && id.is_some() {
                inherited_active = id;
            }
            inserted.push(id);
        }

        match plan.new_active {
            Some(SplineRef::Existing(id)) => {
                if self.spline(id).is_some() {
                    self.active = Some(id);
                }
            }
            Some(SplineRef::Inserted(i)) => {
                if let Some(Some(id)) = inserted.get(i) {
                    self.active = Some(*id);
                }
            }
            None => {
                if inherited_active.is_some() {
                    self.active = inherited_active;
                }
            }
        }

        inserted.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_spline_rejects_empty() {
        let mut curve = Curve::new();
        assert!(curve.add_spline(Spline::new(SplineSettings::default(), Vec::new())).is_none());
        assert!(curve.is_empty());
    }

    #[test]
    fn test_single_point_curve() {
        let curve = Curve::with_single_point(Point3::new(1.0, 2.0, 3.0));
        let spline = curve.active_spline().unwrap();
        assert_eq!(spline.points.len(), 1);
        assert!(spline.points[0].selected);
        assert_eq!(spline.settings.kind, SplineType::Poly);
    }

    #[test]
    fn test_removing_active_clears_it() {
        let mut curve = Curve::new();
        let id = curve.add_spline(Spline::poly(&[[0.0, 0.0, 0.0]])).unwrap();
        assert!(curve.set_active(Some(id)));
        curve.remove_spline(id);
        assert_eq!(curve.active(), None);
    }

    #[test]
    fn test_ids_stay_stable_across_removal() {
        let mut curve = Curve::new();
        let a = curve.add_spline(Spline::poly(&[[0.0, 0.0, 0.0]])).unwrap();
        let b = curve.add_spline(Spline::poly(&[[1.0, 0.0, 0.0]])).unwrap();
        curve.remove_spline(a);
        assert_eq!(curve.id_at(0), Some(b));
        assert_eq!(curve.spline(b).unwrap().points[0].co.x, 1.0);
    }
}
