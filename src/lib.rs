#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Topology editing for curve objects made of POLY and NURBS splines.
//!
//! [`curve`] holds the data model, [`ops`] the edits and [`geom`] the
//! geometric primitives they share. [`Engine`] wraps a single curve for a
//! web host: it keeps the selection history, the current view and applies
//! edit plans.

pub mod curve;
pub mod geom;
pub mod ops;

use std::fmt;

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

use curve::{Curve, Point, RebuildPlan, SelectionHistory, SelectionKey, Spline, SplineSettings, SplineType};
use geom::{Point2, Point3, Transform, ViewProjection, ViewportProjection};
use ops::{
    ConvertOptions, EditError, GapShuffleOptions, KnifeOptions, MirrorAxis, SlideOptions,
    SlideSegment, SymmetrizeOptions,
};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("could not initialize rayon thread pool: {err}")))
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

// ============================================================================
// Host data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointExport {
    pub co: [f64; 3],
    #[serde(default = "one")]
    pub weight: f64,
    #[serde(default = "one")]
    pub radius: f64,
    #[serde(default)]
    pub tilt: f64,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineExport {
    #[serde(rename = "type")]
    pub kind: SplineType,
    #[serde(default)]
    pub cyclic: bool,
    #[serde(default)]
    pub smooth: bool,
    #[serde(default = "default_order")]
    pub order: u32,
    #[serde(default = "default_resolution")]
    pub resolution: u32,
    #[serde(default)]
    pub use_endpoint: bool,
    pub points: Vec<PointExport>,
}

/// Whole-curve exchange format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveExport {
    pub splines: Vec<SplineExport>,
    /// Index of the active spline.
    #[serde(default)]
    pub active: Option<usize>,
}

const fn one() -> f64 {
    1.0
}

const fn default_order() -> u32 {
    SplineSettings::new(SplineType::Nurbs).order
}

const fn default_resolution() -> u32 {
    SplineSettings::new(SplineType::Nurbs).resolution
}

impl From<&Point> for PointExport {
    fn from(point: &Point) -> Self {
        Self {
            co: point.co.to_array(),
            weight: point.weight,
            radius: point.radius,
            tilt: point.tilt,
            selected: point.selected,
            hidden: point.hidden,
        }
    }
}

impl From<&PointExport> for Point {
    fn from(point: &PointExport) -> Self {
        let mut out = Point::new(Point3::from(point.co))
            .with_radius(point.radius)
            .with_tilt(point.tilt)
            .selected(point.selected)
            .hidden(point.hidden);
        out.weight = point.weight;
        out
    }
}

impl From<&Spline> for SplineExport {
    fn from(spline: &Spline) -> Self {
        let s = spline.settings;
        Self {
            kind: s.kind,
            cyclic: s.cyclic,
            smooth: s.smooth,
            order: s.order,
            resolution: s.resolution,
            use_endpoint: s.use_endpoint,
            points: spline.points.iter().map(PointExport::from).collect(),
        }
    }
}

impl From<&SplineExport> for Spline {
    fn from(spline: &SplineExport) -> Self {
        let mut settings = SplineSettings::new(spline.kind)
            .cyclic(spline.cyclic)
            .smooth(spline.smooth)
            .use_endpoint(spline.use_endpoint);
        settings.order = spline.order;
        settings.resolution = spline.resolution;
        Spline::new(settings, spline.points.iter().map(Point::from).collect())
    }
}

impl From<&Curve> for CurveExport {
    fn from(curve: &Curve) -> Self {
        let active = curve.active();
        Self {
            splines: curve.splines().map(SplineExport::from).collect(),
            active: active.and_then(|id| curve.ids().position(|other| other == id)),
        }
    }
}

impl CurveExport {
    /// Builds a curve. Splines without points are skipped, which shifts the
    /// active index accordingly.
    #[must_use]
    pub fn to_curve(&self) -> Curve {
        let mut curve = Curve::new();
        let mut active = None;
        for (index, spline) in self.splines.iter().enumerate() {
            let id = curve.add_spline(Spline::from(spline));
            if self.active == Some(index) {
                active = id;
            }
        }
        curve.set_active(active);
        curve
    }
}

/// Outcome of one edit, as reported to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditSummary {
    pub operation: String,
    /// Whether the curve was modified.
    pub changed: bool,
    pub splines_removed: usize,
    pub splines_inserted: usize,
    pub warnings: Vec<String>,
}

// ============================================================================
// Engine
// ============================================================================

/// Public entry point for consumers.
#[wasm_bindgen]
pub struct Engine {
    curve: Curve,
    history: SelectionHistory,
    view: Option<ViewportProjection>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Engine {
        Engine {
            curve: Curve::new(),
            history: SelectionHistory::new(),
            view: None,
        }
    }

    /// Replaces the curve with a single selected point.
    #[wasm_bindgen]
    pub fn reset_to_point(&mut self, x: f64, y: f64, z: f64) {
        self.set_curve(Curve::with_single_point(Point3::new(x, y, z)));
    }

    /// Load a curve from its exchange format.
    #[wasm_bindgen]
    pub fn load_curve(&mut self, value: JsValue) -> Result<(), JsValue> {
        let export: CurveExport = serde_wasm_bindgen::from_value(value).map_err(to_js_error)?;
        self.set_curve(export.to_curve());
        Ok(())
    }

    #[wasm_bindgen]
    pub fn get_curve(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.export_curve())
    }

    /// `[spline, point]` pairs in selection order.
    #[wasm_bindgen]
    pub fn get_selection_history(&self) -> Result<JsValue, JsValue> {
        let entries: Vec<[usize; 2]> = self
            .history
            .entries()
            .iter()
            .map(|key| [key.spline, key.point])
            .collect();
        to_js_value(&entries)
    }

    #[wasm_bindgen]
    pub fn set_point_selected(&mut self, spline: usize, point: usize, selected: bool) -> bool {
        let changed = self.curve.set_point_selected(spline, point, selected);
        if changed {
            self.history.update(&self.curve.snapshot().selection());
        }
        changed
    }

    #[wasm_bindgen]
    pub fn deselect_all(&mut self) {
        self.curve.deselect_all();
        self.history.update(&self.curve.snapshot().selection());
    }

    #[wasm_bindgen]
    pub fn set_active_spline(&mut self, spline: Option<usize>) -> Result<(), JsValue> {
        self.select_active_spline(spline).map_err(to_js_error)
    }

    /// Set the view from a row-major 4x4 view-projection matrix.
    #[wasm_bindgen]
    pub fn set_view(
        &mut self,
        matrix: Vec<f64>,
        width: f64,
        height: f64,
        orthographic: bool,
    ) -> Result<(), JsValue> {
        self.set_view_matrix(&matrix, width, height, orthographic)
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn knife(
        &mut self,
        start_x: f64,
        start_y: f64,
        end_x: f64,
        end_y: f64,
        split: bool,
    ) -> Result<JsValue, JsValue> {
        let summary = self
            .run_knife(Point2::new(start_x, start_y), Point2::new(end_x, end_y), split)
            .map_err(to_js_error)?;
        to_js_value(&summary)
    }

    #[wasm_bindgen]
    pub fn merge_to_last(&mut self) -> Result<JsValue, JsValue> {
        let summary = self.run_merge_to_last().map_err(to_js_error)?;
        to_js_value(&summary)
    }

    #[wasm_bindgen]
    pub fn merge_to_center(&mut self) -> Result<JsValue, JsValue> {
        let summary = self.run_merge_to_center().map_err(to_js_error)?;
        to_js_value(&summary)
    }

    /// Mirror the active spline. `frame` is an optional row-major 4x4
    /// placing the mirror frame in curve space (a 3D cursor, for example).
    #[wasm_bindgen]
    pub fn symmetrize(
        &mut self,
        axis: &str,
        remove_redundant: bool,
        frame: Option<Vec<f64>>,
    ) -> Result<JsValue, JsValue> {
        let summary = self
            .run_symmetrize(axis, remove_redundant, frame.as_deref())
            .map_err(to_js_error)?;
        to_js_value(&summary)
    }

    #[wasm_bindgen]
    pub fn gap_shuffle(&mut self, offset: Option<usize>, cyclic: bool) -> Result<JsValue, JsValue> {
        let summary = self.run_gap_shuffle(offset, cyclic).map_err(to_js_error)?;
        to_js_value(&summary)
    }

    #[wasm_bindgen]
    pub fn reverse(&mut self) -> Result<JsValue, JsValue> {
        let summary = self.run_reverse().map_err(to_js_error)?;
        to_js_value(&summary)
    }

    #[wasm_bindgen]
    pub fn convert(&mut self, endpoint: Option<bool>) -> Result<JsValue, JsValue> {
        let summary = self.run_convert(endpoint).map_err(to_js_error)?;
        to_js_value(&summary)
    }

    /// Slide the selected point towards the cursor. `locked` is `"previous"`
    /// or `"next"`.
    #[wasm_bindgen]
    pub fn slide(
        &mut self,
        x: f64,
        y: f64,
        precision: bool,
        locked: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let locked = match locked.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) if name.eq_ignore_ascii_case("previous") || name.eq_ignore_ascii_case("prev") => {
                Some(SlideSegment::Previous)
            }
            Some(name) if name.eq_ignore_ascii_case("next") => Some(SlideSegment::Next),
            Some(name) => return Err(js_error(&format!("unknown slide segment '{name}'"))),
        };
        let summary = self
            .run_slide(Point2::new(x, y), precision, locked)
            .map_err(to_js_error)?;
        to_js_value(&summary)
    }
}

impl Engine {
    #[must_use]
    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    #[must_use]
    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    #[must_use]
    pub fn export_curve(&self) -> CurveExport {
        CurveExport::from(&self.curve)
    }

    pub fn set_curve(&mut self, curve: Curve) {
        self.curve = curve;
        self.reset_history();
    }

    /// # Errors
    /// [`EditError::SplineOutOfRange`] for an unknown index.
    pub fn select_active_spline(&mut self, index: Option<usize>) -> Result<(), EditError> {
        let id = match index {
            Some(index) => Some(self.curve.id_at(index).ok_or(EditError::SplineOutOfRange(index))?),
            None => None,
        };
        self.curve.set_active(id);
        Ok(())
    }

    /// # Errors
    /// [`EditError::InvalidView`] for a malformed or singular matrix.
    pub fn set_view_matrix(
        &mut self,
        matrix: &[f64],
        width: f64,
        height: f64,
        orthographic: bool,
    ) -> Result<(), EditError> {
        let matrix = Transform::from_row_major(matrix)
            .ok_or_else(|| EditError::InvalidView("expected 16 matrix values".to_string()))?;
        let view = ViewportProjection::new(matrix, width, height, orthographic)
            .ok_or_else(|| EditError::InvalidView("singular matrix or empty viewport".to_string()))?;
        self.view = Some(view);
        Ok(())
    }

    pub fn set_viewport(&mut self, view: ViewportProjection) {
        self.view = Some(view);
    }

    /// # Errors
    /// [`EditError::NoView`] before a view is set.
    pub fn run_knife(&mut self, start: Point2, end: Point2, split: bool) -> Result<EditSummary, EditError> {
        let view = self.view.as_ref().ok_or(EditError::NoView)?;
        let (plan, diagnostics) = ops::knife(
            &self.curve.snapshot(),
            start,
            end,
            view,
            KnifeOptions::new().split(split),
        );
        log::debug!("knife: {diagnostics:?}");
        Ok(self.commit("knife", plan, diagnostics.warnings))
    }

    /// # Errors
    /// See [`ops::merge_to_last`].
    pub fn run_merge_to_last(&mut self) -> Result<EditSummary, EditError> {
        let (plan, diagnostics) =
            ops::merge_to_last(&self.curve.snapshot(), self.history.entries())?;
        log::debug!("merge to last: {diagnostics:?}");
        Ok(self.commit("merge_to_last", plan, diagnostics.warnings))
    }

    /// # Errors
    /// See [`ops::merge_to_center`].
    pub fn run_merge_to_center(&mut self) -> Result<EditSummary, EditError> {
        let (plan, diagnostics) = ops::merge_to_center(&self.curve.snapshot())?;
        log::debug!("merge to center: {diagnostics:?}");
        Ok(self.commit("merge_to_center", plan, diagnostics.warnings))
    }

    /// # Errors
    /// [`EditError::InvalidAxis`], [`EditError::InvalidView`] for a bad
    /// frame, or any [`ops::SymmetrizeError`].
    pub fn run_symmetrize(
        &mut self,
        axis: &str,
        remove_redundant: bool,
        frame: Option<&[f64]>,
    ) -> Result<EditSummary, EditError> {
        let axis = MirrorAxis::parse(axis).ok_or_else(|| EditError::InvalidAxis(axis.to_string()))?;
        let frame = match frame {
            Some(values) => Transform::from_row_major(values)
                .ok_or_else(|| EditError::InvalidView("expected 16 frame values".to_string()))?,
            None => Transform::identity(),
        };
        let (plan, diagnostics) = ops::symmetrize_across_axis(
            &self.curve.snapshot(),
            axis,
            frame,
            SymmetrizeOptions::new().remove_redundant(remove_redundant),
        )?;
        log::debug!(
            "symmetrize: {:?}, {} intersections, {} redundant",
            diagnostics.kind,
            diagnostics.intersections_inserted,
            diagnostics.redundant
        );
        Ok(self.commit("symmetrize", plan, Vec::new()))
    }

    /// # Errors
    /// See [`ops::gap_shuffle`].
    pub fn run_gap_shuffle(&mut self, offset: Option<usize>, cyclic: bool) -> Result<EditSummary, EditError> {
        let mut options = GapShuffleOptions::new().cyclic(cyclic);
        options.offset = offset;
        let (plan, diagnostics) = ops::gap_shuffle(&self.curve.snapshot(), options)?;
        log::debug!("gap shuffle: offset {}, outliers {:?}", diagnostics.offset, diagnostics.outliers);
        Ok(self.commit("gap_shuffle", plan, diagnostics.warnings))
    }

    /// # Errors
    /// See [`ops::reverse`].
    pub fn run_reverse(&mut self) -> Result<EditSummary, EditError> {
        let plan = ops::reverse(&self.curve.snapshot())?;
        Ok(self.commit("reverse", plan, Vec::new()))
    }

    /// # Errors
    /// See [`ops::convert`].
    pub fn run_convert(&mut self, endpoint: Option<bool>) -> Result<EditSummary, EditError> {
        let options = ConvertOptions {
            endpoint,
        };
        let (plan, diagnostics) = ops::convert(&self.curve.snapshot(), options)?;
        log::debug!("convert: {:?} -> {:?}", diagnostics.from, diagnostics.to);
        Ok(self.commit("convert", plan, Vec::new()))
    }

    /// # Errors
    /// [`EditError::NoView`] before a view is set,
    /// [`EditError::Unprojectable`] when the cursor has no view ray, or any
    /// [`ops::SlideError`].
    pub fn run_slide(
        &mut self,
        cursor: Point2,
        precision: bool,
        locked: Option<SlideSegment>,
    ) -> Result<EditSummary, EditError> {
        let view = self.view.as_ref().ok_or(EditError::NoView)?;
        let ray = view.unproject_ray(cursor).ok_or(EditError::Unprojectable {
            x: cursor.x,
            y: cursor.y,
        })?;
        let options = SlideOptions {
            precision,
            locked,
        };
        let (plan, diagnostics) = ops::slide_point(&self.curve.snapshot(), ray, options)?;
        log::debug!("slide: {:?} on {:?}", diagnostics.point, diagnostics.segment);
        Ok(self.commit("slide", plan, Vec::new()))
    }

    fn commit(&mut self, operation: &str, plan: RebuildPlan, warnings: Vec<String>) -> EditSummary {
        let summary = EditSummary {
            operation: operation.to_string(),
            changed: !plan.is_empty(),
            splines_removed: plan.remove.len(),
            splines_inserted: plan.insert.iter().filter(|s| !s.is_empty()).count(),
            warnings,
        };
        if summary.changed {
            self.curve.apply(plan);
            self.reset_history();
        }
        debug_log!("{operation}: {summary:?}");
        summary
    }

    /// Point addresses change on every rebuild, so the history starts over
    /// from the current selection.
    fn reset_history(&mut self) {
        self.history.clear();
        self.history.update(&self.curve.snapshot().selection());
    }

    #[must_use]
    pub fn selection(&self) -> Vec<SelectionKey> {
        self.curve.snapshot().selection().into_iter().collect()
    }
}

fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|err| JsError::new(&err.to_string()).into())
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_export() -> CurveExport {
        CurveExport {
            splines: vec![SplineExport::from(&Spline::poly(&[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
            ]))],
            active: Some(0),
        }
    }

    #[test]
    fn test_export_round_trip_keeps_active() {
        let export = line_export();
        let curve = export.to_curve();
        assert!(curve.active_spline().is_some());
        assert_eq!(CurveExport::from(&curve), export);
    }

    #[test]
    fn test_export_skips_empty_splines() {
        let mut export = line_export();
        let empty = SplineExport {
            points: Vec::new(),
            ..export.splines[0].clone()
        };
        export.splines.insert(0, empty);
        export.active = Some(1);
        let curve = export.to_curve();
        assert_eq!(curve.len(), 1);
        assert_eq!(CurveExport::from(&curve).active, Some(0));
    }

    #[test]
    fn test_selection_feeds_history_and_edits_reset_it() {
        let mut engine = Engine::new();
        engine.set_curve(line_export().to_curve());
        assert!(engine.set_point_selected(0, 2, true));
        assert!(engine.set_point_selected(0, 1, true));
        assert_eq!(engine.history().last(), Some(SelectionKey::new(0, 1)));
        assert!(!engine.set_point_selected(3, 0, true));

        let summary = engine.run_merge_to_last().unwrap();
        assert!(summary.changed);
        assert_eq!(engine.curve().spline_at(0).unwrap().points.len(), 2);
        assert_eq!(engine.history().entries(), &[SelectionKey::new(0, 1)]);
    }

    #[test]
    fn test_knife_requires_view() {
        let mut engine = Engine::new();
        engine.set_curve(line_export().to_curve());
        assert_eq!(
            engine.run_knife(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), false),
            Err(EditError::NoView)
        );
    }

    #[test]
    fn test_invalid_axis_is_reported() {
        let mut engine = Engine::new();
        engine.set_curve(line_export().to_curve());
        assert_eq!(
            engine.run_symmetrize("W", true, None),
            Err(EditError::InvalidAxis("W".to_string()))
        );
    }

    #[test]
    fn test_reverse_through_engine() {
        let mut engine = Engine::new();
        engine.set_curve(line_export().to_curve());
        let summary = engine.run_reverse().unwrap();
        assert_eq!(summary.splines_removed, 1);
        assert_eq!(summary.splines_inserted, 1);
        assert_eq!(engine.export_curve().splines[0].points[0].co, [2.0, 0.0, 0.0]);
        assert_eq!(engine.export_curve().active, Some(0));
    }
}
