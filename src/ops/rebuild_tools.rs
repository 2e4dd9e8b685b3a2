//! Whole-spline rebuild tools: gap shuffle, reverse and type conversion.
//!
//! None of these change point positions. They re-sequence the active
//! spline or change its type, always by replacing it with a rebuilt copy.

use crate::curve::{CurveSnapshot, PointData, RebuildPlan, SplineData, SplineType, rebuild_spline};
use crate::geom::Point3;

/// Errors shared by the rebuild tools.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebuildError {
    #[error("no active spline")]
    NoActiveSpline,

    #[error("operation does not support {0:?} splines")]
    UnsupportedType(SplineType),

    #[error("spline must have more than {min} points, got {count}")]
    TooFewPoints { min: usize, count: usize },
}

fn active_editable(snapshot: &CurveSnapshot) -> Result<&SplineData, RebuildError> {
    let spline = snapshot.active_spline().ok_or(RebuildError::NoActiveSpline)?;
    if spline.settings.kind.is_editable() {
        Ok(spline)
    } else {
        Err(RebuildError::UnsupportedType(spline.settings.kind))
    }
}

// ============================================================================
// Gap Shuffle
// ============================================================================

/// IQR multiplier for outlier segments.
const OUTLIER_MULTIPLIER: f64 = 1.5;

/// Options for gap shuffling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapShuffleOptions {
    /// Explicit rotation. `None` picks one from the segment lengths.
    pub offset: Option<usize>,
    /// Whether the shuffled spline is closed.
    pub cyclic: bool,
}

impl GapShuffleOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            offset: None,
            cyclic: true,
        }
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub const fn cyclic(mut self, cyclic: bool) -> Self {
        self.cyclic = cyclic;
        self
    }
}

impl Default for GapShuffleOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Diagnostics for gap shuffling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GapShuffleDiagnostics {
    /// Rotation actually applied.
    pub offset: usize,
    /// Segment indices with outlier lengths.
    pub outliers: Vec<usize>,
    /// Whether stepping through outliers only is meaningful.
    pub can_shuffle_outliers: bool,
    pub warnings: Vec<String>,
}

/// Linear-interpolation percentile of sorted data, `p` in `[0, 100]`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Indices of segments (`i` spans points `i..=i+1`) whose length is an IQR
/// outlier. The first and last segments never count.
#[must_use]
pub fn outlier_segments(coords: &[Point3]) -> Vec<usize> {
    let lengths: Vec<f64> = coords.windows(2).map(|w| w[0].distance_to(w[1])).collect();
    let mut sorted = lengths.clone();
    sorted.sort_by(f64::total_cmp);

    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - OUTLIER_MULTIPLIER * iqr;
    let upper = q3 + OUTLIER_MULTIPLIER * iqr;

    let interior = 1..coords.len().saturating_sub(2);
    lengths
        .iter()
        .enumerate()
        .filter(|&(idx, &len)| (len < lower || len > upper) && interior.contains(&idx))
        .map(|(idx, _)| idx)
        .collect()
}

/// Rotation used when none is given: just past the middle outlier segment,
/// or half way round without outliers.
#[must_use]
pub fn default_gap_offset(point_count: usize, outliers: &[usize]) -> usize {
    outliers
        .get(outliers.len() / 2)
        .map_or(point_count / 2, |&idx| idx + 1)
}

/// Next rotation when stepping interactively.
///
/// With `outliers_only` (and more than one outlier) the offset cycles
/// through the positions just past each outlier segment. Otherwise it walks
/// `1..point_count`, wrapping at both ends.
#[must_use]
pub fn step_gap_offset(
    current: usize,
    forward: bool,
    point_count: usize,
    outliers: &[usize],
    outliers_only: bool,
) -> usize {
    if outliers_only && outliers.len() > 1 {
        let pos = outliers
            .iter()
            .position(|&o| o + 1 == current)
            .unwrap_or(0);
        let len = outliers.len();
        let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
        return outliers[next] + 1;
    }

    let last = point_count.saturating_sub(1).max(1);
    if forward {
        if current >= last { 1 } else { current + 1 }
    } else if current <= 1 {
        last
    } else {
        current - 1
    }
}

/// Moves the start of the active spline by rotating its points.
///
/// An offset of 0 leaves the curve untouched.
///
/// # Errors
/// [`RebuildError`] without an active POLY/NURBS spline of more than two points.
pub fn gap_shuffle(
    snapshot: &CurveSnapshot,
    options: GapShuffleOptions,
) -> Result<(RebuildPlan, GapShuffleDiagnostics), RebuildError> {
    let spline = active_editable(snapshot)?;
    let count = spline.points.len();
    if count <= 2 {
        return Err(RebuildError::TooFewPoints { min: 2, count });
    }

    let coords: Vec<Point3> = spline.points.iter().map(PointData::co).collect();
    let outliers = outlier_segments(&coords);
    let offset = options
        .offset
        .unwrap_or_else(|| default_gap_offset(count, &outliers))
        % count;

    let mut diagnostics = GapShuffleDiagnostics {
        offset,
        can_shuffle_outliers: outliers.len() > 1,
        outliers,
        warnings: Vec::new(),
    };

    if offset == 0 {
        diagnostics.warnings.push("offset 0 keeps the current start".to_string());
        return Ok((RebuildPlan::new(), diagnostics));
    }

    let mut points = spline.points.clone();
    points.rotate_left(offset);
    let mut new_spline = rebuild_spline(spline, Some(points));
    new_spline.settings.cyclic = options.cyclic;

    log::debug!(
        "gap shuffle: offset {offset}, {} outlier segments",
        diagnostics.outliers.len()
    );
    Ok((RebuildPlan::replace(spline.id, vec![new_spline]), diagnostics))
}

// ============================================================================
// Reverse
// ============================================================================

/// Reverses the direction of the active spline.
///
/// # Errors
/// [`RebuildError`] without an active POLY/NURBS spline.
pub fn reverse(snapshot: &CurveSnapshot) -> Result<RebuildPlan, RebuildError> {
    let spline = active_editable(snapshot)?;
    let points = spline.points.iter().rev().copied().collect();
    Ok(RebuildPlan::replace(
        spline.id,
        vec![rebuild_spline(spline, Some(points))],
    ))
}

// ============================================================================
// Convert
// ============================================================================

/// Options for spline type conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvertOptions {
    /// Clamp the NURBS to its end points. `None` clamps open splines only.
    pub endpoint: Option<bool>,
}

impl ConvertOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self { endpoint: None }
    }

    #[must_use]
    pub const fn endpoint(mut self, endpoint: bool) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

/// Diagnostics for type conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertDiagnostics {
    pub from: SplineType,
    pub to: SplineType,
    pub use_endpoint: bool,
    /// Control points dropped when leaving BEZIER.
    pub dropped_points: usize,
}

/// Converts the active spline: NURBS becomes POLY, POLY and BEZIER become NURBS.
///
/// BEZIER points are stored as `[left handle, control, right handle]`
/// triples; only the controls survive.
///
/// # Errors
/// [`RebuildError::NoActiveSpline`] without an active spline.
pub fn convert(
    snapshot: &CurveSnapshot,
    options: ConvertOptions,
) -> Result<(RebuildPlan, ConvertDiagnostics), RebuildError> {
    let spline = snapshot.active_spline().ok_or(RebuildError::NoActiveSpline)?;
    let from = spline.settings.kind;

    let mut new_spline = if from == SplineType::Bezier {
        let controls: Vec<PointData> = spline.points.iter().skip(1).step_by(3).copied().collect();
        rebuild_spline(spline, Some(controls))
    } else {
        rebuild_spline(spline, None)
    };

    let to = if from == SplineType::Nurbs {
        SplineType::Poly
    } else {
        SplineType::Nurbs
    };
    new_spline.settings.kind = to;

    if to == SplineType::Nurbs && options.endpoint.unwrap_or(!spline.settings.cyclic) {
        new_spline.settings.use_endpoint = true;
    }

    let diagnostics = ConvertDiagnostics {
        from,
        to,
        use_endpoint: new_spline.settings.use_endpoint,
        dropped_points: spline.points.len() - new_spline.len(),
    };
    if new_spline.is_empty() {
        return Err(RebuildError::TooFewPoints {
            min: 1,
            count: spline.points.len(),
        });
    }

    Ok((RebuildPlan::replace(spline.id, vec![new_spline]), diagnostics))
}
