//! Topology-changing curve edits.
//!
//! Every edit reads a [`CurveSnapshot`](crate::curve::CurveSnapshot) and
//! returns a [`RebuildPlan`](crate::curve::RebuildPlan) plus diagnostics. The
//! curve itself is only touched when the caller applies the plan, so a
//! failed or rejected edit never leaves a half-rebuilt curve behind.

pub mod knife;
pub mod merge;
pub mod rebuild_tools;
pub mod slide;
pub mod symmetrize;

pub use knife::{KnifeDiagnostics, KnifeHit, KnifeOptions, find_knife_hits, knife};
pub use merge::{MergeDiagnostics, MergeError, MergeKind, merge_to_center, merge_to_last};
pub use rebuild_tools::{
    ConvertDiagnostics, ConvertOptions, GapShuffleDiagnostics, GapShuffleOptions, RebuildError,
    convert, default_gap_offset, gap_shuffle, outlier_segments, reverse, step_gap_offset,
};
pub use slide::{SlideDiagnostics, SlideError, SlideOptions, SlideSegment, slide_point};
pub use symmetrize::{
    MirrorAxis, SymmetrizeDiagnostics, SymmetrizeError, SymmetrizeKind, SymmetrizeOptions,
    symmetrize, symmetrize_across_axis,
};

/// Any edit failure, as surfaced by the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Symmetrize(#[from] SymmetrizeError),

    #[error(transparent)]
    Rebuild(#[from] RebuildError),

    #[error(transparent)]
    Slide(#[from] SlideError),

    #[error("no view has been set")]
    NoView,

    #[error("unknown mirror axis '{0}'")]
    InvalidAxis(String),

    #[error("invalid view: {0}")]
    InvalidView(String),

    #[error("no spline at index {0}")]
    SplineOutOfRange(usize),

    #[error("cannot unproject screen position ({x}, {y})")]
    Unprojectable { x: f64, y: f64 },
}
