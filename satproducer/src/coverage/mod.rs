//! Area coverage estimation.
//!
//! Two estimates decide whether a pass observed enough of a target region:
//!
//! - **Ground track**: overlap between the theoretical swath of an
//!   [`Overpass`](crate::capability::Overpass) and the region outline, cheap
//!   enough to run before any pixel data is loaded.
//! - **Generic**: overlap between the outline of the observed pixels of the
//!   loaded channels and the region outline, used when no orbit model exists.
//!
//! Both work on planar longitude/latitude polygons. Region outlines are
//! assumed convex and not to cross the antimeridian.

mod evaluator;
mod geometry;
mod trace;

pub use evaluator::{CoverageDecision, CoverageEvaluator, DEFAULT_FREQUENCY};
pub use geometry::{Point, Polygon};
pub use trace::{boundary_polygons, trace_boundaries, ValidityMask};

use thiserror::Error;

/// Coverage estimation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoverageError {
    #[error("mask of {rows}x{cols} pixels cannot hold {len} values")]
    MaskSize { rows: usize, cols: usize, len: usize },

    #[error("region {0} has an empty outline")]
    EmptyRegion(String),

    #[error("swath boundary unavailable: {0}")]
    Boundary(String),
}
