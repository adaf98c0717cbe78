//! Error types for row argmax reductions.

use thiserror::Error;

/// Result type for row argmax operations.
pub type Result<T> = std::result::Result<T, ArgmaxError>;

/// Errors surfaced by matrix construction, strategy preparation and the harness.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgmaxError {
    /// A lane-based strategy was given a row that does not split into whole lanes.
    #[error("row width {width} is not a multiple of the lane width {lanes}")]
    WidthNotLaneMultiple { width: usize, lanes: usize },

    /// Row positions do not fit in the index type a strategy carries.
    #[error("row width {width} exceeds the {limit} positions addressable by {strategy}")]
    IndexOverflow {
        strategy: &'static str,
        width: usize,
        limit: usize,
    },

    /// A prepared strategy was handed a row of a different width.
    #[error("row width {actual} does not match the prepared width {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    /// Sample count does not match the declared matrix shape.
    #[error("a {rows}x{width} matrix needs {expected} samples, got {actual}")]
    ShapeMismatch {
        rows: usize,
        width: usize,
        expected: usize,
        actual: usize,
    },

    /// Rows must hold at least one sample.
    #[error("rows must hold at least one sample")]
    EmptyRow,

    /// Harness or CLI configuration rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pairing schedule would break first-occurrence ordering or skip lanes.
    #[error("reduction schedule step {step} is invalid: {reason}")]
    InvalidSchedule { step: usize, reason: &'static str },

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown time unit: {0} (expected ms or us)")]
    UnknownUnit(String),

    /// A strategy disagreed with the scalar oracle on the same matrix.
    #[error("{strategy} row sum {actual} disagrees with the scalar oracle ({expected})")]
    ChecksumMismatch {
        strategy: &'static str,
        expected: u64,
        actual: u64,
    },
}
