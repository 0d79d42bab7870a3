use thiserror::Error;

/// Failures raised by the envelope analysis core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Fewer than two peaks or fewer than two troughs survived detection.
    #[error("not enough extrema to interpolate envelopes: {peaks} peaks, {troughs} troughs (need at least 2 of each)")]
    InsufficientExtrema { peaks: usize, troughs: usize },

    /// An interpolant needs at least two control points.
    #[error("interpolation needs at least {required} control points, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },

    #[error("length mismatch: {what} has {actual} values, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Knots (or sample times) must be finite and strictly increasing.
    #[error("{what} must be finite and strictly increasing (violated at index {index})")]
    NotStrictlyIncreasing { what: &'static str, index: usize },

    #[error("minimum peak distance must be at least 1, got {0}")]
    InvalidDistance(usize),
}

/// Failures raised while turning raw files into a torque trace.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unsupported time unit: {0}")]
    UnsupportedTimeUnit(String),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
}
