//! Error types shared by the convolution core, the loaders and the configuration.

use std::fmt;

use thiserror::Error;

/// Pipeline stage that produced a value, used to report numeric anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    WeightTransform,
    InputTransform,
    Combine,
    OutputTransform,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::WeightTransform => write!(f, "weight transform"),
            Stage::InputTransform => write!(f, "input transform"),
            Stage::Combine => write!(f, "combine"),
            Stage::OutputTransform => write!(f, "output transform"),
        }
    }
}

/// Errors produced while configuring, loading or running a convolution.
#[derive(Debug, Error)]
pub enum WinogradError {
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    Shape {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to allocate {bytes} bytes of scratch memory")]
    Allocation { bytes: usize },

    #[error("non-finite value {value} at index {index} after {stage}")]
    NumericAnomaly { stage: Stage, index: usize, value: f32 },

    #[error("result differs from the direct convolution by {max_rel_diff:.3e} relative (tolerance {tolerance:.0e})")]
    Verification { max_rel_diff: f32, tolerance: f32 },

    #[error("failed to parse tensor file: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WinogradError {
    pub(crate) fn shape(what: &str, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        WinogradError::Shape {
            what: what.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, WinogradError>;
