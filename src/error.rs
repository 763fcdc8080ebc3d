//! Error types for outlier threshold calibration

use thiserror::Error;

/// Result type alias for calibration and scoring operations
pub type Result<T> = std::result::Result<T, OutlierError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum OutlierError {
    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Normal subset became empty at iteration {iteration}")]
    EmptyNormalSubset { iteration: usize },

    #[error("Model not fitted")]
    NotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown group label: {0}")]
    UnknownGroup(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Scorer error: {0}")]
    Scorer(String),
}

impl OutlierError {
    /// Shape mismatch between two row counts
    pub(crate) fn row_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        OutlierError::ShapeError {
            expected: format!("{} {} rows", what, expected),
            actual: format!("{} rows", actual),
        }
    }
}

impl From<serde_json::Error> for OutlierError {
    fn from(err: serde_json::Error) -> Self {
        OutlierError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for OutlierError {
    fn from(err: ndarray::ShapeError) -> Self {
        OutlierError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
