//! Anomaly scorer contract
//!
//! A scorer is the model being calibrated. It is fitted on a feature matrix
//! (and optional labels, whose meaning is up to the scorer) and returns one
//! positive score per row, where larger values mean more anomalous. The
//! calibrator inverts these scores, so its own decision values grow as rows
//! look more normal.
//!
//! - [`GaussianScorer`] - per-feature Gaussian density, optionally grouped by label

mod gaussian;

pub use gaussian::{GaussianScorer, GroupStats};

use crate::error::{OutlierError, Result};
use ndarray::{Array1, Array2};

/// Trait for anomaly scorers wrapped by a threshold calibrator
pub trait AnomalyScorer: Send + Sync {
    /// Fit the scorer on a feature matrix and optional per-row labels.
    ///
    /// May be called repeatedly with shrinking subsets of the same data.
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<()>;

    /// Score each row; larger positive scores mark more anomalous rows
    fn anomaly_score(&self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array1<f64>>;
}

impl<S: AnomalyScorer + ?Sized> AnomalyScorer for Box<S> {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<()> {
        (**self).fit(x, y)
    }

    fn anomaly_score(&self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array1<f64>> {
        (**self).anomaly_score(x, y)
    }
}

/// Check that the label vector, when present, has one entry per row of `x`
pub fn check_labels(x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<()> {
    match y {
        Some(labels) if labels.len() != x.nrows() => Err(OutlierError::row_mismatch(
            "labels with",
            x.nrows(),
            labels.len(),
        )),
        _ => Ok(()),
    }
}
