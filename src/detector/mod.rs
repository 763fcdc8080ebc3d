//! Classifier-style outlier detection interface
//!
//! [`OutlierDetector`] is the fit / decision_function / predict surface that
//! evaluation tooling consumes. Labels follow the usual convention: `1` for
//! normal rows, `-1` for anomalies.

use crate::calibration::{labels_from_decision, ThresholdCalibrator};
use crate::error::Result;
use crate::scorer::AnomalyScorer;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Outlier detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Decision values (higher = more normal)
    pub scores: Array1<f64>,
    /// Binary labels (-1 = anomaly, 1 = normal)
    pub labels: Array1<i32>,
    /// Threshold the decision values are centred on
    pub threshold: Option<f64>,
    /// Number of anomalies detected
    pub n_anomalies: usize,
}

impl DetectionResult {
    /// Fraction of rows flagged as anomalous
    pub fn anomaly_fraction(&self) -> f64 {
        if self.labels.is_empty() {
            0.0
        } else {
            self.n_anomalies as f64 / self.labels.len() as f64
        }
    }
}

/// Trait for outlier detectors with a classifier-shaped interface
pub trait OutlierDetector: Send + Sync {
    /// Fit the detector on training data and optional labels
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<()>;

    /// Signed decision values; positive means normal
    fn decision_function(&self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array1<f64>>;

    /// Predict labels (-1 = anomaly, 1 = normal)
    fn predict(&self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array1<i32>> {
        Ok(labels_from_decision(&self.decision_function(x, y)?))
    }

    /// Fit and predict in one step
    fn fit_predict(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array1<i32>> {
        self.fit(x, y)?;
        self.predict(x, y)
    }

    /// Get detection results with scores and labels
    fn detect(&self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<DetectionResult> {
        let scores = self.decision_function(x, y)?;
        let labels = labels_from_decision(&scores);
        let n_anomalies = labels.iter().filter(|&&l| l == -1).count();

        Ok(DetectionResult {
            scores,
            labels,
            threshold: self.threshold(),
            n_anomalies,
        })
    }

    /// Get the decision threshold, if fitted
    fn threshold(&self) -> Option<f64>;
}

impl<S: AnomalyScorer> OutlierDetector for ThresholdCalibrator<S> {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<()> {
        ThresholdCalibrator::fit(self, x, y).map(|_| ())
    }

    fn decision_function(&self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array1<f64>> {
        ThresholdCalibrator::decision_function(self, x, y)
    }

    fn threshold(&self) -> Option<f64> {
        ThresholdCalibrator::threshold(self)
    }
}
