//! Contamination-based threshold calibration
//!
//! [`ThresholdCalibrator`] wraps an [`AnomalyScorer`] and picks a decision
//! threshold so that roughly `contamination` of the training rows fall on the
//! anomalous side. Calibration is a self-training loop:
//!
//! 1. fit the scorer on all rows
//! 2. invert the scores (`1 / (raw + epsilon)`), take the contamination
//!    percentile as the threshold
//! 3. refit the scorer on the rows strictly above the threshold
//! 4. repeat until two successive thresholds are within `tol`, or `max_iter`
//!    iterations have run
//!
//! Decision values are the inverted scores minus the threshold, so positive
//! means normal and the boundary sits at zero.

mod config;
mod percentile;

pub use config::CalibratorConfig;
pub use percentile::percentile;

use crate::error::{OutlierError, Result};
use crate::scorer::{check_labels, AnomalyScorer};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Offset applied to inverted scores while the loop is still searching
const RESET_THRESHOLD: f64 = 0.0;

/// Whether a calibrator has a usable threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CalibrationState {
    /// No successful fit yet, or the last fit failed
    Uncalibrated,
    /// Threshold from the last successful fit, in inverted-score space
    Calibrated { threshold: f64 },
}

impl CalibrationState {
    /// Threshold, if calibrated
    pub fn threshold(&self) -> Option<f64> {
        match self {
            CalibrationState::Uncalibrated => None,
            CalibrationState::Calibrated { threshold } => Some(*threshold),
        }
    }
}

/// Summary of one calibration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Number of refit iterations performed
    pub iterations: usize,
    /// Whether the last two thresholds were within tolerance
    pub converged: bool,
    /// Threshold computed at each iteration, in order
    pub thresholds: Vec<f64>,
    /// Rows the scorer was last refitted on
    pub n_normal: usize,
    /// Rows in the training matrix
    pub n_samples: usize,
}

impl CalibrationReport {
    /// Final threshold of the run
    pub fn final_threshold(&self) -> Option<f64> {
        self.thresholds.last().copied()
    }
}

/// Threshold calibrator around an anomaly scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdCalibrator<S> {
    config: CalibratorConfig,
    scorer: S,
    state: CalibrationState,
    report: Option<CalibrationReport>,
}

impl<S: AnomalyScorer> ThresholdCalibrator<S> {
    /// Create a calibrator with the given contamination and default settings
    pub fn new(scorer: S, contamination: f64) -> Result<Self> {
        Self::with_config(scorer, CalibratorConfig::new(contamination))
    }

    /// Create a calibrator from a full configuration
    pub fn with_config(scorer: S, config: CalibratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scorer,
            state: CalibrationState::Uncalibrated,
            report: None,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &CalibratorConfig {
        &self.config
    }

    /// Assumed contamination fraction
    pub fn contamination(&self) -> f64 {
        self.config.contamination
    }

    /// Current calibration state
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Calibrated threshold, `None` before a successful fit
    pub fn threshold(&self) -> Option<f64> {
        self.state.threshold()
    }

    /// Report of the last successful fit
    pub fn fit_report(&self) -> Option<&CalibrationReport> {
        self.report.as_ref()
    }

    /// Wrapped scorer
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Take back the wrapped scorer
    pub fn into_scorer(self) -> S {
        self.scorer
    }

    /// Fit the scorer and calibrate the threshold.
    ///
    /// Any previous calibration is discarded first; on error the calibrator
    /// is left uncalibrated.
    pub fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<&mut Self> {
        self.state = CalibrationState::Uncalibrated;
        self.report = None;

        if x.nrows() == 0 {
            return Err(OutlierError::EmptyInput(
                "cannot calibrate on zero rows".to_string(),
            ));
        }
        check_labels(x, y)?;

        self.scorer.fit(x, y)?;

        let q = 100.0 * self.config.contamination;
        let mut old_threshold: Option<f64> = None;
        let mut threshold: Option<f64> = None;
        let mut thresholds = Vec::new();
        let mut n_normal = x.nrows();
        let mut count = 0;

        while count < self.config.max_iter
            && !within_tolerance(old_threshold, threshold, self.config.tol)
        {
            old_threshold = threshold;

            let scores = self.inverted_scores(x, y, RESET_THRESHOLD)?;
            let current = percentile(&scores, q)?;

            let normal: Vec<usize> = scores
                .iter()
                .enumerate()
                .filter(|(_, s)| **s > current)
                .map(|(i, _)| i)
                .collect();

            if normal.is_empty() {
                warn!(
                    iteration = count + 1,
                    threshold = current,
                    "No rows score above the threshold, calibration aborted"
                );
                return Err(OutlierError::EmptyNormalSubset {
                    iteration: count + 1,
                });
            }

            let x_normal = x.select(Axis(0), &normal);
            let y_normal = y.map(|labels| labels.select(Axis(0), &normal));
            self.scorer.fit(&x_normal, y_normal.as_ref())?;

            count += 1;
            n_normal = normal.len();
            threshold = Some(current);
            thresholds.push(current);

            debug!(
                iteration = count,
                threshold = current,
                n_normal = n_normal,
                "Calibration iteration"
            );
        }

        let converged = within_tolerance(old_threshold, threshold, self.config.tol);
        let threshold = threshold.ok_or_else(|| {
            OutlierError::ComputationError("calibration produced no threshold".to_string())
        })?;

        if converged {
            info!(
                iterations = count,
                threshold = threshold,
                n_normal = n_normal,
                "Threshold calibrated"
            );
        } else {
            warn!(
                iterations = count,
                threshold = threshold,
                "Threshold did not converge, using last value"
            );
        }

        self.state = CalibrationState::Calibrated { threshold };
        self.report = Some(CalibrationReport {
            iterations: count,
            converged,
            thresholds,
            n_normal,
            n_samples: x.nrows(),
        });

        Ok(self)
    }

    /// Inverted scores minus the calibrated threshold; positive means normal
    pub fn decision_function(
        &self,
        x: &Array2<f64>,
        y: Option<&Array1<f64>>,
    ) -> Result<Array1<f64>> {
        let threshold = self.state.threshold().ok_or(OutlierError::NotFitted)?;
        self.inverted_scores(x, y, threshold)
    }

    /// `1` for normal rows, `-1` for anomalous rows
    pub fn predict(&self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array1<i32>> {
        Ok(labels_from_decision(&self.decision_function(x, y)?))
    }

    fn inverted_scores(
        &self,
        x: &Array2<f64>,
        y: Option<&Array1<f64>>,
        offset: f64,
    ) -> Result<Array1<f64>> {
        let raw = self.scorer.anomaly_score(x, y)?;
        if raw.len() != x.nrows() {
            return Err(OutlierError::row_mismatch(
                "anomaly scores for",
                x.nrows(),
                raw.len(),
            ));
        }

        let epsilon = self.config.epsilon;
        Ok(raw.mapv(|r| 1.0 / (r + epsilon) - offset))
    }
}

/// Map decision values to `1` (> 0) or `-1`
pub(crate) fn labels_from_decision(decision: &Array1<f64>) -> Array1<i32> {
    decision.mapv(|d| if d > 0.0 { 1 } else { -1 })
}

fn within_tolerance(old: Option<f64>, new: Option<f64>, tol: f64) -> bool {
    match (old, new) {
        (Some(old), Some(new)) => (new - old).abs() <= tol,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the same score per row on every call, counting fits
    #[derive(Debug)]
    struct FixedScorer {
        scores: Array1<f64>,
        fits: AtomicUsize,
    }

    impl FixedScorer {
        fn new(scores: Array1<f64>) -> Self {
            Self {
                scores,
                fits: AtomicUsize::new(0),
            }
        }
    }

    impl AnomalyScorer for FixedScorer {
        fn fit(&mut self, _x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<()> {
            self.fits.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn anomaly_score(&self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<Array1<f64>> {
            Ok(x.column(0).mapv(|i| self.scores[i as usize]))
        }
    }

    fn row_ids(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 1), |(i, _)| i as f64)
    }

    #[test]
    fn test_single_anomaly_scenario() {
        let x = row_ids(5);
        let scorer = FixedScorer::new(array![1.0, 1.0, 1.0, 1.0, 10.0]);
        let mut calibrator = ThresholdCalibrator::new(scorer, 0.2).unwrap();

        let labels = calibrator.fit(&x, None).unwrap().predict(&x, None).unwrap();
        assert_eq!(labels, array![1, 1, 1, 1, -1]);

        let threshold = calibrator.threshold().unwrap();
        assert!((threshold - 0.82).abs() < 1e-6, "threshold = {}", threshold);

        let report = calibrator.fit_report().unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 2);
        assert_eq!(report.n_normal, 4);
        // one full fit plus one refit per iteration
        assert_eq!(calibrator.scorer().fits.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_decision_function_offsets_inverted_scores() {
        let x = row_ids(5);
        let scorer = FixedScorer::new(array![1.0, 1.0, 1.0, 1.0, 10.0]);
        let mut calibrator = ThresholdCalibrator::new(scorer, 0.2).unwrap();
        calibrator.fit(&x, None).unwrap();

        let threshold = calibrator.threshold().unwrap();
        let decision = calibrator.decision_function(&x, None).unwrap();
        for i in 0..4 {
            assert!((decision[i] - (1.0 / (1.0 + 1e-10) - threshold)).abs() < 1e-12);
        }
        assert!((decision[4] - (1.0 / (10.0 + 1e-10) - threshold)).abs() < 1e-12);
    }

    #[test]
    fn test_not_fitted() {
        let calibrator = ThresholdCalibrator::new(FixedScorer::new(array![1.0]), 0.1).unwrap();
        let x = row_ids(1);
        assert!(matches!(
            calibrator.decision_function(&x, None),
            Err(OutlierError::NotFitted)
        ));
        assert!(matches!(calibrator.predict(&x, None), Err(OutlierError::NotFitted)));
        assert_eq!(calibrator.state(), CalibrationState::Uncalibrated);
    }

    #[test]
    fn test_empty_normal_subset_is_an_error() {
        // All rows tie, so none scores strictly above the percentile
        let x = row_ids(4);
        let scorer = FixedScorer::new(array![2.0, 2.0, 2.0, 2.0]);
        let mut calibrator = ThresholdCalibrator::new(scorer, 0.25).unwrap();

        let err = calibrator.fit(&x, None).unwrap_err();
        assert!(matches!(err, OutlierError::EmptyNormalSubset { iteration: 1 }));
        assert!(calibrator.threshold().is_none());
        assert!(calibrator.fit_report().is_none());
    }

    #[test]
    fn test_failed_refit_discards_previous_calibration() {
        let x = row_ids(5);
        let mut calibrator =
            ThresholdCalibrator::new(FixedScorer::new(array![1.0, 1.0, 1.0, 1.0, 10.0]), 0.2)
                .unwrap();
        calibrator.fit(&x, None).unwrap();
        assert!(calibrator.threshold().is_some());

        let err = calibrator.fit(&Array2::zeros((0, 1)), None).unwrap_err();
        assert!(matches!(err, OutlierError::EmptyInput(_)));
        assert!(calibrator.threshold().is_none());
        assert!(calibrator.fit_report().is_none());

        calibrator.fit(&x, None).unwrap();
        let ties = row_ids(4);
        calibrator.scorer = FixedScorer::new(array![3.0, 3.0, 3.0, 3.0]);
        assert!(calibrator.fit(&ties, None).is_err());
        assert!(calibrator.threshold().is_none());
    }

    #[test]
    fn test_label_length_mismatch() {
        let x = row_ids(3);
        let mut calibrator =
            ThresholdCalibrator::new(FixedScorer::new(array![1.0, 2.0, 3.0]), 0.1).unwrap();
        let err = calibrator.fit(&x, Some(&array![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, OutlierError::ShapeError { .. }));
    }

    #[test]
    fn test_invalid_contamination() {
        assert!(ThresholdCalibrator::new(FixedScorer::new(array![1.0]), 0.0).is_err());
        assert!(ThresholdCalibrator::new(FixedScorer::new(array![1.0]), 1.0).is_err());
    }

    #[test]
    fn test_within_tolerance() {
        assert!(!within_tolerance(None, None, 0.01));
        assert!(!within_tolerance(None, Some(1.0), 0.01));
        assert!(within_tolerance(Some(1.0), Some(1.005), 0.01));
        assert!(!within_tolerance(Some(1.0), Some(1.02), 0.01));
    }

    #[test]
    fn test_labels_from_decision() {
        let labels = labels_from_decision(&array![0.5, 0.0, -0.1, f64::NAN]);
        assert_eq!(labels, array![1, -1, -1, -1]);
    }
}
