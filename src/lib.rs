//! Outlier Threshold - contamination-calibrated outlier classification
//!
//! This crate adapts an anomaly scorer to a classifier-shaped interface
//! (`fit` / `decision_function` / `predict`) by calibrating a decision
//! threshold against an assumed contamination fraction.
//!
//! # Modules
//!
//! - [`scorer`] - Anomaly scorer contract and a Gaussian reference scorer
//! - [`calibration`] - Self-training threshold calibration
//! - [`detector`] - Classifier-style detector trait and detection results
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use outlier_threshold::prelude::*;
//!
//! let x = array![[0.0], [0.1], [0.2], [0.1], [0.0], [0.2], [0.1], [9.0]];
//! let mut calibrator = ThresholdCalibrator::new(GaussianScorer::new(), 0.1)?;
//! let labels = calibrator.fit(&x, None)?.predict(&x, None)?;
//! assert_eq!(labels[7], -1);
//! # Ok::<(), outlier_threshold::OutlierError>(())
//! ```

pub mod error;

pub mod calibration;
pub mod detector;
pub mod scorer;

pub use error::{OutlierError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{OutlierError, Result};

    pub use crate::scorer::{AnomalyScorer, GaussianScorer};

    pub use crate::calibration::{
        CalibrationReport, CalibrationState, CalibratorConfig, ThresholdCalibrator,
    };

    pub use crate::detector::{DetectionResult, OutlierDetector};
}
