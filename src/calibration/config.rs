//! Calibrator configuration

use crate::error::{OutlierError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for threshold calibration
///
/// Deserialization goes through [`CalibratorConfig::validate`], so a config
/// read back from JSON (alone or inside a saved calibrator) is always usable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedConfig")]
pub struct CalibratorConfig {
    /// Assumed fraction of anomalous rows in the training data, in (0, 1)
    pub contamination: f64,

    /// Maximum number of refit iterations
    pub max_iter: usize,

    /// Convergence tolerance between successive thresholds
    pub tol: f64,

    /// Offset added to raw scores before inversion
    pub epsilon: f64,
}

/// Wire form of [`CalibratorConfig`] before validation
#[derive(Deserialize)]
struct UncheckedConfig {
    contamination: f64,
    max_iter: usize,
    tol: f64,
    epsilon: f64,
}

impl TryFrom<UncheckedConfig> for CalibratorConfig {
    type Error = OutlierError;

    fn try_from(raw: UncheckedConfig) -> Result<Self> {
        let config = Self {
            contamination: raw.contamination,
            max_iter: raw.max_iter,
            tol: raw.tol,
            epsilon: raw.epsilon,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            contamination: 0.01,
            max_iter: 100,
            tol: 0.01,
            epsilon: 1e-10,
        }
    }
}

impl CalibratorConfig {
    /// Create a configuration for the given contamination, other fields default
    pub fn new(contamination: f64) -> Self {
        Self {
            contamination,
            ..Self::default()
        }
    }

    /// Builder method to set the iteration cap
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Builder method to set the convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Builder method to set the inversion epsilon
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Check every field is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(invalid(
                "contamination",
                self.contamination,
                "must lie strictly between 0 and 1",
            ));
        }
        if self.max_iter == 0 {
            return Err(invalid("max_iter", self.max_iter, "must be at least 1"));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(invalid("tol", self.tol, "must be finite and non-negative"));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(invalid(
                "epsilon",
                self.epsilon,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: UncheckedConfig = serde_json::from_str(json)?;
        Self::try_from(raw)
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> OutlierError {
    OutlierError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
