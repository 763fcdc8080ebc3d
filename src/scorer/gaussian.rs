//! Gaussian density scorer

use crate::error::{OutlierError, Result};
use crate::scorer::{check_labels, AnomalyScorer};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Fitted statistics for one label group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupStats {
    /// Group label, `None` when fitted without labels
    pub label: Option<f64>,
    /// Mean per feature
    pub means: Array1<f64>,
    /// Variance per feature (floored)
    pub variances: Array1<f64>,
    /// Number of rows the group was fitted on
    pub n_samples: usize,
}

impl GroupStats {
    fn fit(label: Option<f64>, x: &Array2<f64>, min_variance: f64) -> Result<Self> {
        let means = x.mean_axis(Axis(0)).ok_or_else(|| {
            OutlierError::EmptyInput("cannot fit a Gaussian group on zero rows".to_string())
        })?;
        let variances = x.var_axis(Axis(0), 0.0).mapv(|v| v.max(min_variance));

        Ok(Self {
            label,
            means,
            variances,
            n_samples: x.nrows(),
        })
    }

    /// One plus half the mean squared z-score of a row
    fn score_row(&self, row: ndarray::ArrayView1<f64>) -> f64 {
        let n_features = row.len().max(1) as f64;
        let sq_z: f64 = row
            .iter()
            .zip(self.means.iter().zip(self.variances.iter()))
            .map(|(&v, (&m, &var))| (v - m).powi(2) / var)
            .sum();
        1.0 + 0.5 * sq_z / n_features
    }
}

/// Independent per-feature Gaussian scorer.
///
/// Fitted without labels it models all rows with a single Gaussian. Fitted
/// with labels it keeps one Gaussian per distinct label value, and scoring
/// with labels looks up the matching group. Scores are `>= 1`, growing with
/// the distance from the group mean.
///
/// A grouped refit on a subset that lacks some previously fitted label keeps
/// that label's earlier statistics, so rows of the label stay scorable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianScorer {
    /// Lower bound on per-feature variance
    min_variance: f64,
    /// Fitted groups
    groups: Option<Vec<GroupStats>>,
    /// Number of features seen at fit time
    n_features: Option<usize>,
}

impl GaussianScorer {
    /// Create new Gaussian scorer
    pub fn new() -> Self {
        Self {
            min_variance: 1e-9,
            groups: None,
            n_features: None,
        }
    }

    /// Set the variance floor
    pub fn with_min_variance(mut self, v: f64) -> Self {
        self.min_variance = v.abs().max(f64::MIN_POSITIVE);
        self
    }

    /// Fitted groups, if any
    pub fn groups(&self) -> Option<&[GroupStats]> {
        self.groups.as_deref()
    }

    fn is_grouped(&self) -> bool {
        self.groups
            .as_ref()
            .map(|g| g.iter().any(|s| s.label.is_some()))
            .unwrap_or(false)
    }

    /// Add previously fitted groups whose labels are missing from `groups`
    fn carry_forward_groups(
        &self,
        mut groups: Vec<GroupStats>,
        n_features: usize,
    ) -> Vec<GroupStats> {
        let grouped_now = groups.iter().any(|s| s.label.is_some());
        if !grouped_now || !self.is_grouped() || self.n_features != Some(n_features) {
            return groups;
        }

        let previous = self.groups.as_deref().unwrap_or(&[]);
        let missing: Vec<GroupStats> = previous
            .iter()
            .filter(|old| !groups.iter().any(|s| s.label == old.label))
            .cloned()
            .collect();
        if missing.is_empty() {
            return groups;
        }

        groups.extend(missing);
        groups.sort_by(|a, b| {
            a.label
                .unwrap_or(f64::NAN)
                .total_cmp(&b.label.unwrap_or(f64::NAN))
        });
        groups
    }

    fn distinct_labels(y: &Array1<f64>) -> Result<Vec<f64>> {
        let mut labels: Vec<f64> = Vec::new();
        for &v in y.iter() {
            if !v.is_finite() {
                return Err(OutlierError::InvalidInput(format!(
                    "group labels must be finite, got {}",
                    v
                )));
            }
            if !labels.contains(&v) {
                labels.push(v);
            }
        }
        labels.sort_by(|a, b| a.total_cmp(b));
        Ok(labels)
    }
}

impl Default for GaussianScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyScorer for GaussianScorer {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(OutlierError::EmptyInput(
                "cannot fit a Gaussian scorer on zero rows".to_string(),
            ));
        }
        check_labels(x, y)?;

        let groups = match y {
            None => vec![GroupStats::fit(None, x, self.min_variance)?],
            Some(labels) => Self::distinct_labels(labels)?
                .into_iter()
                .map(|label| {
                    let indices: Vec<usize> = labels
                        .iter()
                        .enumerate()
                        .filter(|(_, v)| **v == label)
                        .map(|(i, _)| i)
                        .collect();
                    let rows = x.select(Axis(0), &indices);
                    GroupStats::fit(Some(label), &rows, self.min_variance)
                })
                .collect::<Result<Vec<_>>>()?,
        };
        let groups = self.carry_forward_groups(groups, x.ncols());

        self.groups = Some(groups);
        self.n_features = Some(x.ncols());

        Ok(())
    }

    fn anomaly_score(&self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array1<f64>> {
        let groups = self.groups.as_ref().ok_or(OutlierError::NotFitted)?;
        let n_features = self.n_features.unwrap_or(0);

        if x.ncols() != n_features {
            return Err(OutlierError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        check_labels(x, y)?;

        match (y, self.is_grouped()) {
            (None, false) => {
                let stats = &groups[0];
                Ok(x.rows().into_iter().map(|row| stats.score_row(row)).collect())
            }
            (Some(labels), true) => x
                .rows()
                .into_iter()
                .zip(labels.iter())
                .map(|(row, &label)| {
                    groups
                        .iter()
                        .find(|s| s.label == Some(label))
                        .map(|s| s.score_row(row))
                        .ok_or_else(|| OutlierError::UnknownGroup(label.to_string()))
                })
                .collect::<Result<Vec<f64>>>()
                .map(Array1::from_vec),
            (None, true) => Err(OutlierError::InvalidInput(
                "scorer was fitted with group labels; labels are required for scoring"
                    .to_string(),
            )),
            (Some(_), false) => Err(OutlierError::InvalidInput(
                "scorer was fitted without group labels; scoring cannot take labels".to_string(),
            )),
        }
    }
}
