//! Linear-interpolation percentile

use crate::error::{OutlierError, Result};

/// Percentile `q` (0..=100) of `values`, interpolating linearly between the
/// two closest ranks.
pub fn percentile<'a, I>(values: I, q: f64) -> Result<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    if !(0.0..=100.0).contains(&q) {
        return Err(OutlierError::InvalidParameter {
            name: "q".to_string(),
            value: q.to_string(),
            reason: "percentile must be within [0, 100]".to_string(),
        });
    }

    let mut sorted: Vec<f64> = values.into_iter().copied().collect();
    if sorted.is_empty() {
        return Err(OutlierError::EmptyInput(
            "percentile of an empty set".to_string(),
        ));
    }
    if sorted.iter().any(|v| v.is_nan()) {
        return Err(OutlierError::ComputationError(
            "percentile input contains NaN".to_string(),
        ));
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    if lo == hi {
        Ok(sorted[lo])
    } else {
        Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
    }
}
