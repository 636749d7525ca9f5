//! stats.rs
//!
//! Column statistics used for composing scores: percentile ranks,
//! standardization and quantiles.

use std::cmp::Ordering;

use itertools::Itertools;
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker, Statistics};

fn cmp_f64(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Percentile rank of each value (ascending), ties receiving their average
/// rank, divided by the number of values. Returns values in (0, 1] in input order.
pub fn rank_pct(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    Data::new(values.to_vec())
        .ranks(RankTieBreaker::Average)
        .into_iter()
        .map(|rank| rank / n)
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}

/// Sample standard deviation (n - 1 degrees of freedom).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        None
    } else {
        Some(values.iter().std_dev())
    }
}

/// Standardize values by subtracting the mean and dividing by the sample
/// standard deviation. Undefined (`None`) for constant or single-valued input.
pub fn zscores(values: &[f64]) -> Vec<Option<f64>> {
    match (mean(values), sample_std(values)) {
        (Some(mean), Some(std)) if std > 0.0 => {
            values.iter().map(|v| Some((v - mean) / std)).collect()
        }
        _ => vec![None; values.len()],
    }
}

/// Quantile with linear interpolation between the closest order statistics.
///
/// Unlike `OrderStatistics::quantile`, which implements the R-8 estimator,
/// this is the estimator the score cutoff is defined with.
///
/// # Arguments
/// * `values` - observations, in any order
/// * `q` - requested quantile in [0, 1]
///
/// # Returns
/// `None` if there are no observations.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = values.iter().copied().sorted_by(cmp_f64).collect_vec();
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_pct_ties() {
        let ranks = rank_pct(&[1.0, 0.4, 0.4, 0.2]);
        assert_relative_eq!(ranks[0], 1.0);
        assert_relative_eq!(ranks[1], 0.625);
        assert_relative_eq!(ranks[2], 0.625);
        assert_relative_eq!(ranks[3], 0.25);
    }

    #[test]
    fn test_rank_pct_empty() {
        assert!(rank_pct(&[]).is_empty());
    }

    #[test]
    fn test_sample_std() {
        assert_relative_eq!(sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap(), 2.138089935, epsilon = 1e-8);
        assert!(sample_std(&[1.0]).is_none());
    }

    #[test]
    fn test_zscores_constant() {
        assert_eq!(zscores(&[3.0, 3.0]), vec![None, None]);
        let z = zscores(&[1.0, 3.0]);
        assert_relative_eq!(z[0].unwrap(), -std::f64::consts::FRAC_1_SQRT_2);
        assert_relative_eq!(z[1].unwrap(), std::f64::consts::FRAC_1_SQRT_2);
    }

    #[test]
    fn test_quantile() {
        let values = [9.0, 1.0, 5.0, 3.0];
        // position 0.95 * 3 = 2.85 between 5 and 9
        assert_relative_eq!(quantile(&values, 0.95).unwrap(), 8.4);
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 9.0);
        assert!(quantile(&[], 0.5).is_none());
    }
}
