//! Pairwise Pearson correlation between method score vectors.

use std::collections::BTreeMap;

use super::{mean, round4};
use crate::matrix::FeatureMatrix;

/// Pearson's r. NaN when either vector has zero variance or lengths differ.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n == 0 || n != y.len() {
        return f64::NAN;
    }
    let x_mean = x.iter().sum::<f64>() / n as f64;
    let y_mean = y.iter().sum::<f64>() / n as f64;

    let mut cov_sum = 0.0;
    let mut x_var_sum = 0.0;
    let mut y_var_sum = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let x_diff = xi - x_mean;
        let y_diff = yi - y_mean;
        cov_sum += x_diff * y_diff;
        x_var_sum += x_diff * x_diff;
        y_var_sum += y_diff * y_diff;
    }

    // 0/0 yields NaN for degenerate input
    cov_sum / (x_var_sum * y_var_sum).sqrt()
}

/// Per-pair coefficients and their mean.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationSummary {
    /// Rounded mean over computed pairs; `None` when no pair was computable.
    pub mean: Option<f64>,
    /// `"<a>_vs_<b>"` -> rounded coefficient.
    pub pairs: BTreeMap<String, f64>,
}

/// Correlate every pair with both methods present over at least two features.
pub fn pairwise_correlation(matrix: &FeatureMatrix, pairs: &[(String, String)]) -> CorrelationSummary {
    let mut coefficients = Vec::new();
    let mut by_pair = BTreeMap::new();

    for (a, b) in pairs {
        let (Some(x), Some(y)) = (matrix.row(a), matrix.row(b)) else {
            continue;
        };
        if x.len() < 2 {
            continue;
        }
        let r = pearson(x, y);
        coefficients.push(r);
        by_pair.insert(format!("{a}_vs_{b}"), round4(r));
    }

    CorrelationSummary {
        mean: mean(&coefficients).map(round4),
        pairs: by_pair,
    }
}
