//! Rank concordance across methods (Kendall's coefficient of concordance W).

use std::cmp::Ordering;

use super::round4;
use crate::matrix::FeatureMatrix;

/// Rank `values` by raw (signed) value, descending: rank 1 is the largest.
///
/// Ties take sequential ranks in input order rather than averaged midranks.
pub fn rank_descending(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0; values.len()];
    for (position, &index) in order.iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

/// One rank row per method.
pub fn rank_matrix(matrix: &FeatureMatrix) -> Vec<Vec<usize>> {
    matrix.values.iter().map(|row| rank_descending(row)).collect()
}

/// Kendall's W for `k` raters (rows) over `n` items (columns).
///
/// W = 12·S / (k²·(n³ − n)), where S is the sum of squared deviations of the
/// per-item rank sums from their mean. Returns `None` when `k < 2` or `n < 2`.
/// The result is not clamped to [0, 1].
pub fn kendalls_w(ranks: &[Vec<usize>]) -> Option<f64> {
    let k = ranks.len();
    let n = ranks.first().map_or(0, Vec::len);
    if k < 2 || n < 2 || ranks.iter().any(|row| row.len() != n) {
        return None;
    }

    let sums: Vec<f64> = (0..n)
        .map(|j| ranks.iter().map(|row| row[j] as f64).sum())
        .collect();
    let mean = sums.iter().sum::<f64>() / n as f64;
    let s: f64 = sums.iter().map(|r| (r - mean).powi(2)).sum();

    let kf = k as f64;
    let nf = n as f64;
    Some(12.0 * s / (kf * kf * (nf.powi(3) - nf)))
}

/// Rounded concordance of the methods' rankings over `matrix`.
pub fn concordance(matrix: &FeatureMatrix) -> Option<f64> {
    kendalls_w(&rank_matrix(matrix)).map(round4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(values: Vec<Vec<f64>>) -> FeatureMatrix {
        let n = values.first().map_or(0, Vec::len);
        FeatureMatrix {
            methods: (0..values.len()).map(|i| format!("m{i}")).collect(),
            features: (0..n).map(|j| format!("f{j}")).collect(),
            values,
        }
    }

    #[test]
    fn test_rank_uses_signed_value() {
        assert_eq!(rank_descending(&[0.5, -3.0, 2.0]), vec![2, 3, 1]);
    }

    #[test]
    fn test_rank_ties_are_sequential() {
        assert_eq!(rank_descending(&[1.0, 1.0, 1.0]), vec![1, 2, 3]);
        assert_eq!(rank_descending(&[0.0, 2.0, 0.0]), vec![2, 1, 3]);
    }

    #[test]
    fn test_perfect_agreement() {
        let m = matrix(vec![vec![3.0, 2.0, 1.0], vec![30.0, 20.0, 10.0]]);
        assert_eq!(concordance(&m), Some(1.0));
    }

    #[test]
    fn test_reversed_rankings() {
        let m = matrix(vec![vec![3.0, 2.0, 1.0], vec![1.0, 2.0, 3.0]]);
        assert_eq!(concordance(&m), Some(0.0));
    }

    #[test]
    fn test_three_raters() {
        // ranks: [1,2,3], [1,3,2], [2,1,3] -> sums 4, 6, 8 -> S = 8
        let ranks = vec![vec![1, 2, 3], vec![1, 3, 2], vec![2, 1, 3]];
        let w = kendalls_w(&ranks).unwrap();
        assert!((w - 96.0 / 216.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_feature_is_undefined() {
        let m = matrix(vec![vec![2.0], vec![1.0], vec![3.0]]);
        assert_eq!(concordance(&m), None);
    }

    #[test]
    fn test_single_rater_is_undefined() {
        assert_eq!(kendalls_w(&[vec![1, 2, 3]]), None);
    }
}
