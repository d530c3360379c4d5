//! Variance-inflation diagnostic across features.
//!
//! Orientation is transposed from the usual setup: each feature is a variable
//! (column) and each method is an observation (row). With two or three methods
//! the regressions are heavily underdetermined and large or infinite values
//! are expected; they are returned as computed.

use std::cmp::Ordering;

use crate::matrix::FeatureMatrix;

/// Relative norm below which an orthogonalized regressor is treated as
/// linearly dependent on the ones before it.
const RANK_TOLERANCE: f64 = 1e-10;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

fn subtract_projection(v: &mut [f64], unit: &[f64]) {
    let p = dot(unit, v);
    for (x, q) in v.iter_mut().zip(unit) {
        *x -= p * q;
    }
}

/// Residual sum of squares of the least-squares fit of `y` on `regressors`
/// (no intercept, minimum-norm solution when the design is rank deficient).
fn residual_sum_of_squares(y: &[f64], regressors: &[&[f64]]) -> f64 {
    let mut basis: Vec<Vec<f64>> = Vec::new();
    for column in regressors {
        let original = norm(column);
        if original == 0.0 {
            continue;
        }
        let mut v = column.to_vec();
        for q in &basis {
            subtract_projection(&mut v, q);
        }
        let remaining = norm(&v);
        if remaining <= RANK_TOLERANCE * original {
            continue;
        }
        v.iter_mut().for_each(|x| *x /= remaining);
        basis.push(v);
        if basis.len() == y.len() {
            // regressors span every observation: exact fit
            return 0.0;
        }
    }

    let mut residual = y.to_vec();
    for q in &basis {
        subtract_projection(&mut residual, q);
    }
    dot(&residual, &residual)
}

/// `1 / (1 − R²)` for `y` regressed on `regressors`, with uncentered R².
fn inflation_factor(y: &[f64], regressors: &[&[f64]]) -> f64 {
    let total = dot(y, y);
    let r_squared = 1.0 - residual_sum_of_squares(y, regressors) / total;
    1.0 / (1.0 - r_squared)
}

/// Diagnostic per feature, sorted descending by value.
///
/// Only features nonzero under every method take part; features with the
/// same value under every method are dropped. Needs two or more surviving
/// features, else `None`.
pub fn variance_inflation(matrix: &FeatureMatrix) -> Option<Vec<(String, f64)>> {
    let columns: Vec<(&str, Vec<f64>)> = matrix
        .features
        .iter()
        .enumerate()
        .filter_map(|(j, feature)| {
            let column: Vec<f64> = matrix.values.iter().map(|row| row[j]).collect();
            let nonzero = column.iter().all(|&v| v != 0.0);
            let varies = column.iter().any(|&v| v != column[0]);
            (nonzero && varies).then_some((feature.as_str(), column))
        })
        .collect();

    if columns.len() < 2 {
        return None;
    }

    let mut factors: Vec<(String, f64)> = columns
        .iter()
        .enumerate()
        .map(|(i, (feature, y))| {
            let others: Vec<&[f64]> = columns
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, (_, column))| column.as_slice())
                .collect();
            (feature.to_string(), inflation_factor(y, &others))
        })
        .collect();

    factors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    Some(factors)
}
