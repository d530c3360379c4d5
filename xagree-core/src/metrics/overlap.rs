//! Top-k overlap between method pairs.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::{mean, round4};
use crate::matrix::FeatureMatrix;

/// The `k` features with the largest absolute attribution.
///
/// Ties keep `features` order. With fewer than `k` features all are returned.
pub fn top_k_features<'a>(scores: &[f64], features: &'a [String], k: usize) -> BTreeSet<&'a str> {
    let mut ranked: Vec<(&str, f64)> = features
        .iter()
        .map(String::as_str)
        .zip(scores.iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(Ordering::Equal));
    ranked.into_iter().take(k).map(|(f, _)| f).collect()
}

/// Mean of `|top_k(a) ∩ top_k(b)| / k` over every pair with both methods present.
///
/// The denominator is always `k`, even when fewer than `k` features exist.
pub fn overlap_at_k(matrix: &FeatureMatrix, pairs: &[(String, String)], k: usize) -> Option<f64> {
    if k == 0 {
        return None;
    }
    let mut scores = Vec::new();
    for (a, b) in pairs {
        let (Some(row_a), Some(row_b)) = (matrix.row(a), matrix.row(b)) else {
            continue;
        };
        let top_a = top_k_features(row_a, &matrix.features, k);
        let top_b = top_k_features(row_b, &matrix.features, k);

        let shared = top_a.intersection(&top_b).count();
        tracing::debug!(
            pair = %format!("{a}/{b}"),
            shared,
            only_first = ?top_a.difference(&top_b).collect::<Vec<_>>(),
            only_second = ?top_b.difference(&top_a).collect::<Vec<_>>(),
            "top-{k} overlap"
        );
        scores.push(shared as f64 / k as f64);
    }
    mean(&scores).map(round4)
}
