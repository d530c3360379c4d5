//! Sign agreement: how often methods agree on attribution direction.

use serde::{Deserialize, Serialize};

use super::round4;
use crate::matrix::FeatureMatrix;

/// How zero attributions take part in sign agreement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignPolicy {
    /// Zero signs are dropped; the feature counts when two or more nonzero
    /// signs remain.
    Lenient,
    /// Any zero sign removes the feature from consideration.
    #[default]
    Strict,
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Fraction of considered features whose signs all match, rounded.
/// `None` when no feature qualifies.
pub fn sign_agreement(matrix: &FeatureMatrix, policy: SignPolicy) -> Option<f64> {
    let mut considered = 0usize;
    let mut agreed = 0usize;

    for j in 0..matrix.feature_count() {
        let signs: Vec<i8> = matrix.values.iter().map(|row| sign(row[j])).collect();
        let signs = match policy {
            SignPolicy::Strict => {
                if signs.contains(&0) {
                    continue;
                }
                signs
            }
            SignPolicy::Lenient => signs.into_iter().filter(|&s| s != 0).collect(),
        };
        if signs.len() < 2 {
            continue;
        }
        considered += 1;
        if signs.iter().all(|&s| s == signs[0]) {
            agreed += 1;
        }
    }

    if considered == 0 {
        return None;
    }
    Some(round4(agreed as f64 / considered as f64))
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
    fn test_all_agree() {
        let m = matrix(vec![vec![1.0, -2.0], vec![0.5, -0.1]]);
        assert_eq!(sign_agreement(&m, SignPolicy::Strict), Some(1.0));
        assert_eq!(sign_agreement(&m, SignPolicy::Lenient), Some(1.0));
    }

    #[test]
    fn test_strict_skips_any_zero() {
        // f0 agrees, f1 has a zero (2 nonzero agree), f2 disagrees
        let m = matrix(vec![
            vec![1.0, 1.0, 1.0],
            vec![2.0, 0.0, -1.0],
            vec![3.0, 4.0, 1.0],
        ]);
        assert_eq!(sign_agreement(&m, SignPolicy::Strict), Some(0.5));
        assert_eq!(sign_agreement(&m, SignPolicy::Lenient), Some(0.6667));
    }

    #[test]
    fn test_lenient_needs_two_nonzero_signs() {
        let m = matrix(vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![0.0, -1.0]]);
        assert_eq!(sign_agreement(&m, SignPolicy::Lenient), None);
        assert_eq!(sign_agreement(&m, SignPolicy::Strict), None);
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&SignPolicy::Lenient).unwrap();
        assert_eq!(json, "\"lenient\"");
    }
}
