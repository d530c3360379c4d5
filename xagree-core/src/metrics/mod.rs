//! Agreement calculators.
//!
//! Every calculator is a pure function of one entity's [`FeatureMatrix`]
//! (see [`crate::matrix`]). Undefined results are `None`; numerically
//! degenerate ones (NaN, infinity) are returned as-is.
//!
//! [`FeatureMatrix`]: crate::matrix::FeatureMatrix

pub mod collinearity;
pub mod concordance;
pub mod correlation;
pub mod overlap;
pub mod sign;

pub use collinearity::variance_inflation;
pub use concordance::{concordance, kendalls_w, rank_descending, rank_matrix};
pub use correlation::{CorrelationSummary, pairwise_correlation, pearson};
pub use overlap::{overlap_at_k, top_k_features};
pub use sign::{SignPolicy, sign_agreement};

/// Round to 4 decimal digits, leaving NaN and infinities untouched.
pub fn round4(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    (value * 10_000.0).round() / 10_000.0
}

/// Arithmetic mean, `None` for an empty slice. NaN entries propagate.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
