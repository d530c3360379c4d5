//! Feature matrix builder.
//!
//! Turns one entity's [`AttributionSet`] into aligned method x feature value
//! matrices over a deterministically sorted feature universe.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attribution::AttributionSet;
use crate::config::SelectionConfig;

/// How the feature universe is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPolicy {
    /// Union of all present methods' features.
    All,
    /// Features nonzero in every present method.
    #[default]
    ZeroFiltered,
    /// Values below the threshold are zeroed first, then zero-filtered.
    ThresholdCommon,
}

/// Which feature ordering a calculator reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureScope {
    /// The selected feature universe.
    #[default]
    Filtered,
    /// The sorted union of all features (after any thresholding).
    Union,
}

/// Why an entity produced no report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooFewMethods { present: usize },
    EmptyUniverse,
    TooFewCommonFeatures { count: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewMethods { present } => {
                write!(f, "only {present} method(s) present")
            }
            Self::EmptyUniverse => write!(f, "empty feature universe"),
            Self::TooFewCommonFeatures { count } => {
                write!(f, "only {count} common feature(s) above threshold")
            }
        }
    }
}

impl SkipReason {
    /// Stable key used when counting skips in the run summary.
    pub fn key(&self) -> &'static str {
        match self {
            Self::TooFewMethods { .. } => "too_few_methods",
            Self::EmptyUniverse => "empty_universe",
            Self::TooFewCommonFeatures { .. } => "too_few_common_features",
        }
    }
}

/// Method x feature values, rows in canonical method order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub methods: Vec<String>,
    pub features: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Align each method's scores to `features`, missing entries as 0.
    pub fn aligned(set: &AttributionSet, methods: &[&str], features: Vec<String>) -> Self {
        let values = methods
            .iter()
            .map(|m| features.iter().map(|f| set.value(m, f)).collect())
            .collect();
        Self {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            features,
            values,
        }
    }

    pub fn row(&self, method: &str) -> Option<&[f64]> {
        self.methods
            .iter()
            .position(|m| m == method)
            .map(|i| self.values[i].as_slice())
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}

/// Everything the calculators need for one entity.
#[derive(Debug, Clone)]
pub struct EntityMatrices {
    /// Values over the selected feature universe.
    pub filtered: FeatureMatrix,
    /// Values over the sorted union of features.
    pub union: FeatureMatrix,
}

impl EntityMatrices {
    pub fn scoped(&self, scope: FeatureScope) -> &FeatureMatrix {
        match scope {
            FeatureScope::Filtered => &self.filtered,
            FeatureScope::Union => &self.union,
        }
    }

    pub fn universe(&self) -> &[String] {
        &self.filtered.features
    }
}

/// Features of `union` that are nonzero under every method.
pub fn nonzero_everywhere(set: &AttributionSet, methods: &[&str], union: &[String]) -> Vec<String> {
    union
        .iter()
        .filter(|f| methods.iter().all(|m| set.value(m, f) != 0.0))
        .cloned()
        .collect()
}

/// Build the aligned matrices for one entity, or say why it must be skipped.
pub fn build_matrices(
    set: &AttributionSet,
    canonical: &[String],
    selection: &SelectionConfig,
) -> Result<EntityMatrices, SkipReason> {
    let methods = set.present_methods(canonical);
    if methods.len() < 2 {
        return Err(SkipReason::TooFewMethods {
            present: methods.len(),
        });
    }

    let derived = match selection.policy {
        FilterPolicy::ThresholdCommon => set.thresholded(&methods, selection.threshold),
        // a zero threshold keeps every value, only dropping non-canonical methods
        FilterPolicy::All | FilterPolicy::ZeroFiltered => set.thresholded(&methods, 0.0),
    };

    let union = derived.feature_union(&methods);
    if union.is_empty() {
        return Err(SkipReason::EmptyUniverse);
    }

    let universe = match selection.policy {
        FilterPolicy::All => union.clone(),
        FilterPolicy::ZeroFiltered | FilterPolicy::ThresholdCommon => {
            nonzero_everywhere(&derived, &methods, &union)
        }
    };
    if universe.is_empty() {
        return Err(SkipReason::EmptyUniverse);
    }
    if selection.policy == FilterPolicy::ThresholdCommon && universe.len() < 2 {
        return Err(SkipReason::TooFewCommonFeatures {
            count: universe.len(),
        });
    }

    let filtered = FeatureMatrix::aligned(&derived, &methods, universe);
    let union = FeatureMatrix::aligned(&derived, &methods, union);
    Ok(EntityMatrices {
        filtered,
        union,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical() -> Vec<String> {
        vec!["SHAP".into(), "Lime".into(), "Inherent".into()]
    }

    fn selection(policy: FilterPolicy) -> SelectionConfig {
        SelectionConfig {
            policy,
            threshold: 1.0,
        }
    }

    fn model_a() -> AttributionSet {
        AttributionSet::new()
            .with_method("SHAP", [("f1", 2.0), ("f2", -1.0), ("f3", 0.0)])
            .with_method("Lime", [("f1", 1.0), ("f2", -2.0), ("f3", 0.5)])
            .with_method("Inherent", [("f1", 3.0), ("f2", 0.0), ("f3", 0.1)])
    }

    #[test]
    fn test_zero_filtered_universe() {
        let m = build_matrices(&model_a(), &canonical(), &selection(FilterPolicy::ZeroFiltered))
            .unwrap();
        assert_eq!(m.universe(), &["f1".to_string()]);
        assert_eq!(m.filtered.values, vec![vec![2.0], vec![1.0], vec![3.0]]);
        assert_eq!(m.union.features, vec!["f1", "f2", "f3"]);
    }

    #[test]
    fn test_all_policy_uses_union_with_zero_fill() {
        let set = AttributionSet::new()
            .with_method("SHAP", [("b", 1.0), ("a", 2.0)])
            .with_method("Lime", [("c", 3.0)]);
        let m = build_matrices(&set, &canonical(), &selection(FilterPolicy::All)).unwrap();
        assert_eq!(m.universe(), &["a", "b", "c"]);
        assert_eq!(m.filtered.row("SHAP").unwrap(), &[2.0, 1.0, 0.0]);
        assert_eq!(m.filtered.row("Lime").unwrap(), &[0.0, 0.0, 3.0]);
        assert!(m.filtered.row("Inherent").is_none());
    }

    #[test]
    fn test_threshold_common_zeroes_small_values() {
        let set = AttributionSet::new()
            .with_method("SHAP", [("a", 2.0), ("b", 0.4), ("c", -3.0)])
            .with_method("Lime", [("a", 1.5), ("b", 5.0), ("c", -1.0)]);
        let m = build_matrices(&set, &canonical(), &selection(FilterPolicy::ThresholdCommon))
            .unwrap();
        assert_eq!(m.universe(), &["a", "c"]);
        // b survives in the union but reads as zero for SHAP
        assert_eq!(m.union.row("SHAP").unwrap(), &[2.0, 0.0, -3.0]);
        assert_eq!(set.value("SHAP", "b"), 0.4);
    }

    #[test]
    fn test_threshold_common_needs_two_features() {
        let set = AttributionSet::new()
            .with_method("SHAP", [("a", 2.0), ("b", 0.4)])
            .with_method("Lime", [("a", 1.5), ("b", 5.0)]);
        let err = build_matrices(&set, &canonical(), &selection(FilterPolicy::ThresholdCommon))
            .unwrap_err();
        assert_eq!(err, SkipReason::TooFewCommonFeatures { count: 1 });
    }

    #[test]
    fn test_single_method_is_skipped() {
        let set = AttributionSet::new().with_method("SHAP", [("a", 1.0)]);
        let err = build_matrices(&set, &canonical(), &selection(FilterPolicy::All)).unwrap_err();
        assert_eq!(err, SkipReason::TooFewMethods { present: 1 });
    }

    #[test]
    fn test_no_common_nonzero_feature_is_skipped() {
        let set = AttributionSet::new()
            .with_method("SHAP", [("a", 1.0), ("b", 0.0)])
            .with_method("Lime", [("a", 0.0), ("b", 1.0)]);
        let err = build_matrices(&set, &canonical(), &selection(FilterPolicy::ZeroFiltered))
            .unwrap_err();
        assert_eq!(err, SkipReason::EmptyUniverse);
    }

    #[test]
    fn test_empty_maps_are_skipped() {
        let set = AttributionSet::new()
            .with_method("SHAP", Vec::<(String, f64)>::new())
            .with_method("Lime", Vec::<(String, f64)>::new());
        let err = build_matrices(&set, &canonical(), &selection(FilterPolicy::All)).unwrap_err();
        assert_eq!(err, SkipReason::EmptyUniverse);
    }
}
