//! Attribution data model and input document parsing.
//!
//! An input document maps entity names (models or patients) to an
//! [`AttributionSet`]: method name -> feature name -> signed attribution.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::AgreementError;

/// Feature name -> signed attribution value for one method.
pub type FeatureScores = BTreeMap<String, f64>;

/// Per-method attribution maps for one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributionSet {
    methods: BTreeMap<String, FeatureScores>,
}

impl AttributionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method<M, I, F>(mut self, method: M, scores: I) -> Self
    where
        M: Into<String>,
        I: IntoIterator<Item = (F, f64)>,
        F: Into<String>,
    {
        self.insert(method, scores);
        self
    }

    pub fn insert<M, I, F>(&mut self, method: M, scores: I)
    where
        M: Into<String>,
        I: IntoIterator<Item = (F, f64)>,
        F: Into<String>,
    {
        let scores = scores.into_iter().map(|(f, v)| (f.into(), v)).collect();
        self.methods.insert(method.into(), scores);
    }

    pub fn scores(&self, method: &str) -> Option<&FeatureScores> {
        self.methods.get(method)
    }

    /// Attribution of `feature` under `method`; absent features count as 0.
    pub fn value(&self, method: &str, feature: &str) -> f64 {
        self.scores(method)
            .and_then(|scores| scores.get(feature))
            .copied()
            .unwrap_or(0.0)
    }

    /// The canonical methods that have a mapping in this set, in canonical order.
    pub fn present_methods<'a>(&self, canonical: &'a [String]) -> Vec<&'a str> {
        canonical
            .iter()
            .filter(|m| self.methods.contains_key(m.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Sorted union of feature names across `methods`.
    pub fn feature_union(&self, methods: &[&str]) -> Vec<String> {
        let mut union = BTreeSet::new();
        for method in methods {
            if let Some(scores) = self.scores(method) {
                union.extend(scores.keys().cloned());
            }
        }
        union.into_iter().collect()
    }

    /// Derived copy of `methods` with every value of magnitude below
    /// `threshold` set to 0. Keys are kept so the feature union is unchanged.
    pub fn thresholded(&self, methods: &[&str], threshold: f64) -> AttributionSet {
        let methods = methods
            .iter()
            .filter_map(|m| self.methods.get(*m).map(|scores| (*m, scores)))
            .map(|(m, scores)| {
                let zeroed = scores
                    .iter()
                    .map(|(f, &v)| (f.clone(), if v.abs() < threshold { 0.0 } else { v }))
                    .collect();
                (m.to_string(), zeroed)
            })
            .collect();
        AttributionSet { methods }
    }
}

/// One input document: entity name -> attribution set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributionDocument {
    pub entities: BTreeMap<String, AttributionSet>,
}

/// Parse a document, keeping only the `canonical` method keys.
///
/// Any structural problem (non-object entity, non-object method map,
/// non-numeric attribution) is fatal for the whole source.
pub fn parse_document(
    source_id: &str,
    text: &str,
    canonical: &[String],
) -> Result<AttributionDocument, AgreementError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| AgreementError::malformed(source_id, format!("invalid JSON: {e}")))?;
    let root = value.as_object().ok_or_else(|| {
        AgreementError::malformed(source_id, "top level must be an object of entities")
    })?;

    let mut entities = BTreeMap::new();
    for (entity, methods_value) in root {
        let methods = methods_value.as_object().ok_or_else(|| {
            AgreementError::malformed(
                source_id,
                format!("entity '{entity}' must map method names to attribution objects"),
            )
        })?;

        let mut set = AttributionSet::new();
        for method in canonical {
            let Some(scores_value) = methods.get(method) else {
                continue;
            };
            let scores = scores_value.as_object().ok_or_else(|| {
                AgreementError::malformed(
                    source_id,
                    format!("entity '{entity}', method '{method}' must be an object of features"),
                )
            })?;
            let mut parsed = FeatureScores::new();
            for (feature, raw) in scores {
                let v = raw.as_f64().ok_or_else(|| {
                    AgreementError::malformed(
                        source_id,
                        format!(
                            "entity '{entity}', method '{method}', feature '{feature}': expected a number, got {raw}"
                        ),
                    )
                })?;
                parsed.insert(feature.clone(), v);
            }
            set.methods.insert(method.clone(), parsed);
        }
        entities.insert(entity.clone(), set);
    }

    Ok(AttributionDocument { entities })
}
