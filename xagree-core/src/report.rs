//! Agreement reports and the run summary.
//!
//! Reports are serialized by hand so that metrics which were not configured
//! are omitted, undefined metrics are `null`, and degenerate values (NaN,
//! infinities) are written as the strings `"NaN"`, `"Infinity"` and
//! `"-Infinity"` instead of being coerced.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::matrix::SkipReason;

/// Outcome of one configurable metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Metric<T> {
    /// Not configured for this run; omitted from the report.
    #[default]
    NotRun,
    /// Configured but not computable from the data; written as `null`.
    Undefined,
    Value(T),
}

impl<T> Metric<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::Undefined,
        }
    }

    pub fn is_run(&self) -> bool {
        !matches!(self, Self::NotRun)
    }
}

/// A float that keeps non-finite values visible in JSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score(pub f64);

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_nan() {
            serializer.serialize_str("NaN")
        } else if v == f64::INFINITY {
            serializer.serialize_str("Infinity")
        } else if v == f64::NEG_INFINITY {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(v)
        }
    }
}

/// Ordered feature -> diagnostic pairs, written as a JSON object in order.
struct OrderedScores<'a>(&'a [(String, f64)]);

impl Serialize for OrderedScores<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (feature, value) in self.0 {
            map.serialize_entry(feature, &Score(*value))?;
        }
        map.end()
    }
}

/// Per-entity agreement scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgreementReport {
    /// Kendall's W over the feature universe.
    pub concordance: Option<f64>,
    /// The k used by `overlap`; part of the serialized key.
    pub top_k: usize,
    pub overlap: Metric<f64>,
    pub sign_agreement: Metric<f64>,
    pub pairwise_correlation: Metric<f64>,
    /// `"<a>_vs_<b>"` -> coefficient, for every pair that was computed.
    pub correlation_pairs: BTreeMap<String, f64>,
    /// Feature -> diagnostic, descending.
    pub collinearity: Metric<Vec<(String, f64)>>,
}

impl AgreementReport {
    pub fn overlap_key(&self) -> String {
        format!("overlap_at_{}", self.top_k)
    }
}

fn serialize_scalar<M: SerializeMap>(
    map: &mut M,
    key: &str,
    metric: &Metric<f64>,
) -> Result<(), M::Error> {
    match metric {
        Metric::NotRun => Ok(()),
        Metric::Undefined => map.serialize_entry(key, &Option::<Score>::None),
        Metric::Value(v) => map.serialize_entry(key, &Score(*v)),
    }
}

impl Serialize for AgreementReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("concordance", &self.concordance.map(Score))?;
        serialize_scalar(&mut map, &self.overlap_key(), &self.overlap)?;
        serialize_scalar(&mut map, "sign_agreement", &self.sign_agreement)?;
        serialize_scalar(&mut map, "pairwise_correlation", &self.pairwise_correlation)?;
        if self.pairwise_correlation.is_run() && !self.correlation_pairs.is_empty() {
            let pairs: BTreeMap<&str, Score> = self
                .correlation_pairs
                .iter()
                .map(|(k, v)| (k.as_str(), Score(*v)))
                .collect();
            map.serialize_entry("correlation_pairs", &pairs)?;
        }
        match &self.collinearity {
            Metric::NotRun => {}
            Metric::Undefined => map.serialize_entry("collinearity", &Option::<Score>::None)?,
            Metric::Value(factors) => {
                map.serialize_entry("collinearity", &OrderedScores(factors))?
            }
        }
        map.end()
    }
}

/// Entity name -> report, for one input source.
pub type SourceReports = BTreeMap<String, AgreementReport>;

/// Source identifier -> entity reports: the artifact written per run.
pub type AgreementDocument = BTreeMap<String, SourceReports>;

/// A source that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSource {
    pub source_id: String,
    pub error: String,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub sources_processed: usize,
    pub sources_failed: Vec<FailedSource>,
    pub entities_reported: usize,
    pub entities_skipped: usize,
    /// Skip reason key -> count.
    pub skipped_by_reason: BTreeMap<String, usize>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            generated_at: Utc::now(),
            sources_processed: 0,
            sources_failed: Vec::new(),
            entities_reported: 0,
            entities_skipped: 0,
            skipped_by_reason: BTreeMap::new(),
        }
    }
}

impl RunSummary {
    pub fn record_skip(&mut self, reason: &SkipReason) {
        self.entities_skipped += 1;
        *self
            .skipped_by_reason
            .entry(reason.key().to_string())
            .or_default() += 1;
    }

    pub fn has_failures(&self) -> bool {
        !self.sources_failed.is_empty()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} source(s) processed, {} failed; {} entities reported, {} skipped",
            self.sources_processed,
            self.sources_failed.len(),
            self.entities_reported,
            self.entities_skipped
        )
    }
}
