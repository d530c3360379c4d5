//! # xagree-core
//!
//! Agreement between feature-attribution methods.
//!
//! Given per-entity, per-method feature attributions (for example SHAP, LIME
//! and a model's inherent importances), this crate measures how consistently
//! the methods rank and score features:
//!
//! - rank concordance (Kendall's W),
//! - top-k overlap,
//! - sign agreement,
//! - pairwise Pearson correlation,
//! - a variance-inflation collinearity diagnostic.
//!
//! The calculators in [`metrics`] are pure functions over the aligned matrices
//! built by [`matrix`]. [`driver`] applies them per entity and merges the
//! results into one report per run.

// Foundation
pub mod config;
pub mod error;

// Data model
pub mod attribution;
pub mod matrix;

// Calculators
pub mod metrics;

// Reporting and I/O
pub mod driver;
pub mod report;
pub mod source;

// Re-exports
pub use attribution::{AttributionDocument, AttributionSet, parse_document};
pub use config::{AgreementConfig, load_config};
pub use driver::{EntityOutcome, RunOutcome, analyze_document, analyze_entity, run, run_and_write};
pub use error::AgreementError;
pub use matrix::{FeatureScope, FilterPolicy, SkipReason};
pub use metrics::SignPolicy;
pub use report::{AgreementDocument, AgreementReport, Metric, RunSummary};
