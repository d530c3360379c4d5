//! Aggregation driver.
//!
//! Runs the calculator chain per entity, collects entity reports per source,
//! and fans sources out over tokio's blocking pool. Within an entity every
//! calculator reads the same derived attribution set, built once.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::attribution::{AttributionDocument, AttributionSet, parse_document};
use crate::config::AgreementConfig;
use crate::error::AgreementError;
use crate::matrix::{SkipReason, build_matrices};
use crate::metrics::{
    concordance, overlap_at_k, pairwise_correlation, sign_agreement, variance_inflation,
};
use crate::report::{AgreementDocument, AgreementReport, FailedSource, Metric, RunSummary, SourceReports};
use crate::source::{InputSource, resolve_sources, write_document};

/// Result of analyzing one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityOutcome {
    Report(AgreementReport),
    Skipped(SkipReason),
}

/// Reports and skips for one source.
#[derive(Debug, Clone, Default)]
pub struct SourceAnalysis {
    pub reports: SourceReports,
    pub skipped: Vec<(String, SkipReason)>,
}

/// The merged artifact and its summary.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub document: AgreementDocument,
    pub summary: RunSummary,
}

/// Run every configured calculator for one entity.
pub fn analyze_entity(name: &str, set: &AttributionSet, config: &AgreementConfig) -> EntityOutcome {
    let matrices = match build_matrices(set, &config.methods, &config.selection) {
        Ok(matrices) => matrices,
        Err(reason) => {
            tracing::debug!(entity = name, %reason, "Skipping entity");
            return EntityOutcome::Skipped(reason);
        }
    };

    let metrics = &config.metrics;
    let pairs = config.method_pairs();
    let mut report = AgreementReport {
        concordance: concordance(&matrices.filtered),
        top_k: metrics.top_k,
        ..Default::default()
    };

    if metrics.overlap {
        let matrix = matrices.scoped(metrics.overlap_scope);
        report.overlap = Metric::from_option(overlap_at_k(matrix, &pairs, metrics.top_k));
    }
    if metrics.sign_agreement {
        let matrix = matrices.scoped(metrics.sign_scope);
        report.sign_agreement = Metric::from_option(sign_agreement(matrix, metrics.sign_policy));
    }
    if metrics.correlation {
        let summary = pairwise_correlation(matrices.scoped(metrics.correlation_scope), &pairs);
        report.pairwise_correlation = Metric::from_option(summary.mean);
        report.correlation_pairs = summary.pairs;
    }
    if metrics.collinearity {
        report.collinearity = Metric::from_option(variance_inflation(&matrices.union));
    }

    tracing::debug!(
        entity = name,
        methods = matrices.filtered.method_count(),
        features = matrices.universe().len(),
        concordance = ?report.concordance,
        "Analyzed entity"
    );
    EntityOutcome::Report(report)
}

/// Analyze every entity of one document.
pub fn analyze_document(document: &AttributionDocument, config: &AgreementConfig) -> SourceAnalysis {
    let mut analysis = SourceAnalysis::default();
    for (name, set) in &document.entities {
        match analyze_entity(name, set, config) {
            EntityOutcome::Report(report) => {
                analysis.reports.insert(name.clone(), report);
            }
            EntityOutcome::Skipped(reason) => analysis.skipped.push((name.clone(), reason)),
        }
    }
    analysis
}

/// Parse and analyze one source's text.
pub fn analyze_text(
    source_id: &str,
    text: &str,
    config: &AgreementConfig,
) -> Result<SourceAnalysis, AgreementError> {
    let document = parse_document(source_id, text, &config.methods)?;
    Ok(analyze_document(&document, config))
}

async fn analyze_source(
    source: &InputSource,
    config: Arc<AgreementConfig>,
) -> Result<SourceAnalysis, AgreementError> {
    let text = source.read().await?;
    let id = source.id.clone();
    tokio::task::spawn_blocking(move || analyze_text(&id, &text, &config)).await?
}

/// Analyze every configured source and merge the results.
///
/// A source that cannot be read or parsed is recorded in the summary and left
/// out of the document; the remaining sources are still processed.
pub async fn run(config: Arc<AgreementConfig>) -> Result<RunOutcome, AgreementError> {
    config.validate()?;
    let sources = resolve_sources(&config.input)?;
    tracing::info!(
        input = %config.input.path.display(),
        sources = sources.len(),
        policy = ?config.selection.policy,
        top_k = config.metrics.top_k,
        "Starting agreement run"
    );

    let mut tasks = JoinSet::new();
    for source in sources {
        let config = Arc::clone(&config);
        tasks.spawn(async move {
            let result = analyze_source(&source, config).await;
            (source.id, result)
        });
    }

    let mut document = AgreementDocument::new();
    let mut summary = RunSummary::default();
    while let Some(joined) = tasks.join_next().await {
        let (source_id, result) = joined?;
        match result {
            Ok(analysis) => {
                summary.sources_processed += 1;
                summary.entities_reported += analysis.reports.len();
                for (entity, reason) in &analysis.skipped {
                    tracing::debug!(source = %source_id, entity = %entity, %reason, "Entity skipped");
                    summary.record_skip(reason);
                }
                tracing::info!(
                    source = %source_id,
                    reported = analysis.reports.len(),
                    skipped = analysis.skipped.len(),
                    "Source analyzed"
                );
                document.insert(source_id, analysis.reports);
            }
            Err(e) => {
                tracing::error!(source = %source_id, error = %e, "Source failed");
                summary.sources_failed.push(FailedSource {
                    source_id,
                    error: e.to_string(),
                });
            }
        }
    }
    summary
        .sources_failed
        .sort_by(|a, b| a.source_id.cmp(&b.source_id));

    Ok(RunOutcome { document, summary })
}

/// [`run`], then write the document to the configured output path.
pub async fn run_and_write(config: Arc<AgreementConfig>) -> Result<RunOutcome, AgreementError> {
    let outcome = run(Arc::clone(&config)).await?;
    write_document(&config.output.path, &outcome.document, config.output.pretty).await?;
    tracing::info!(output = %config.output.path.display(), "{}", outcome.summary);
    Ok(outcome)
}
