//! Error types for the xagree-core crate.

use thiserror::Error;

/// Top-level error type for agreement analysis.
///
/// Insufficient data for an entity or a metric is never an error; those cases
/// surface as skipped entities or null metrics instead.
#[derive(Debug, Error)]
pub enum AgreementError {
    #[error("Malformed input in {source_id}: {message}")]
    MalformedInput { source_id: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AgreementError {
    pub fn malformed(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
