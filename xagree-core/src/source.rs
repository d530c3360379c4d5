//! Input source resolution and report writing.
//!
//! A run reads either one JSON document or every matching file directly inside
//! a directory. Each file is one source, identified by its file name.

use std::path::{Path, PathBuf};

use crate::config::InputConfig;
use crate::error::AgreementError;
use crate::report::AgreementDocument;

/// One input document on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    /// File name, used as the top-level key of the report.
    pub id: String,
    pub path: PathBuf,
}

impl InputSource {
    pub fn from_path(path: &Path) -> Self {
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id,
            path: path.to_path_buf(),
        }
    }

    pub async fn read(&self) -> Result<String, AgreementError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

/// List the sources named by `input`, sorted by file name.
pub fn resolve_sources(input: &InputConfig) -> Result<Vec<InputSource>, AgreementError> {
    let path = &input.path;
    if path.is_file() {
        return Ok(vec![InputSource::from_path(path)]);
    }
    if !path.is_dir() {
        return Err(AgreementError::not_found(format!(
            "input path {} does not exist",
            path.display()
        )));
    }

    let mut sources = Vec::new();
    for entry in walkdir::WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %path.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == input.extension);
        if matches {
            sources.push(InputSource::from_path(entry.path()));
        }
    }

    tracing::debug!(dir = %path.display(), count = sources.len(), "Resolved input sources");
    Ok(sources)
}

/// Write the report, creating parent directories as needed.
pub async fn write_document(
    path: &Path,
    document: &AgreementDocument,
    pretty: bool,
) -> Result<(), AgreementError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let text = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    tokio::fs::write(path, text).await?;
    Ok(())
}
