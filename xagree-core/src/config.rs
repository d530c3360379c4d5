//! Configuration for agreement runs.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit config file -> environment. CLI flags are
//! applied on top by the binary. The workspace file lives at
//! `.xagree/config.toml`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::AgreementError;
use crate::matrix::{FeatureScope, FilterPolicy};
use crate::metrics::sign::SignPolicy;

/// Top-level configuration threaded through the driver into every calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementConfig {
    /// Canonical explanation methods, in comparison order. Other keys in the
    /// input are ignored.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    /// Where attribution documents are read from.
    #[serde(default)]
    pub input: InputConfig,
    /// Where the report is written.
    #[serde(default)]
    pub output: OutputConfig,
    /// Feature universe selection.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Which metrics run and how.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            methods: default_methods(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            selection: SelectionConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

fn default_methods() -> Vec<String> {
    vec!["SHAP".to_string(), "Lime".to_string(), "Inherent".to_string()]
}

/// Input source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// A single JSON document, or a directory whose matching files are fanned in.
    #[serde(default = "default_input_path")]
    pub path: PathBuf,
    /// File extension picked up when `path` is a directory.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            extension: default_extension(),
        }
    }
}

fn default_input_path() -> PathBuf {
    PathBuf::from("explanations")
}

fn default_extension() -> String {
    "json".to_string()
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    /// Indent the written JSON.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            pretty: true,
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("agreement_report.json")
}

/// Feature universe selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub policy: FilterPolicy,
    /// Magnitude below which values are zeroed under `threshold_common`.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: FilterPolicy::default(),
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    1.0
}

/// Metric selection and per-metric parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Size of the top-importance set compared by the overlap metric.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_true")]
    pub overlap: bool,
    #[serde(default = "default_true")]
    pub sign_agreement: bool,
    #[serde(default)]
    pub sign_policy: SignPolicy,
    #[serde(default = "default_true")]
    pub correlation: bool,
    #[serde(default)]
    pub collinearity: bool,
    /// Feature ordering used by the overlap metric.
    #[serde(default)]
    pub overlap_scope: FeatureScope,
    /// Feature ordering used by sign agreement.
    #[serde(default)]
    pub sign_scope: FeatureScope,
    /// Feature ordering used by pairwise correlation.
    #[serde(default)]
    pub correlation_scope: FeatureScope,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            overlap: true,
            sign_agreement: true,
            sign_policy: SignPolicy::default(),
            correlation: true,
            collinearity: false,
            overlap_scope: FeatureScope::default(),
            sign_scope: FeatureScope::default(),
            correlation_scope: FeatureScope::default(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl AgreementConfig {
    /// Reject configurations no run could use.
    pub fn validate(&self) -> Result<(), AgreementError> {
        let distinct: HashSet<&str> = self.methods.iter().map(String::as_str).collect();
        if distinct.len() < 2 {
            return Err(AgreementError::config(format!(
                "at least two distinct methods are required, got {:?}",
                self.methods
            )));
        }
        if distinct.len() != self.methods.len() {
            return Err(AgreementError::config(format!(
                "duplicate method names in {:?}",
                self.methods
            )));
        }
        if self.metrics.top_k == 0 {
            return Err(AgreementError::config("top_k must be at least 1"));
        }
        if !self.selection.threshold.is_finite() || self.selection.threshold < 0.0 {
            return Err(AgreementError::config(format!(
                "threshold must be a finite non-negative number, got {}",
                self.selection.threshold
            )));
        }
        Ok(())
    }

    /// Unordered method pairs in canonical order: (0,1), (0,2), (1,2), ...
    pub fn method_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (i, a) in self.methods.iter().enumerate() {
            for b in &self.methods[i + 1..] {
                pairs.push((a.clone(), b.clone()));
            }
        }
        pairs
    }
}

/// Workspace-relative location of the config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".xagree").join("config.toml")
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "xagree", "xagree")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `XAGREE_`, `__` between sections)
/// 2. Explicit config file
/// 3. Workspace-local config (`.xagree/config.toml`)
/// 4. User config (`~/.config/xagree/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<AgreementConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AgreementConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        figment = figment.merge(Toml::file(path));
    }

    // XAGREE_METRICS__TOP_K, XAGREE_SELECTION__POLICY, etc.
    figment = figment.merge(Env::prefixed("XAGREE_").split("__"));

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgreementConfig::default();
        assert_eq!(config.methods, vec!["SHAP", "Lime", "Inherent"]);
        assert_eq!(config.metrics.top_k, 10);
        assert_eq!(config.selection.policy, FilterPolicy::ZeroFiltered);
        assert_eq!(config.selection.threshold, 1.0);
        assert_eq!(config.metrics.sign_policy, SignPolicy::Strict);
        assert!(!config.metrics.collinearity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_method_pairs_follow_canonical_order() {
        let config = AgreementConfig::default();
        let pairs = config.method_pairs();
        assert_eq!(
            pairs,
            vec![
                ("SHAP".to_string(), "Lime".to_string()),
                ("SHAP".to_string(), "Inherent".to_string()),
                ("Lime".to_string(), "Inherent".to_string()),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AgreementConfig::default();
        config.metrics.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = AgreementConfig::default();
        config.methods = vec!["SHAP".to_string()];
        assert!(config.validate().is_err());

        let mut config = AgreementConfig::default();
        config.methods = vec!["SHAP".to_string(), "SHAP".to_string()];
        assert!(config.validate().is_err());

        let mut config = AgreementConfig::default();
        config.selection.threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: AgreementConfig = toml::from_str(
            r#"
            [selection]
            policy = "threshold_common"

            [metrics]
            top_k = 5
            sign_policy = "lenient"
            correlation_scope = "union"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.selection.policy, FilterPolicy::ThresholdCommon);
        assert_eq!(parsed.selection.threshold, 1.0);
        assert_eq!(parsed.metrics.top_k, 5);
        assert_eq!(parsed.metrics.sign_policy, SignPolicy::Lenient);
        assert_eq!(parsed.metrics.correlation_scope, FeatureScope::Union);
        assert_eq!(parsed.metrics.overlap_scope, FeatureScope::Filtered);
        assert_eq!(parsed.methods.len(), 3);
    }

    #[test]
    fn test_load_config_reads_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = workspace_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[metrics]\ntop_k = 20\ncollinearity = true\n").unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.metrics.top_k, 20);
        assert!(config.metrics.collinearity);
    }

    #[test]
    fn test_explicit_file_overrides_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let ws_path = workspace_config_path(dir.path());
        std::fs::create_dir_all(ws_path.parent().unwrap()).unwrap();
        std::fs::write(&ws_path, "[metrics]\ntop_k = 20\n").unwrap();
        let explicit = dir.path().join("run.toml");
        std::fs::write(&explicit, "[metrics]\ntop_k = 5\n").unwrap();

        let config = load_config(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(config.metrics.top_k, 5);
    }
}
