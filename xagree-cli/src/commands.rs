//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::{PolicyArg, RunArgs, ScopeArg, SignArg};
use std::path::Path;
use std::sync::Arc;
use xagree_core::config::workspace_config_path;
use xagree_core::{AgreementConfig, FeatureScope, FilterPolicy, SignPolicy};

impl From<PolicyArg> for FilterPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::All => FilterPolicy::All,
            PolicyArg::ZeroFiltered => FilterPolicy::ZeroFiltered,
            PolicyArg::ThresholdCommon => FilterPolicy::ThresholdCommon,
        }
    }
}

impl From<SignArg> for SignPolicy {
    fn from(arg: SignArg) -> Self {
        match arg {
            SignArg::Lenient => SignPolicy::Lenient,
            SignArg::Strict => SignPolicy::Strict,
        }
    }
}

impl From<ScopeArg> for FeatureScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Filtered => FeatureScope::Filtered,
            ScopeArg::Union => FeatureScope::Union,
        }
    }
}

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => handle_run(args, workspace, config_file).await,
        Commands::Config { action } => handle_config(action, workspace, config_file).await,
    }
}

fn load(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<AgreementConfig> {
    xagree_core::load_config(Some(workspace), config_file)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

/// Apply CLI flags on top of the loaded configuration.
fn apply_overrides(config: &mut AgreementConfig, args: RunArgs) {
    if let Some(input) = args.input {
        config.input.path = input;
    }
    if let Some(output) = args.output {
        config.output.path = output;
    }
    if let Some(methods) = args.methods {
        config.methods = methods
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
    }
    if let Some(top_k) = args.top_k {
        config.metrics.top_k = top_k;
    }
    if let Some(policy) = args.policy {
        config.selection.policy = policy.into();
    }
    if let Some(threshold) = args.threshold {
        config.selection.threshold = threshold;
    }
    if let Some(sign_policy) = args.sign_policy {
        config.metrics.sign_policy = sign_policy.into();
    }
    if let Some(scope) = args.scope {
        config.metrics.overlap_scope = scope.into();
        config.metrics.sign_scope = scope.into();
        config.metrics.correlation_scope = scope.into();
    }
    if let Some(scope) = args.correlation_scope {
        config.metrics.correlation_scope = scope.into();
    }
    if args.collinearity {
        config.metrics.collinearity = true;
    }
    if args.no_overlap {
        config.metrics.overlap = false;
    }
    if args.no_sign {
        config.metrics.sign_agreement = false;
    }
    if args.no_correlation {
        config.metrics.correlation = false;
    }
    if args.compact {
        config.output.pretty = false;
    }
}

async fn handle_run(
    args: RunArgs,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = load(workspace, config_file)?;
    apply_overrides(&mut config, args);
    execute_run(config).await
}

/// Run with a fully resolved configuration and print the summary.
async fn execute_run(config: AgreementConfig) -> anyhow::Result<()> {
    config.validate()?;

    let output = config.output.path.clone();
    let outcome = xagree_core::run_and_write(Arc::new(config)).await?;
    let summary = &outcome.summary;

    println!("{}", summary);
    for (reason, count) in &summary.skipped_by_reason {
        println!("  skipped ({}): {}", reason, count);
    }
    println!("Report written to: {}", output.display());

    if summary.has_failures() {
        for failed in &summary.sources_failed {
            eprintln!("  failed {}: {}", failed.source_id, failed.error);
        }
        anyhow::bail!(
            "{} input source(s) could not be processed",
            summary.sources_failed.len()
        );
    }
    Ok(())
}

async fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }

            let default_config = AgreementConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(&config_path, &toml_str).await?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_file)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).await.unwrap();

        let config_path = workspace.join(".xagree").join("config.toml");
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: AgreementConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.metrics.top_k, 10);
        assert_eq!(parsed.selection.policy, FilterPolicy::ZeroFiltered);
    }

    #[tokio::test]
    async fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let config_path = workspace_config_path(workspace);
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, "methods = [\"SHAP\", \"Lime\"]\n").unwrap();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).await.unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "methods = [\"SHAP\", \"Lime\"]\n");
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = AgreementConfig::default();
        let args = RunArgs {
            input: Some(PathBuf::from("patients")),
            methods: Some(vec![" SHAP".to_string(), "Lime ".to_string(), String::new()]),
            top_k: Some(20),
            policy: Some(PolicyArg::ThresholdCommon),
            threshold: Some(0.5),
            scope: Some(ScopeArg::Union),
            correlation_scope: Some(ScopeArg::Filtered),
            no_sign: true,
            compact: true,
            ..Default::default()
        };
        apply_overrides(&mut config, args);

        assert_eq!(config.input.path, PathBuf::from("patients"));
        assert_eq!(config.methods, vec!["SHAP", "Lime"]);
        assert_eq!(config.metrics.top_k, 20);
        assert_eq!(config.selection.policy, FilterPolicy::ThresholdCommon);
        assert_eq!(config.selection.threshold, 0.5);
        assert_eq!(config.metrics.overlap_scope, FeatureScope::Union);
        assert_eq!(config.metrics.sign_scope, FeatureScope::Union);
        assert_eq!(config.metrics.correlation_scope, FeatureScope::Filtered);
        assert!(!config.metrics.sign_agreement);
        assert!(config.metrics.overlap);
        assert!(!config.output.pretty);
    }

    fn global_input(dir: &Path) -> PathBuf {
        let input = dir.join("global.json");
        std::fs::write(
            &input,
            r#"{"ModelA": {"SHAP": {"a": 3, "b": 2, "c": 1}, "Lime": {"a": 6, "b": 4, "c": 2}}}"#,
        )
        .unwrap();
        input
    }

    #[tokio::test]
    async fn test_run_writes_report() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("report.json");
        let mut config = AgreementConfig::default();
        apply_overrides(
            &mut config,
            RunArgs {
                input: Some(global_input(dir.path())),
                output: Some(output.clone()),
                ..Default::default()
            },
        );

        execute_run(config).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["global.json"]["ModelA"]["concordance"], 1.0);
        assert_eq!(written["global.json"]["ModelA"]["overlap_at_10"], 0.3);
    }

    #[tokio::test]
    async fn test_run_fails_after_writing_when_a_source_is_bad() {
        let dir = TempDir::new().unwrap();
        let inputs = dir.path().join("inputs");
        std::fs::create_dir(&inputs).unwrap();
        std::fs::write(inputs.join("good.json"), r#"{"M": {"SHAP": {"a": 1}, "Lime": {"a": 2}}}"#)
            .unwrap();
        std::fs::write(inputs.join("bad.json"), "not json").unwrap();
        let output = dir.path().join("report.json");

        let mut config = AgreementConfig::default();
        config.input.path = inputs;
        config.output.path = output.clone();

        let err = execute_run(config).await.unwrap_err();
        assert!(err.to_string().contains("1 input source(s)"));
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let mut config = AgreementConfig::default();
        config.metrics.top_k = 0;
        assert!(execute_run(config).await.is_err());
    }
}
