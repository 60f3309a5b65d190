//! `check-config` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, SecretStoreConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::CheckConfigArgs;
use crate::commands::load_blueprint;

/// Validation result for JSON output
#[derive(Serialize)]
struct CheckResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    untrusted: bool,
    trusted: bool,
    destinations: Vec<String>,
    secret_store: String,
    schema_columns: usize,
    max_attempts: u32,
    timeout_secs: u64,
    metrics_namespace: String,
}

/// Execute the `check-config` command
pub fn run_check_config(args: &CheckConfigArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let config_path = args.config.display().to_string();
    let result = match load_blueprint(&args.config) {
        Ok(blueprint) => CheckResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(summarize(&blueprint)),
        },
        Err(e) => CheckResult {
            valid: false,
            config_path,
            error: Some(format!("{e:#}")),
            warnings: Vec::new(),
            summary: None,
        },
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&result).context("Failed to serialize check result")?;
        println!("{json}");
    } else {
        print_check_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn summarize(blueprint: &RelayBlueprint) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        untrusted: blueprint.untrusted.is_some(),
        trusted: blueprint.trusted.is_some(),
        destinations: blueprint
            .destinations
            .iter()
            .map(|d| d.id.to_string())
            .collect(),
        secret_store: match &blueprint.secrets {
            SecretStoreConfig::Env => "env".to_string(),
            SecretStoreConfig::Directory { path } => format!("directory ({path})"),
        },
        schema_columns: blueprint.schema.columns.len(),
        max_attempts: blueprint.retry.max_attempts,
        timeout_secs: blueprint.invocation.timeout_secs,
        metrics_namespace: blueprint.metrics.namespace.clone(),
    }
}

/// Non-fatal issues
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.untrusted.is_none() {
        warnings.push("No [untrusted] section - validate-stage is unavailable".to_string());
    }
    if blueprint.trusted.is_none() {
        warnings.push("No [trusted] section - deliver-stage is unavailable".to_string());
    }
    if let Some(untrusted) = &blueprint.untrusted {
        if untrusted.accepted.url == untrusted.source.url
            && untrusted.accepted.bucket == untrusted.source.bucket
        {
            warnings.push(
                "untrusted.accepted is the source store - accepted files will be re-triggered"
                    .to_string(),
            );
        }
    }
    if blueprint.retry.max_attempts == 1 {
        warnings.push("retry.max_attempts = 1 - transient SFTP failures are not retried".to_string());
    }

    warnings
}

fn print_check_result(result: &CheckResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Untrusted stage: {}", summary.untrusted);
            println!("  Trusted stage: {}", summary.trusted);
            println!("  Destinations: {}", summary.destinations.join(", "));
            println!("  Secret store: {}", summary.secret_store);
            println!("  Schema columns: {}", summary.schema_columns);
            println!("  Max attempts: {}", summary.max_attempts);
            println!("  Timeout: {}s", summary.timeout_secs);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
