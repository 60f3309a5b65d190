//! `check-file` command implementation.

use anyhow::{Context, Result};
use contracts::{ObjectRef, SchemaConfig};
use tracing::info;
use validation::{ErrorReport, Validator};

use crate::cli::CheckFileArgs;
use crate::commands::load_blueprint;
use crate::error::CliError;

/// Execute the `check-file` command
///
/// Prints the same report the untrusted stage stores next to a rejected file.
pub fn run_check_file(args: &CheckFileArgs) -> Result<()> {
    let schema = match &args.config {
        Some(path) => load_blueprint(path)?.schema,
        None => SchemaConfig::default(),
    };

    let content = std::fs::read(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let outcome = Validator::new(schema).validate(&content);

    let location = ObjectRef::new("local", args.path.display().to_string());
    let report = ErrorReport::new(&location, &outcome)
        .to_json()
        .context("Failed to serialize report")?;
    println!("{}", String::from_utf8_lossy(&report));

    info!(
        path = %args.path.display(),
        status = ?outcome.status(),
        rows = outcome.rows_checked,
        errors = outcome.errors().len(),
        "File checked"
    );

    if outcome.is_accepted() {
        Ok(())
    } else {
        Err(CliError::Rejected {
            errors: outcome.errors().len(),
        }
        .into())
    }
}
