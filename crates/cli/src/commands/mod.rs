//! Command implementations.

mod check_config;
mod check_file;
mod stage;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::RelayBlueprint;

use crate::error::CliError;

pub use check_config::run_check_config;
pub use check_file::run_check_file;
pub use stage::{run_deliver_stage, run_validate_stage};

/// Load and validate a configuration file
pub(crate) fn load_blueprint(path: &Path) -> Result<RelayBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
