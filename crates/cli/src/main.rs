//! # Weather Relay CLI
//!
//! Entry point. Each invocation runs one stage once, or one of the offline
//! checks, then exits.

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_check_config, run_check_file, run_deliver_stage, run_validate_stage};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "weather-relay starting");

    let result = match &cli.command {
        Commands::ValidateStage(args) => run_validate_stage(args).await,
        Commands::DeliverStage(args) => run_deliver_stage(args).await,
        Commands::CheckFile(args) => run_check_file(args),
        Commands::CheckConfig(args) => run_check_config(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
    })
}
