//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Weather Relay - validate and deliver meteorological files across a trust boundary
#[derive(Parser, Debug)]
#[command(
    name = "weather-relay",
    author,
    version,
    about = "Two-stage weather data relay",
    long_about = "Runs one invocation of either relay stage.\n\n\
                  validate-stage checks incoming CSV files and forwards accepted ones;\n\
                  deliver-stage uploads accepted files to every on-premises SFTP endpoint."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "WEATHER_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (logs go to stderr)
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "WEATHER_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the untrusted stage once: validate and forward
    ValidateStage(StageArgs),

    /// Run the trusted stage once: deliver to on-premises endpoints
    DeliverStage(StageArgs),

    /// Validate a local file against the configured schema
    CheckFile(CheckFileArgs),

    /// Validate a configuration file without running anything
    CheckConfig(CheckConfigArgs),
}

/// Arguments shared by both stage commands
#[derive(Args, Debug, Clone)]
pub struct StageArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "relay.toml",
        env = "WEATHER_RELAY_CONFIG"
    )]
    pub config: PathBuf,

    #[command(flatten)]
    pub trigger: TriggerArgs,

    /// Previous hourly partitions to include in a sweep (overrides configuration)
    #[arg(long, requires = "sweep")]
    pub lookback_hours: Option<u32>,

    /// Prometheus listener port (overrides configuration)
    #[arg(long, env = "WEATHER_RELAY_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Exactly one trigger per invocation
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TriggerArgs {
    /// Notification batch JSON file (`-` reads stdin)
    #[arg(long, value_name = "FILE")]
    pub event: Option<PathBuf>,

    /// List the current time partition instead of reading notifications
    #[arg(long)]
    pub sweep: bool,
}

/// Arguments for the `check-file` command
#[derive(Args, Debug)]
pub struct CheckFileArgs {
    /// Configuration providing the schema (built-in schema when omitted)
    #[arg(short, long, env = "WEATHER_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// CSV file to validate
    pub path: PathBuf,
}

/// Arguments for the `check-config` command
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_stage_requires_one_trigger() {
        assert!(Cli::try_parse_from(["weather-relay", "deliver-stage", "-c", "r.toml"]).is_err());
        assert!(Cli::try_parse_from([
            "weather-relay",
            "deliver-stage",
            "--event",
            "e.json",
            "--sweep"
        ])
        .is_err());
    }

    #[test]
    fn test_sweep_with_lookback() {
        let cli = Cli::try_parse_from([
            "weather-relay",
            "validate-stage",
            "--sweep",
            "--lookback-hours",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::ValidateStage(args) => {
                assert!(args.trigger.sweep);
                assert_eq!(args.lookback_hours, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_event_from_stdin() {
        let cli = Cli::try_parse_from(["weather-relay", "deliver-stage", "--event", "-"]).unwrap();
        match cli.command {
            Commands::DeliverStage(args) => {
                assert_eq!(args.trigger.event, Some(PathBuf::from("-")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
