//! `validate-stage` and `deliver-stage` command implementations.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use contracts::RelayBlueprint;
use credentials::ConfiguredSecretStore;
use observability::{sink_for, OutcomeReporter};
use pipeline::{open_store, DeliverStage, InvocationReport, ValidateStage, ValidateStores};
use tracing::info;
use transfer::{RetryPolicy, SftpUploader, TransferEngine};
use trigger::Trigger;

use crate::cli::{StageArgs, TriggerArgs};
use crate::commands::load_blueprint;
use crate::error::CliError;

/// Execute the `validate-stage` command
pub async fn run_validate_stage(args: &StageArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let untrusted = blueprint
        .untrusted
        .as_ref()
        .ok_or(CliError::StageNotConfigured {
            section: "untrusted",
        })?;

    let trigger = read_trigger(
        &args.trigger,
        args.lookback_hours.unwrap_or(untrusted.sweep_lookback_hours),
    )?;
    let reporter = reporter_for(&blueprint, args.metrics_port)?;
    let stores = ValidateStores::open(untrusted).context("Failed to open untrusted stores")?;

    info!(
        source = %untrusted.source.bucket,
        accepted = %untrusted.accepted.bucket,
        rejected = %untrusted.rejected.bucket,
        trigger = trigger.kind(),
        "Running validate stage"
    );

    let stage = ValidateStage::from_blueprint(&blueprint, stores, reporter)?;
    let report = stage
        .run(&trigger, Utc::now())
        .await
        .context("Validate stage invocation failed")?;
    print_report(&report)
}

/// Execute the `deliver-stage` command
pub async fn run_deliver_stage(args: &StageArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let trusted = blueprint
        .trusted
        .as_ref()
        .ok_or(CliError::StageNotConfigured { section: "trusted" })?;

    let trigger = read_trigger(
        &args.trigger,
        args.lookback_hours.unwrap_or(trusted.sweep_lookback_hours),
    )?;
    let reporter = reporter_for(&blueprint, args.metrics_port)?;
    let input = open_store(&trusted.input).context("Failed to open trusted input store")?;

    let secrets = ConfiguredSecretStore::from_config(&blueprint.secrets);
    let uploader = SftpUploader::new(Duration::from_secs(blueprint.retry.connect_timeout_secs));
    let engine = TransferEngine::new(uploader, RetryPolicy::from_config(&blueprint.retry));

    info!(
        input = %trusted.input.bucket,
        destinations = blueprint.destinations.len(),
        trigger = trigger.kind(),
        "Running deliver stage"
    );

    let mut stage = DeliverStage::from_blueprint(&blueprint, input, secrets, engine, reporter)?;
    let report = stage
        .run(&trigger, Utc::now())
        .await
        .context("Deliver stage invocation failed")?;
    print_report(&report)
}

fn read_trigger(args: &TriggerArgs, lookback_hours: u32) -> Result<Trigger> {
    match &args.event {
        Some(path) => Ok(Trigger::Event(read_event(path)?)),
        None => Ok(Trigger::Sweep { lookback_hours }),
    }
}

fn read_event(path: &Path) -> Result<String, CliError> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| CliError::event_input("<stdin>", e))?;
        return Ok(input);
    }
    std::fs::read_to_string(path).map_err(|e| CliError::event_input(path.display().to_string(), e))
}

fn reporter_for(blueprint: &RelayBlueprint, port_override: Option<u16>) -> Result<OutcomeReporter> {
    if let Some(port) = port_override.or(blueprint.metrics.prometheus_port) {
        observability::init_metrics_only(port)?;
    }
    Ok(OutcomeReporter::new(
        sink_for(blueprint.metrics.sink),
        blueprint.metrics.namespace.clone(),
    ))
}

/// The invocation report is the only thing written to stdout
fn print_report(report: &InvocationReport) -> Result<()> {
    let json = report
        .to_json()
        .context("Failed to serialize invocation report")?;
    println!("{json}");
    Ok(())
}
