//! Trusted stage: deliver accepted files to every on-premises destination

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use contracts::{
    CandidateFile, DeliveryStatus, DestinationConfig, DestinationProfile, FileDisposition,
    FileOutcome, RelayBlueprint, SecretStore, Stage, Uploader,
};
use credentials::CredentialResolver;
use object_store::path::Path;
use object_store::ObjectStore;
use observability::OutcomeReporter;
use tokio::time::timeout_at;
use tracing::{info, instrument, warn};
use transfer::{relative_path, TransferEngine};
use trigger::{Trigger, TriggerCoordinator};

use crate::error::{PipelineError, Result};
use crate::invocation::drive;
use crate::report::InvocationReport;
use crate::stores::{fetch, not_found};

pub struct DeliverStage<U, S: SecretStore> {
    input: Arc<dyn ObjectStore>,
    coordinator: TriggerCoordinator,
    destinations: Vec<DestinationConfig>,
    remote_root: String,
    resolver: CredentialResolver<S>,
    engine: TransferEngine<U>,
    reporter: OutcomeReporter,
    timeout: Duration,
}

impl<U, S> DeliverStage<U, S>
where
    U: Uploader + Send + Sync + 'static,
    S: SecretStore,
{
    /// # Errors
    /// `StageNotConfigured` when the blueprint has no `[trusted]` section.
    pub fn from_blueprint(
        blueprint: &RelayBlueprint,
        input: Arc<dyn ObjectStore>,
        secrets: S,
        engine: TransferEngine<U>,
        reporter: OutcomeReporter,
    ) -> Result<Self> {
        let trusted = blueprint
            .trusted
            .as_ref()
            .ok_or(PipelineError::StageNotConfigured("trusted"))?;

        Ok(Self {
            input,
            coordinator: TriggerCoordinator::new(&trusted.input.bucket),
            destinations: blueprint.destinations.clone(),
            remote_root: trusted.remote_root.clone(),
            resolver: CredentialResolver::new(secrets),
            engine,
            reporter,
            timeout: Duration::from_secs(blueprint.invocation.timeout_secs),
        })
    }

    pub fn engine(&self) -> &TransferEngine<U> {
        &self.engine
    }

    /// Run one invocation
    ///
    /// Credentials are resolved once, and only when there is something to
    /// deliver.
    ///
    /// # Errors
    /// Invalid notification input, a failed listing, unresolvable
    /// credentials, a deadline that elapses before delivery starts, or an
    /// input store outage.
    #[instrument(name = "deliver_stage", skip(self, trigger, now), fields(trigger = trigger.kind()))]
    pub async fn run(&mut self, trigger: &Trigger, now: DateTime<Utc>) -> Result<InvocationReport> {
        let deadline = tokio::time::Instant::now() + self.timeout;

        let candidates = timeout_at(
            deadline,
            self.coordinator.collect(trigger, self.input.as_ref(), now),
        )
        .await
        .map_err(|_| PipelineError::DeadlineExceeded { phase: "listing" })??;

        let profiles: Vec<DestinationProfile> = if candidates.candidates.is_empty() {
            Vec::new()
        } else {
            timeout_at(
                deadline,
                self.resolver.resolve(&self.destinations, &self.remote_root),
            )
            .await
            .map_err(|_| PipelineError::DeadlineExceeded {
                phase: "credential resolution",
            })?
            .map_err(PipelineError::Credentials)?
            .into_values()
            .collect()
        };

        let this = &*self;
        let report = drive(
            Stage::Deliver,
            trigger.kind(),
            candidates,
            deadline,
            &this.reporter,
            |candidate| this.process(candidate, &profiles),
        )
        .await?;

        for (destination, snapshot) in this.engine.metrics() {
            info!(
                destination = %destination,
                attempts = snapshot.attempts,
                succeeded = snapshot.success_count,
                retries = snapshot.retry_count,
                failures = snapshot.failure_count,
                bytes = snapshot.bytes_delivered,
                "destination totals"
            );
        }
        Ok(report)
    }

    /// Deliver one candidate to every destination
    ///
    /// # Errors
    /// `StoreUnavailable` when the input store fails for any reason other
    /// than the object being gone.
    pub async fn process(
        &self,
        candidate: CandidateFile,
        profiles: &[DestinationProfile],
    ) -> Result<FileOutcome> {
        let started = Instant::now();
        let path = Path::from(candidate.location.key.as_str());

        let (bytes, disposition) = match fetch(self.input.as_ref(), "input", &path).await? {
            None => {
                warn!(key = %candidate.location.key, "input object missing");
                (0, not_found(&candidate.location))
            }
            Some(content) => {
                let size = content.len() as u64;
                let relative = relative_path(&candidate.location, candidate.discovered_at);
                let report = self.engine.deliver(content, profiles, &relative).await;

                let disposition = match report.status() {
                    DeliveryStatus::Delivered => FileDisposition::Delivered,
                    DeliveryStatus::PartialFailure => FileDisposition::PartiallyDelivered {
                        failed: report.failed_destinations().into_iter().cloned().collect(),
                    },
                    DeliveryStatus::Failed => FileDisposition::Failed {
                        reason: "no destination succeeded".to_string(),
                    },
                };
                (size, disposition)
            }
        };

        Ok(FileOutcome {
            location: candidate.location,
            stage: Stage::Deliver,
            bytes,
            duration: started.elapsed(),
            disposition,
        })
    }
}
