//! Untrusted stage: validate and forward
//!
//! Accepted files are copied under the same key into the accepted store.
//! Rejected files are preserved in the rejected store together with a
//! `<key>.errors.json` report. Both writes overwrite by key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use contracts::{
    CandidateFile, FileDisposition, FileOutcome, ObjectRef, RelayBlueprint, Stage,
    UntrustedConfig,
};
use object_store::path::Path;
use object_store::ObjectStore;
use observability::OutcomeReporter;
use tracing::{info, instrument, warn};
use trigger::{Trigger, TriggerCoordinator};
use validation::{report_key, ErrorReport, Validator};

use crate::error::{PipelineError, Result};
use crate::invocation::drive;
use crate::report::InvocationReport;
use crate::stores::{fetch, not_found, open_store, put};

/// Stores used by the untrusted stage
#[derive(Clone)]
pub struct ValidateStores {
    pub source: Arc<dyn ObjectStore>,
    pub accepted: Arc<dyn ObjectStore>,
    pub rejected: Arc<dyn ObjectStore>,
}

impl ValidateStores {
    /// Open all three stores named by the `[untrusted]` section
    pub fn open(config: &UntrustedConfig) -> Result<Self> {
        Ok(Self {
            source: open_store(&config.source)?,
            accepted: open_store(&config.accepted)?,
            rejected: open_store(&config.rejected)?,
        })
    }
}

pub struct ValidateStage {
    stores: ValidateStores,
    coordinator: TriggerCoordinator,
    validator: Validator,
    reporter: OutcomeReporter,
    timeout: Duration,
}

impl ValidateStage {
    /// # Errors
    /// `StageNotConfigured` when the blueprint has no `[untrusted]` section.
    pub fn from_blueprint(
        blueprint: &RelayBlueprint,
        stores: ValidateStores,
        reporter: OutcomeReporter,
    ) -> Result<Self> {
        let untrusted = blueprint
            .untrusted
            .as_ref()
            .ok_or(PipelineError::StageNotConfigured("untrusted"))?;

        Ok(Self {
            stores,
            coordinator: TriggerCoordinator::new(&untrusted.source.bucket),
            validator: Validator::new(blueprint.schema.clone()),
            reporter,
            timeout: Duration::from_secs(blueprint.invocation.timeout_secs),
        })
    }

    /// Run one invocation
    ///
    /// # Errors
    /// Invalid notification input, a failed listing, a deadline that
    /// elapses before candidates are known, or a store outage mid-batch.
    #[instrument(name = "validate_stage", skip(self, trigger, now), fields(trigger = trigger.kind()))]
    pub async fn run(&self, trigger: &Trigger, now: DateTime<Utc>) -> Result<InvocationReport> {
        let deadline = tokio::time::Instant::now() + self.timeout;

        let candidates = tokio::time::timeout_at(
            deadline,
            self.coordinator
                .collect(trigger, self.stores.source.as_ref(), now),
        )
        .await
        .map_err(|_| PipelineError::DeadlineExceeded { phase: "listing" })??;

        drive(
            Stage::Validate,
            trigger.kind(),
            candidates,
            deadline,
            &self.reporter,
            |candidate| self.process(candidate),
        )
        .await
    }

    /// Validate one candidate and route it
    ///
    /// # Errors
    /// `StoreUnavailable` when a store fails for any reason other than the
    /// source object being gone.
    pub async fn process(&self, candidate: CandidateFile) -> Result<FileOutcome> {
        let started = Instant::now();
        let location = candidate.location;
        let (bytes, disposition) = self.route(&location).await?;

        Ok(FileOutcome {
            location,
            stage: Stage::Validate,
            bytes,
            duration: started.elapsed(),
            disposition,
        })
    }

    async fn route(&self, location: &ObjectRef) -> Result<(u64, FileDisposition)> {
        let path = Path::from(location.key.as_str());
        let Some(content) = fetch(self.stores.source.as_ref(), "source", &path).await? else {
            warn!(key = %location.key, "source object missing");
            return Ok((0, not_found(location)));
        };
        let size = content.len() as u64;

        let started = Instant::now();
        let outcome = self.validator.validate(&content).with_elapsed(started.elapsed());

        if outcome.is_accepted() {
            put(self.stores.accepted.as_ref(), "accepted", &path, content).await?;
            info!(key = %location.key, rows = outcome.rows_checked, "accepted");
            return Ok((size, FileDisposition::Accepted));
        }

        let report = match ErrorReport::new(location, &outcome).to_json() {
            Ok(report) => report,
            Err(e) => {
                let reason = format!("error report not serializable: {e}");
                warn!(key = %location.key, reason = %reason, "file not routed");
                return Ok((size, FileDisposition::Failed { reason }));
            }
        };
        self.store_rejected(location, &path, content, report).await?;
        info!(
            key = %location.key,
            errors = outcome.errors().len(),
            structural = outcome.structural_error_count(),
            "rejected"
        );
        Ok((
            size,
            FileDisposition::Rejected {
                errors: outcome.errors().len(),
            },
        ))
    }

    async fn store_rejected(
        &self,
        location: &ObjectRef,
        path: &Path,
        content: Bytes,
        report: Vec<u8>,
    ) -> Result<()> {
        let rejected = self.stores.rejected.as_ref();
        put(rejected, "rejected", path, content).await?;
        put(
            rejected,
            "rejected",
            &Path::from(report_key(&location.key)),
            Bytes::from(report),
        )
        .await
    }
}
