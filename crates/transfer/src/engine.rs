//! TransferEngine - fan-out of one file to every destination
//!
//! One task per destination, each with its own retry loop. A destination's
//! failure never blocks or rolls back the others. Dropping the `deliver`
//! future aborts every in-flight destination task.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use contracts::{
    AttemptOutcome, DeliveryReport, DestinationId, DestinationProfile, TransferAttempt, Uploader,
};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::{DestinationMetrics, MetricsSnapshot};
use crate::path::join_remote;
use crate::retry::RetryPolicy;

/// Delivers files to a fixed uploader with a fixed retry policy
pub struct TransferEngine<U> {
    uploader: Arc<U>,
    policy: RetryPolicy,
    metrics: Mutex<BTreeMap<DestinationId, Arc<DestinationMetrics>>>,
}

impl<U> TransferEngine<U>
where
    U: Uploader + Send + Sync + 'static,
{
    pub fn new(uploader: U, policy: RetryPolicy) -> Self {
        Self::with_shared(Arc::new(uploader), policy)
    }

    /// Share an uploader with the caller (tests inspect it afterwards)
    pub fn with_shared(uploader: Arc<U>, policy: RetryPolicy) -> Self {
        Self {
            uploader,
            policy,
            metrics: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Metrics per destination seen so far
    pub fn metrics(&self) -> BTreeMap<DestinationId, MetricsSnapshot> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, m)| (id.clone(), m.snapshot()))
            .collect()
    }

    fn metrics_for(&self, id: &DestinationId) -> Arc<DestinationMetrics> {
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(metrics.entry(id.clone()).or_default())
    }

    /// Deliver `content` to `{remote_root}/{relative_path}` on every destination
    ///
    /// Returns the final attempt per destination once all of them resolve.
    #[instrument(
        name = "transfer_deliver",
        skip(self, content, destinations),
        fields(path = %relative_path, bytes = content.len(), destinations = destinations.len())
    )]
    pub async fn deliver(
        &self,
        content: Bytes,
        destinations: &[DestinationProfile],
        relative_path: &str,
    ) -> DeliveryReport {
        let mut tasks = JoinSet::new();
        for profile in destinations {
            let uploader = Arc::clone(&self.uploader);
            let metrics = self.metrics_for(&profile.id);
            let remote_path = join_remote(&profile.remote_root, relative_path);
            let profile = profile.clone();
            let content = content.clone();
            let policy = self.policy;

            tasks.spawn(async move {
                deliver_one(uploader, profile, remote_path, content, policy, metrics).await
            });
        }

        let mut report = DeliveryReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(attempt) => {
                    report.attempts.insert(attempt.destination.clone(), attempt);
                }
                Err(e) => {
                    error!(error = %e, "destination task failed");
                }
            }
        }

        // Destinations whose task died without a verdict; a redelivery may succeed
        for profile in destinations {
            if !report.attempts.contains_key(&profile.id) {
                report.attempts.insert(
                    profile.id.clone(),
                    TransferAttempt {
                        destination: profile.id.clone(),
                        attempt: 0,
                        outcome: AttemptOutcome::RetryableFailure,
                        error: Some("destination task aborted".to_string()),
                        duration: Default::default(),
                    },
                );
            }
        }

        info!(status = ?report.status(), "delivery finished");
        report
    }
}

/// Retry loop for one destination
#[instrument(
    name = "transfer_deliver_one",
    skip(uploader, profile, content, policy, metrics),
    fields(destination = %profile.id, remote_path = %remote_path)
)]
async fn deliver_one<U: Uploader>(
    uploader: Arc<U>,
    profile: DestinationProfile,
    remote_path: String,
    content: Bytes,
    policy: RetryPolicy,
    metrics: Arc<DestinationMetrics>,
) -> TransferAttempt {
    let bytes = content.len() as u64;
    let mut attempt = 1;

    loop {
        metrics.inc_attempts();
        let start = Instant::now();
        let result = uploader
            .upload(&profile, &remote_path, content.clone())
            .await;
        let duration = start.elapsed();

        match result {
            Ok(()) => {
                metrics.record_success(bytes);
                debug!(attempt, elapsed_ms = duration.as_millis() as u64, "uploaded");
                return TransferAttempt {
                    destination: profile.id,
                    attempt,
                    outcome: AttemptOutcome::Success,
                    error: None,
                    duration,
                };
            }
            Err(e) if e.is_retryable() && policy.allows_retry_after(attempt) => {
                metrics.inc_retry_count();
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "upload failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    attempt,
                    retryable = e.is_retryable(),
                    error = %e,
                    "upload failed, giving up on destination"
                );
                return TransferAttempt {
                    destination: profile.id,
                    attempt,
                    outcome: AttemptOutcome::FatalFailure,
                    error: Some(e.to_string()),
                    duration,
                };
            }
        }
    }
}
