//! Metrics & Outcome Reporter
//!
//! Turns per-file and per-batch outcomes into named metrics. Emission is
//! synchronous and never fails the caller; sink errors are logged and dropped.

use std::sync::Arc;

use contracts::{BatchOutcome, FileDisposition, FileOutcome, MetricDatum, MetricUnit, MetricsSink};
use tracing::warn;

pub const EXECUTION_TIME: &str = "ExecutionTime";
pub const FILE_SIZE: &str = "FileSize";
pub const TRANSFER_SUCCESS: &str = "TransferSuccess";
pub const BATCH_EXECUTION_TIME: &str = "BatchExecutionTime";
pub const BATCH_FILES_PROCESSED: &str = "BatchFilesProcessed";
pub const BATCH_FILES_SUCCESSFUL: &str = "BatchFilesSuccessful";
pub const BATCH_SUCCESS_RATE: &str = "BatchSuccessRate";

/// Reporter bound to one sink and namespace
#[derive(Clone)]
pub struct OutcomeReporter {
    sink: Arc<dyn MetricsSink>,
    namespace: String,
}

impl std::fmt::Debug for OutcomeReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeReporter")
            .field("sink", &self.sink.name())
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl OutcomeReporter {
    pub fn new(sink: Arc<dyn MetricsSink>, namespace: impl Into<String>) -> Self {
        Self {
            sink,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Emit per-file metrics
    pub fn record_file(&self, file: &FileOutcome) {
        let success = if file.disposition.is_settled() { 1.0 } else { 0.0 };
        let dims = |datum: MetricDatum| {
            datum
                .with_dimension("FileName", file.location.file_name())
                .with_dimension("Stage", file.stage.as_str())
        };

        let data = vec![
            dims(MetricDatum::new(
                EXECUTION_TIME,
                file.duration.as_secs_f64(),
                MetricUnit::Seconds,
            )),
            dims(MetricDatum::new(FILE_SIZE, file.bytes as f64, MetricUnit::Bytes)),
            dims(MetricDatum::new(TRANSFER_SUCCESS, success, MetricUnit::Count)),
        ];
        self.emit(&data);

        if let FileDisposition::Failed { reason } = &file.disposition {
            warn!(key = %file.location.key, stage = file.stage.as_str(), reason = %reason, "file failed");
        }
    }

    /// Emit per-invocation metrics
    pub fn record(&self, batch: &BatchOutcome) {
        let stage = batch.stage.as_str();
        let count = |name: &str, value: u64| {
            MetricDatum::new(name, value as f64, MetricUnit::Count).with_dimension("Stage", stage)
        };

        let mut data = vec![
            MetricDatum::new(
                BATCH_EXECUTION_TIME,
                batch.duration.as_secs_f64(),
                MetricUnit::Seconds,
            )
            .with_dimension("Stage", stage),
            count(BATCH_FILES_PROCESSED, batch.processed),
            count(BATCH_FILES_SUCCESSFUL, batch.successful()),
            count("BatchFilesAccepted", batch.accepted),
            count("BatchFilesRejected", batch.rejected),
            count("BatchFilesDelivered", batch.delivered),
            count("BatchFilesPartiallyDelivered", batch.partially_delivered),
            count("BatchFilesFailed", batch.failed),
            count("BatchFilesSkipped", batch.skipped),
            MetricDatum::new("BatchBytes", batch.total_bytes as f64, MetricUnit::Bytes)
                .with_dimension("Stage", stage),
        ];
        // Undefined for an empty batch
        if let Some(rate) = batch.success_rate() {
            data.push(
                MetricDatum::new(BATCH_SUCCESS_RATE, rate, MetricUnit::Percent)
                    .with_dimension("Stage", stage),
            );
        }
        self.emit(&data);

        tracing::info!(
            stage,
            processed = batch.processed,
            accepted = batch.accepted,
            rejected = batch.rejected,
            delivered = batch.delivered,
            partially_delivered = batch.partially_delivered,
            failed = batch.failed,
            skipped = batch.skipped,
            bytes = batch.total_bytes,
            duration_ms = batch.duration.as_millis() as u64,
            "batch complete"
        );
    }

    fn emit(&self, data: &[MetricDatum]) {
        if let Err(e) = self.sink.emit(&self.namespace, data) {
            warn!(sink = self.sink.name(), error = %e, "metrics emission failed");
        }
    }
}
