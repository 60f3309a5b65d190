//! Per-file and per-batch outcomes consumed by the reporter

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{DestinationId, ObjectRef};

/// Which side of the trust boundary produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Untrusted zone: validate and forward
    Validate,
    /// Trusted zone: deliver to on-premises endpoints
    Deliver,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Deliver => "deliver",
        }
    }
}

/// Terminal state of one file within one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum FileDisposition {
    /// Passed validation and was forwarded to the accepted store
    Accepted,
    /// Failed validation; content and report preserved in the rejected store
    Rejected { errors: usize },
    /// Every destination has a success attempt
    Delivered,
    /// At least one destination exhausted its retries
    PartiallyDelivered { failed: Vec<DestinationId> },
    /// Processing did not reach a terminal state (fetch/store/timeout/all destinations)
    Failed { reason: String },
}

impl FileDisposition {
    /// Whether the queue message for this file can be acknowledged
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected { .. } | Self::Delivered)
    }
}

/// Outcome of one file in one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub location: ObjectRef,
    pub stage: Stage,
    pub bytes: u64,
    #[serde(with = "crate::duration_millis")]
    pub duration: Duration,
    #[serde(flatten)]
    pub disposition: FileDisposition,
}

/// Aggregate over one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub stage: Stage,
    pub processed: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub delivered: u64,
    pub partially_delivered: u64,
    pub failed: u64,
    /// Candidates not attempted because the invocation deadline elapsed
    pub skipped: u64,
    pub total_bytes: u64,
    #[serde(with = "crate::duration_millis")]
    pub duration: Duration,
}

impl BatchOutcome {
    /// Created at invocation start
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            processed: 0,
            accepted: 0,
            rejected: 0,
            delivered: 0,
            partially_delivered: 0,
            failed: 0,
            skipped: 0,
            total_bytes: 0,
            duration: Duration::ZERO,
        }
    }

    /// Fold one file outcome into the counts
    pub fn record(&mut self, file: &FileOutcome) {
        self.processed += 1;
        self.total_bytes += file.bytes;
        match &file.disposition {
            FileDisposition::Accepted => self.accepted += 1,
            FileDisposition::Rejected { .. } => self.rejected += 1,
            FileDisposition::Delivered => self.delivered += 1,
            FileDisposition::PartiallyDelivered { .. } => self.partially_delivered += 1,
            FileDisposition::Failed { .. } => self.failed += 1,
        }
    }

    pub fn record_skipped(&mut self, count: u64) {
        self.skipped += count;
    }

    /// Finalize at invocation end
    pub fn finish(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Files that reached a settled terminal state
    pub fn successful(&self) -> u64 {
        self.accepted + self.rejected + self.delivered
    }

    /// Percentage of processed files that settled; `None` when nothing was processed
    pub fn success_rate(&self) -> Option<f64> {
        if self.processed == 0 {
            None
        } else {
            Some(self.successful() as f64 / self.processed as f64 * 100.0)
        }
    }
}
