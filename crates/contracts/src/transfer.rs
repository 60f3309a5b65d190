//! TransferAttempt - Transfer Engine output

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::DestinationId;

/// Classification of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    /// No verdict this invocation (destination task aborted); redelivery may succeed
    RetryableFailure,
    /// Non-transient error, or retries exhausted
    FatalFailure,
}

/// One delivery attempt of one file to one destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAttempt {
    pub destination: DestinationId,
    /// 1-based attempt number
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    /// Error detail for failed attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time spent on this attempt (not including backoff)
    #[serde(with = "crate::duration_millis")]
    pub duration: Duration,
}

impl TransferAttempt {
    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Overall delivery status of one file across all destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Every destination has a success attempt
    Delivered,
    /// Some destinations succeeded, at least one exhausted its retries
    PartialFailure,
    /// No destination succeeded
    Failed,
}

/// Final attempt per destination for one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub attempts: BTreeMap<DestinationId, TransferAttempt>,
}

impl DeliveryReport {
    pub fn get(&self, destination: &str) -> Option<&TransferAttempt> {
        self.attempts.get(destination)
    }

    /// Worst per-destination outcome wins
    pub fn status(&self) -> DeliveryStatus {
        let succeeded = self.attempts.values().filter(|a| a.is_success()).count();
        if succeeded == self.attempts.len() && succeeded > 0 {
            DeliveryStatus::Delivered
        } else if succeeded > 0 {
            DeliveryStatus::PartialFailure
        } else {
            DeliveryStatus::Failed
        }
    }

    /// Destinations without a success attempt
    pub fn failed_destinations(&self) -> Vec<&DestinationId> {
        self.attempts
            .iter()
            .filter(|(_, a)| !a.is_success())
            .map(|(id, _)| id)
            .collect()
    }
}
