//! Destination metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single destination
#[derive(Debug, Default)]
pub struct DestinationMetrics {
    /// Upload attempts started
    attempts: AtomicU64,
    /// Files delivered
    success_count: AtomicU64,
    /// Attempts that failed and were retried
    retry_count: AtomicU64,
    /// Files that ended in fatal failure
    failure_count: AtomicU64,
    /// Bytes delivered
    bytes_delivered: AtomicU64,
}

impl DestinationMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    /// Record a delivered file of `bytes`
    pub fn record_success(&self, bytes: u64) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.bytes_delivered.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    pub fn inc_retry_count(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts(),
            success_count: self.success_count(),
            retry_count: self.retry_count(),
            failure_count: self.failure_count(),
            bytes_delivered: self.bytes_delivered(),
        }
    }
}

/// Snapshot of destination metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub success_count: u64,
    pub retry_count: u64,
    pub failure_count: u64,
    pub bytes_delivered: u64,
}
