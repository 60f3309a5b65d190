//! MetricsSink implementations

use std::sync::{Arc, Mutex};

use contracts::{ContractError, MetricDatum, MetricUnit, MetricsSink, MetricsSinkKind};
use metrics::{counter, gauge, histogram};

/// Select the sink named by configuration
pub fn sink_for(kind: MetricsSinkKind) -> Arc<dyn MetricsSink> {
    match kind {
        MetricsSinkKind::Recorder => Arc::new(RecorderSink::new()),
        MetricsSinkKind::Log => Arc::new(LogSink),
    }
}

/// Emits through the `metrics` facade
///
/// Counts become counters, percentages gauges, and durations and sizes
/// histograms. Without an installed recorder every call is a no-op.
#[derive(Debug, Default)]
pub struct RecorderSink;

impl RecorderSink {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for RecorderSink {
    fn name(&self) -> &str {
        "recorder"
    }

    fn emit(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), ContractError> {
        for datum in data {
            if !datum.value.is_finite() {
                return Err(ContractError::sink_write(
                    self.name(),
                    format!("non-finite value for '{}'", datum.name),
                ));
            }

            let key = metric_key(namespace, &datum.name);
            let labels = &datum.dimensions;
            match datum.unit {
                MetricUnit::Count => counter!(key, labels).increment(datum.value.round() as u64),
                MetricUnit::Percent => gauge!(key, labels).set(datum.value),
                MetricUnit::Seconds | MetricUnit::Bytes => {
                    histogram!(key, labels).record(datum.value)
                }
            }
        }
        Ok(())
    }
}

/// `MOD/FileTransfer` + `BatchFilesProcessed` -> `mod_file_transfer_batch_files_processed`
pub fn metric_key(namespace: &str, name: &str) -> String {
    let mut key = String::with_capacity(namespace.len() + name.len() + 8);
    for part in [namespace, name] {
        let mut prev_lower = false;
        for c in part.chars() {
            if c.is_ascii_alphanumeric() {
                if c.is_ascii_uppercase() && prev_lower {
                    key.push('_');
                }
                prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
                key.push(c.to_ascii_lowercase());
            } else {
                if !key.ends_with('_') && !key.is_empty() {
                    key.push('_');
                }
                prev_lower = false;
            }
        }
        if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_end_matches('_').to_string()
}

/// Emits each datum as a structured tracing event
#[derive(Debug, Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn emit(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), ContractError> {
        for datum in data {
            tracing::info!(
                target: "weather_relay::metrics",
                namespace,
                metric = %datum.name,
                value = datum.value,
                unit = ?datum.unit,
                dimensions = ?datum.dimensions,
                "metric"
            );
        }
        Ok(())
    }
}

/// Collects emitted data in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    emitted: Mutex<Vec<(String, MetricDatum)>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every emit fails
    pub fn failing() -> Self {
        Self {
            emitted: Mutex::default(),
            fail: true,
        }
    }

    /// Every datum emitted so far with its namespace
    pub fn emitted(&self) -> Vec<(String, MetricDatum)> {
        self.emitted.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Last value emitted under `name`
    pub fn value(&self, name: &str) -> Option<f64> {
        self.emitted()
            .into_iter()
            .rev()
            .find(|(_, d)| d.name == name)
            .map(|(_, d)| d.value)
    }
}

impl MetricsSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn emit(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), ContractError> {
        if self.fail {
            return Err(ContractError::sink_write(self.name(), "sink unavailable"));
        }
        let mut emitted = self
            .emitted
            .lock()
            .map_err(|_| ContractError::sink_write(self.name(), "lock poisoned"))?;
        emitted.extend(data.iter().map(|d| (namespace.to_string(), d.clone())));
        Ok(())
    }
}
