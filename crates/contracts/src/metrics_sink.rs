//! MetricsSink trait - observability output interface

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Unit attached to a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricUnit {
    Count,
    Bytes,
    Seconds,
    Percent,
}

/// One named value with dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<(String, String)>,
}

impl MetricDatum {
    pub fn new(name: impl Into<String>, value: f64, unit: MetricUnit) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            dimensions: Vec::new(),
        }
    }

    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.push((name.into(), value.into()));
        self
    }
}

/// Observability sink
///
/// Emission is synchronous; callers treat every error as best-effort and
/// never let it fail processing.
pub trait MetricsSink: Send + Sync {
    /// Sink name (used for logging)
    fn name(&self) -> &str;

    /// Emit a batch of data points under `namespace`
    fn emit(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), ContractError>;
}
