//! RelayBlueprint - Config Loader output
//!
//! Describes both stages: stores, destinations, retry policy, schema and metrics.

use serde::{Deserialize, Serialize};

use crate::{DestinationId, SchemaConfig};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
///
/// One file may configure either stage or both; each binary invocation
/// runs a single stage and requires only its section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Untrusted zone: validate and forward
    #[serde(default)]
    pub untrusted: Option<UntrustedConfig>,

    /// Trusted zone: deliver on-premises
    #[serde(default)]
    pub trusted: Option<TrustedConfig>,

    /// Remote endpoints for the trusted stage
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,

    /// Where destination credentials come from
    #[serde(default)]
    pub secrets: SecretStoreConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub invocation: InvocationConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// One object store binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store URL (`s3://bucket`, `file:///path`, `memory://`)
    pub url: String,

    /// Bucket name as it appears in notifications
    pub bucket: String,
}

/// Untrusted stage stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UntrustedConfig {
    /// Where candidate files arrive
    pub source: StoreConfig,

    /// Intermediate store receiving accepted files
    pub accepted: StoreConfig,

    /// Quarantine for rejected files and their error reports
    pub rejected: StoreConfig,

    /// Extra past hourly partitions included in a sweep
    #[serde(default)]
    pub sweep_lookback_hours: u32,
}

/// Trusted stage input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedConfig {
    /// Intermediate store populated by the untrusted stage
    pub input: StoreConfig,

    /// Default root directory on every destination
    #[serde(default = "default_remote_root")]
    pub remote_root: String,

    #[serde(default)]
    pub sweep_lookback_hours: u32,
}

fn default_remote_root() -> String {
    "/From_AWS".to_string()
}

/// One configured destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub id: DestinationId,

    /// Secret holding this destination's connection fields
    pub secret_name: String,

    /// Overrides `trusted.remote_root` for this destination
    #[serde(default)]
    pub remote_root: Option<String>,
}

/// Secret store backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretStoreConfig {
    /// `WEATHER_RELAY_SECRET_<NAME>` environment variables
    #[default]
    Env,
    /// One `<name>.json` file per secret
    Directory { path: String },
}

/// Per-destination retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per destination, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Bounds session setup and every blocking call on the channel
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Invocation-wide limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Deadline for the whole invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Metrics sink selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSinkKind {
    /// `metrics` facade (Prometheus exporter when a port is set)
    #[default]
    Recorder,
    /// Structured log events
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Namespace attached to every datum
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub sink: MetricsSinkKind,

    /// Prometheus listener port (None = exporter disabled)
    #[serde(default)]
    pub prometheus_port: Option<u16>,
}

fn default_namespace() -> String {
    "MOD/FileTransfer".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            sink: MetricsSinkKind::default(),
            prometheus_port: None,
        }
    }
}

impl RelayBlueprint {
    /// Root directory for one destination
    pub fn remote_root_for(&self, destination: &DestinationConfig) -> String {
        destination
            .remote_root
            .clone()
            .or_else(|| self.trusted.as_ref().map(|t| t.remote_root.clone()))
            .unwrap_or_else(default_remote_root)
    }
}
