//! Configuration validation
//!
//! Rules:
//! - at least one stage configured
//! - store URLs parse and use a supported scheme; an s3 url names its bucket
//! - destination ids unique, secret names present
//! - the trusted stage has at least one destination
//! - retry/backoff parameters are usable
//! - schema columns unique, ranges ordered, no ranges on text columns

use std::collections::HashSet;

use contracts::{ColumnKind, ContractError, RelayBlueprint, StoreConfig};
use url::Url;

const SUPPORTED_SCHEMES: &[&str] = &["s3", "file", "memory"];

/// Validate a RelayBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_stages(blueprint)?;
    validate_destinations(blueprint)?;
    validate_retry(blueprint)?;
    validate_invocation(blueprint)?;
    validate_schema(blueprint)?;
    Ok(())
}

fn validate_stages(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    if blueprint.untrusted.is_none() && blueprint.trusted.is_none() {
        return Err(ContractError::config_validation(
            "untrusted / trusted",
            "at least one stage must be configured",
        ));
    }

    if let Some(untrusted) = &blueprint.untrusted {
        validate_store("untrusted.source", &untrusted.source)?;
        validate_store("untrusted.accepted", &untrusted.accepted)?;
        validate_store("untrusted.rejected", &untrusted.rejected)?;
    }

    if let Some(trusted) = &blueprint.trusted {
        validate_store("trusted.input", &trusted.input)?;
        if !trusted.remote_root.starts_with('/') {
            return Err(ContractError::config_validation(
                "trusted.remote_root",
                format!("remote_root must be absolute, got '{}'", trusted.remote_root),
            ));
        }
    }

    Ok(())
}

fn validate_store(field: &str, store: &StoreConfig) -> Result<(), ContractError> {
    if store.bucket.is_empty() {
        return Err(ContractError::config_validation(
            format!("{field}.bucket"),
            "bucket cannot be empty",
        ));
    }

    let url = Url::parse(&store.url).map_err(|e| {
        ContractError::config_validation(format!("{field}.url"), format!("invalid url: {e}"))
    })?;

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(ContractError::config_validation(
            format!("{field}.url"),
            format!(
                "unsupported scheme '{}', expected one of {:?}",
                url.scheme(),
                SUPPORTED_SCHEMES
            ),
        ));
    }

    // The pipeline opens the bucket named by the url host; events name `bucket`
    if url.scheme() == "s3" && url.host_str() != Some(store.bucket.as_str()) {
        return Err(ContractError::config_validation(
            format!("{field}.bucket"),
            format!(
                "bucket '{}' does not match url host '{}'",
                store.bucket,
                url.host_str().unwrap_or_default()
            ),
        ));
    }

    Ok(())
}

fn validate_destinations(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    if blueprint.trusted.is_some() && blueprint.destinations.is_empty() {
        return Err(ContractError::config_validation(
            "destinations",
            "trusted stage requires at least one destination",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, destination) in blueprint.destinations.iter().enumerate() {
        if destination.id.is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{idx}].id"),
                "destination id cannot be empty",
            ));
        }
        if !seen.insert(destination.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("destinations[id={}]", destination.id),
                "duplicate destination id",
            ));
        }
        if destination.secret_name.is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{}].secret_name", destination.id),
                "secret_name cannot be empty",
            ));
        }
        if let Some(root) = &destination.remote_root {
            if !root.starts_with('/') {
                return Err(ContractError::config_validation(
                    format!("destinations[{}].remote_root", destination.id),
                    format!("remote_root must be absolute, got '{root}'"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_retry(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let retry = &blueprint.retry;

    if retry.max_attempts == 0 {
        return Err(ContractError::config_validation(
            "retry.max_attempts",
            "max_attempts must be >= 1",
        ));
    }

    if retry.backoff_multiplier < 1.0 || !retry.backoff_multiplier.is_finite() {
        return Err(ContractError::config_validation(
            "retry.backoff_multiplier",
            format!(
                "backoff_multiplier must be a finite value >= 1.0, got {}",
                retry.backoff_multiplier
            ),
        ));
    }

    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(ContractError::config_validation(
            "retry.initial_backoff_ms / retry.max_backoff_ms",
            format!(
                "initial_backoff_ms ({}) must be <= max_backoff_ms ({})",
                retry.initial_backoff_ms, retry.max_backoff_ms
            ),
        ));
    }

    if retry.connect_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "retry.connect_timeout_secs",
            "connect_timeout_secs must be > 0",
        ));
    }

    Ok(())
}

fn validate_invocation(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    if blueprint.invocation.timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "invocation.timeout_secs",
            "timeout_secs must be > 0",
        ));
    }
    Ok(())
}

fn validate_schema(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let columns = &blueprint.schema.columns;
    if columns.is_empty() {
        return Err(ContractError::config_validation(
            "schema.columns",
            "schema must define at least one column",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, column) in columns.iter().enumerate() {
        if column.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("schema.columns[{idx}].name"),
                "column name cannot be empty",
            ));
        }
        if !seen.insert(column.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("schema.columns[name={}]", column.name),
                "duplicate column name",
            ));
        }
        if column.kind == ColumnKind::Text && (column.min.is_some() || column.max.is_some()) {
            return Err(ContractError::config_validation(
                format!("schema.columns[{}]", column.name),
                "text columns cannot declare min/max",
            ));
        }
        if let (Some(min), Some(max)) = (column.min, column.max) {
            if min > max {
                return Err(ContractError::config_validation(
                    format!("schema.columns[{}].min / max", column.name),
                    format!("min ({min}) must be <= max ({max})"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ColumnSpec, ConfigVersion, DestinationConfig, InvocationConfig, MetricsConfig,
        RetryConfig, SchemaConfig, SecretStoreConfig, TrustedConfig, UntrustedConfig,
    };

    fn store(bucket: &str) -> StoreConfig {
        StoreConfig {
            url: "memory://".into(),
            bucket: bucket.into(),
        }
    }

    fn minimal_blueprint() -> RelayBlueprint {
        RelayBlueprint {
            version: ConfigVersion::V1,
            untrusted: Some(UntrustedConfig {
                source: store("source"),
                accepted: store("trusted"),
                rejected: store("rejected"),
                sweep_lookback_hours: 0,
            }),
            trusted: Some(TrustedConfig {
                input: store("trusted"),
                remote_root: "/From_AWS".into(),
                sweep_lookback_hours: 0,
            }),
            destinations: vec![DestinationConfig {
                id: "op1".into(),
                secret_name: "onprem-credentials".into(),
                remote_root: None,
            }],
            secrets: SecretStoreConfig::Env,
            retry: RetryConfig::default(),
            invocation: InvocationConfig::default(),
            schema: SchemaConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_no_stage() {
        let mut bp = minimal_blueprint();
        bp.untrusted = None;
        bp.trusted = None;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one stage"), "got: {err}");
    }

    #[test]
    fn test_unsupported_scheme() {
        let mut bp = minimal_blueprint();
        if let Some(t) = bp.trusted.as_mut() {
            t.input.url = "gs://bucket".into();
        }
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("unsupported scheme"), "got: {err}");
    }

    #[test]
    fn test_s3_bucket_must_match_url_host() {
        let mut bp = minimal_blueprint();
        if let Some(t) = bp.trusted.as_mut() {
            t.input.url = "s3://trusted".into();
        }
        assert!(validate(&bp).is_ok());

        if let Some(t) = bp.trusted.as_mut() {
            t.input.url = "s3://other-bucket".into();
        }
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("trusted.input.bucket"), "got: {err}");
        assert!(err.contains("does not match url host 'other-bucket'"), "got: {err}");
    }

    #[test]
    fn test_duplicate_destination_id() {
        let mut bp = minimal_blueprint();
        bp.destinations.push(bp.destinations[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate destination id"), "got: {err}");
    }

    #[test]
    fn test_trusted_without_destinations() {
        let mut bp = minimal_blueprint();
        bp.destinations.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one destination"), "got: {err}");
    }

    #[test]
    fn test_zero_attempts() {
        let mut bp = minimal_blueprint();
        bp.retry.max_attempts = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("max_attempts must be >= 1"), "got: {err}");
    }

    #[test]
    fn test_inverted_backoff() {
        let mut bp = minimal_blueprint();
        bp.retry.initial_backoff_ms = 20_000;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("initial_backoff_ms"), "got: {err}");
    }

    #[test]
    fn test_inverted_column_range() {
        let mut bp = minimal_blueprint();
        bp.schema.columns.push(
            ColumnSpec::new("rain_mm", ColumnKind::Measurement).with_range(10.0, 0.0),
        );
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("min (10) must be <= max (0)"), "got: {err}");
    }

    #[test]
    fn test_duplicate_column() {
        let mut bp = minimal_blueprint();
        bp.schema
            .columns
            .push(ColumnSpec::new("latitude", ColumnKind::Latitude));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate column name"), "got: {err}");
    }

    #[test]
    fn test_relative_remote_root() {
        let mut bp = minimal_blueprint();
        bp.destinations[0].remote_root = Some("incoming".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("must be absolute"), "got: {err}");
    }
}
