//! Configuration parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use contracts::{ContractError, RelayBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<RelayBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<RelayBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RelayBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ColumnKind, SecretStoreConfig};

    #[test]
    fn test_parse_toml_trusted_only() {
        let content = r#"
[trusted]
input = { url = "s3://s3-trusted-bucket", bucket = "s3-trusted-bucket" }

[[destinations]]
id = "op1"
secret_name = "onprem-credentials"

[[destinations]]
id = "op2"
secret_name = "onprem-credentials"
remote_root = "/incoming"
"#;
        let bp = parse_toml(content).unwrap();
        let trusted = bp.trusted.as_ref().unwrap();
        assert_eq!(trusted.remote_root, "/From_AWS");
        assert_eq!(bp.destinations.len(), 2);
        assert_eq!(bp.remote_root_for(&bp.destinations[0]), "/From_AWS");
        assert_eq!(bp.remote_root_for(&bp.destinations[1]), "/incoming");
        assert_eq!(bp.retry.max_attempts, 3);
        assert_eq!(bp.invocation.timeout_secs, 300);
        assert!(matches!(bp.secrets, SecretStoreConfig::Env));
    }

    #[test]
    fn test_parse_toml_custom_schema() {
        let content = r#"
[untrusted]
source = { url = "memory://", bucket = "falcon-project-bucket1" }
accepted = { url = "memory://", bucket = "s3-trusted-bucket" }
rejected = { url = "memory://", bucket = "falcon-rejected" }

[secrets]
kind = "directory"
path = "/run/secrets"

[[schema.columns]]
name = "latitude"
kind = "latitude"

[[schema.columns]]
name = "rain_mm"
kind = "measurement"
min = 0.0
max = 500.0
required = false
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.schema.columns.len(), 2);
        assert_eq!(bp.schema.columns[1].kind, ColumnKind::Measurement);
        assert!(!bp.schema.columns[1].required);
        assert!(matches!(bp.secrets, SecretStoreConfig::Directory { ref path } if path == "/run/secrets"));
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "trusted": { "input": { "url": "memory://", "bucket": "trusted" } },
            "destinations": [{ "id": "op1", "secret_name": "onprem" }],
            "retry": { "max_attempts": 5 }
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.retry.max_attempts, 5);
        assert_eq!(bp.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
