//! Layered error definitions
//!
//! Categorized by source: config, credential and sink. Store and transfer
//! failures carry their own types in `pipeline` and `transfer`.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Credential Errors =====
    /// Secret store unreachable or payload undecodable.
    ///
    /// The message never contains secret material.
    #[error("credentials unavailable for secret '{secret_name}': {message}")]
    CredentialUnavailable {
        secret_name: String,
        message: String,
    },

    // ===== Sink Errors =====
    /// Metrics sink emit error
    #[error("metrics sink '{sink_name}' error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// Configuration file could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create credential error
    pub fn credential_unavailable(
        secret_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CredentialUnavailable {
            secret_name: secret_name.into(),
            message: message.into(),
        }
    }

    /// Create metrics sink error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
