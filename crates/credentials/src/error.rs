//! Credential decoding errors
//!
//! Messages name fields and destinations, never values.

use contracts::ContractError;
use thiserror::Error;

/// Credential Resolver specific error
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Payload is not JSON
    #[error("payload is not valid JSON")]
    InvalidJson { secret_name: String },

    /// Payload (or a nested entry) is not an object
    #[error("payload entry for '{destination}' must be a JSON object")]
    NotAnObject {
        secret_name: String,
        destination: String,
    },

    /// No entry for a configured destination
    #[error("no entry for destination '{destination}'")]
    MissingDestination {
        secret_name: String,
        destination: String,
    },

    /// Single-destination payload referenced by more than one destination
    #[error("single-destination payload is shared by destinations {destinations:?}")]
    AmbiguousPayload {
        secret_name: String,
        destinations: Vec<String>,
    },

    /// Required field absent or empty
    #[error("missing required field '{field}' for destination '{destination}'")]
    MissingField {
        secret_name: String,
        destination: String,
        field: String,
    },

    /// Field present but not decodable
    #[error("field '{field}' for destination '{destination}' is malformed: {reason}")]
    MalformedField {
        secret_name: String,
        destination: String,
        field: String,
        reason: String,
    },

    /// Field outside the known shape
    #[error("unknown field '{field}' for destination '{destination}'")]
    UnknownField {
        secret_name: String,
        destination: String,
        field: String,
    },
}

impl CredentialError {
    /// Logical secret the error refers to
    pub fn secret_name(&self) -> &str {
        match self {
            Self::InvalidJson { secret_name }
            | Self::NotAnObject { secret_name, .. }
            | Self::MissingDestination { secret_name, .. }
            | Self::AmbiguousPayload { secret_name, .. }
            | Self::MissingField { secret_name, .. }
            | Self::MalformedField { secret_name, .. }
            | Self::UnknownField { secret_name, .. } => secret_name,
        }
    }
}

impl From<CredentialError> for ContractError {
    fn from(err: CredentialError) -> Self {
        ContractError::credential_unavailable(err.secret_name().to_string(), err.to_string())
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, CredentialError>;
