//! Invocation-level failures
//!
//! Anything here aborts the whole batch; per-file problems are recorded in
//! that file's outcome instead.

use contracts::ContractError;
use thiserror::Error;
use trigger::TriggerError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration has no section for the requested stage
    #[error("stage '{0}' is not configured")]
    StageNotConfigured(&'static str),

    /// Notification input unreadable or listing failed
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// Destination credentials could not be resolved
    #[error("credential resolution failed: {0}")]
    Credentials(#[source] ContractError),

    /// Store URL not understood
    #[error("invalid store url '{url}': {message}")]
    StoreUrl { url: String, message: String },

    /// Store client could not be built
    #[error("failed to open store '{url}': {source}")]
    StoreOpen {
        url: String,
        #[source]
        source: object_store::Error,
    },

    /// A store read or write failed for a reason other than a missing
    /// object; the rest of the batch would fail the same way
    #[error("{store} store unavailable at '{key}': {source}")]
    StoreUnavailable {
        store: &'static str,
        key: String,
        #[source]
        source: object_store::Error,
    },

    /// Deadline elapsed before any file could be processed
    #[error("invocation deadline exceeded during {phase}")]
    DeadlineExceeded { phase: &'static str },
}

impl PipelineError {
    pub fn store_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUrl {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl PipelineError {
    pub(crate) fn store_unavailable(
        store: &'static str,
        key: impl ToString,
        source: object_store::Error,
    ) -> Self {
        Self::StoreUnavailable {
            store,
            key: key.to_string(),
            source,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, PipelineError>;
