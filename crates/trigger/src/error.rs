//! Trigger Coordinator errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    /// Notification input is not a recognizable batch
    #[error("invalid notification: {0}")]
    InvalidEvent(String),

    /// Listing a partition of the input store failed
    #[error("failed to list '{prefix}' in bucket '{bucket}': {source}")]
    List {
        bucket: String,
        prefix: String,
        #[source]
        source: object_store::Error,
    },
}

/// Result alias
pub type Result<T> = std::result::Result<T, TriggerError>;
