//! CandidateFile - Trigger Coordinator output
//!
//! One unit of work for either stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a candidate was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Object-created notification from the queue
    Event,
    /// Periodic listing of the current time partition
    Sweep,
}

impl DiscoveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Sweep => "sweep",
        }
    }
}

/// Location of one object: bucket + key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Reference to one unit of work
///
/// Immutable once created; consumed once per stage per attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFile {
    /// Source location
    pub location: ObjectRef,

    /// Size reported at discovery (notifications may omit it)
    pub size: Option<u64>,

    /// When the coordinator observed the object
    pub discovered_at: DateTime<Utc>,

    /// Trigger path that produced this candidate
    pub method: DiscoveryMethod,

    /// Queue message id for event-sourced candidates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl CandidateFile {
    /// Candidate from a listing sweep
    pub fn from_sweep(location: ObjectRef, size: u64, discovered_at: DateTime<Utc>) -> Self {
        Self {
            location,
            size: Some(size),
            discovered_at,
            method: DiscoveryMethod::Sweep,
            message_id: None,
        }
    }

    /// Candidate from an object-created notification
    pub fn from_event(
        location: ObjectRef,
        size: Option<u64>,
        discovered_at: DateTime<Utc>,
        message_id: Option<String>,
    ) -> Self {
        Self {
            location,
            size,
            discovered_at,
            method: DiscoveryMethod::Event,
            message_id,
        }
    }
}
