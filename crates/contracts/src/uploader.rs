//! Uploader trait - Transfer Engine output interface
//!
//! One implementation per secure channel type. The engine owns retry and
//! fan-out; an uploader performs exactly one attempt.

use bytes::Bytes;
use std::fmt;

use crate::DestinationProfile;

/// Why a single upload attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    /// TCP connect, handshake or timeout
    Connect,
    /// Credentials rejected by the endpoint
    Auth,
    /// Transient read/write failure on an established channel
    Io,
    /// Endpoint refused the write; repeating will not help
    PermissionDenied,
    /// Target path cannot be created or is not a file
    InvalidPath,
}

/// Failure of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadError {
    pub kind: UploadErrorKind,
    pub message: String,
}

impl UploadError {
    pub fn new(kind: UploadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Connection, auth and transient I/O failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            UploadErrorKind::Connect | UploadErrorKind::Auth | UploadErrorKind::Io
        )
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for UploadError {}

/// Secure remote filesystem upload
///
/// Implementations must:
/// - open one channel per call and close it on every exit path
/// - replace `remote_path` rather than append to it, so repeating a call
///   with the same content leaves the same remote state
#[trait_variant::make(Uploader: Send)]
pub trait LocalUploader {
    /// Uploader name (used for logging)
    fn name(&self) -> &str;

    /// Write `content` to `remote_path` on `destination`
    async fn upload(
        &self,
        destination: &DestinationProfile,
        remote_path: &str,
        content: Bytes,
    ) -> Result<(), UploadError>;
}
