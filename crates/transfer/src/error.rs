//! SFTP transfer errors and their retry classification

use contracts::{UploadError, UploadErrorKind};
use thiserror::Error;

// libssh2 SFTP status codes
pub(crate) const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_NO_CONNECTION: i32 = 6;
const FX_CONNECTION_LOST: i32 = 7;
const FX_WRITE_PROTECT: i32 = 12;
const FX_NOT_A_DIRECTORY: i32 = 19;
const FX_INVALID_FILENAME: i32 = 20;

/// Transfer Engine specific error
#[derive(Debug, Error)]
pub enum TransferError {
    /// Host name did not resolve
    #[error("cannot resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect failed or timed out
    #[error("cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// SSH session setup failed
    #[error("ssh session with {address} failed: {source}")]
    Session {
        address: String,
        #[source]
        source: ssh2::Error,
    },

    /// Endpoint rejected the identity
    #[error("authentication as '{username}' via {method} rejected: {reason}")]
    Auth {
        username: String,
        method: &'static str,
        reason: String,
    },

    /// SFTP operation failed
    #[error("sftp {op} '{path}' failed: {source}")]
    Sftp {
        op: &'static str,
        path: String,
        #[source]
        source: ssh2::Error,
    },

    /// Writing file content failed
    #[error("write to '{path}' failed: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A path component exists but is not a directory
    #[error("'{path}' exists and is not a directory")]
    NotADirectory { path: String },

    /// Blocking worker failed
    #[error("upload worker failed: {0}")]
    Worker(String),
}

impl TransferError {
    pub(crate) fn sftp(op: &'static str, path: impl Into<String>, source: ssh2::Error) -> Self {
        Self::Sftp {
            op,
            path: path.into(),
            source,
        }
    }

    /// SFTP status code carried by this error, if any
    pub fn sftp_status(&self) -> Option<i32> {
        match self {
            Self::Sftp { source, .. } => match source.code() {
                ssh2::ErrorCode::SFTP(code) => Some(code),
                ssh2::ErrorCode::Session(_) => None,
            },
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.sftp_status() == Some(FX_NO_SUCH_FILE)
    }

    /// Map onto the retry classification shared with the engine
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            Self::Resolve { .. } | Self::Connect { .. } | Self::Session { .. } => {
                UploadErrorKind::Connect
            }
            Self::Auth { .. } => UploadErrorKind::Auth,
            Self::Write { .. } | Self::Worker(_) => UploadErrorKind::Io,
            Self::NotADirectory { .. } => UploadErrorKind::InvalidPath,
            Self::Sftp { source, .. } => match source.code() {
                ssh2::ErrorCode::SFTP(FX_PERMISSION_DENIED | FX_WRITE_PROTECT) => {
                    UploadErrorKind::PermissionDenied
                }
                ssh2::ErrorCode::SFTP(FX_NOT_A_DIRECTORY | FX_INVALID_FILENAME) => {
                    UploadErrorKind::InvalidPath
                }
                ssh2::ErrorCode::SFTP(FX_NO_CONNECTION | FX_CONNECTION_LOST) => {
                    UploadErrorKind::Connect
                }
                _ => UploadErrorKind::Io,
            },
        }
    }
}

impl From<TransferError> for UploadError {
    fn from(err: TransferError) -> Self {
        UploadError::new(err.kind(), err.to_string())
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sftp_error(code: i32) -> TransferError {
        TransferError::sftp(
            "create",
            "/From_AWS/x.csv",
            ssh2::Error::new(ssh2::ErrorCode::SFTP(code), "status"),
        )
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            sftp_error(FX_PERMISSION_DENIED).kind(),
            UploadErrorKind::PermissionDenied
        );
        assert_eq!(sftp_error(FX_CONNECTION_LOST).kind(), UploadErrorKind::Connect);
        assert_eq!(sftp_error(4).kind(), UploadErrorKind::Io);
        assert!(sftp_error(FX_NO_SUCH_FILE).is_not_found());

        let auth = TransferError::Auth {
            username: "relay".into(),
            method: "password",
            reason: "denied".into(),
        };
        let upload: UploadError = auth.into();
        assert!(upload.is_retryable());
        assert!(!UploadError::from(sftp_error(FX_WRITE_PROTECT)).is_retryable());
    }
}
