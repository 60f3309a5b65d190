//! # Transfer
//!
//! Transfer Engine: delivers one accepted file to every configured
//! destination concurrently, with per-destination retry and failure
//! isolation.
//!
//! - `TransferEngine`: fan-out, retry loop, per-destination metrics
//! - `SftpUploader`: SFTP over libssh2, replace-by-rename writes
//! - `MemoryUploader`: in-memory destinations for tests

pub mod engine;
pub mod error;
pub mod metrics;
pub mod mock;
pub mod path;
pub mod retry;
pub mod sftp;

pub use engine::TransferEngine;
pub use error::TransferError;
pub use metrics::{DestinationMetrics, MetricsSnapshot};
pub use mock::{MemoryUploader, RemoteFiles};
pub use path::{join_remote, relative_path};
pub use retry::RetryPolicy;
pub use sftp::SftpUploader;
