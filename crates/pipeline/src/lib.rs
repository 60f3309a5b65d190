//! # Pipeline
//!
//! One invocation of either stage:
//!
//! - `ValidateStage` (untrusted zone): candidates → Validation Engine →
//!   accepted store or rejected store + error report
//! - `DeliverStage` (trusted zone): candidates → Credential Resolver (once)
//!   → Transfer Engine fan-out
//!
//! Files are processed sequentially under a single invocation deadline.
//! Every file outcome and the batch outcome go to the reporter; the
//! returned `InvocationReport` names the queue messages to redeliver.

pub mod deliver_stage;
pub mod error;
mod invocation;
pub mod report;
pub mod stores;
pub mod validate_stage;

#[cfg(test)]
mod testing;

pub use deliver_stage::DeliverStage;
pub use error::{PipelineError, Result};
pub use report::{BatchItemFailure, InvocationReport};
pub use stores::open_store;
pub use validate_stage::{ValidateStage, ValidateStores};
