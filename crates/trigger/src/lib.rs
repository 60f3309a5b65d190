//! # Trigger
//!
//! Dispatch/Trigger Coordinator: turns object-created notifications and
//! scheduled sweeps into one de-duplicated stream of `CandidateFile`s.
//! No state survives the invocation.

pub mod coordinator;
pub mod error;
pub mod event;
pub mod sweep;

pub use coordinator::{dedup, CandidateBatch, Trigger, TriggerCoordinator};
pub use error::{Result, TriggerError};
pub use event::{decode_key, parse_event, EventBatch};
pub use sweep::sweep;
