//! # Contracts
//!
//! Frozen interface contracts shared by every stage of the relay.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Lifetime model
//! - Everything here is invocation-scoped: candidate files, outcomes and
//!   destination profiles are created inside one invocation and dropped at its end.
//! - The object stores and remote endpoints are the only cross-invocation state.

mod blueprint;
mod candidate;
mod destination;
mod duration_millis;
mod error;
mod metrics_sink;
mod outcome;
mod partition;
mod schema;
mod secret_store;
mod transfer;
mod uploader;
mod validation;

pub use blueprint::*;
pub use candidate::*;
pub use destination::*;
pub use error::*;
pub use metrics_sink::*;
pub use outcome::*;
pub use partition::*;
pub use schema::*;
pub use secret_store::*;
pub use transfer::*;
pub use uploader::*;
pub use validation::*;
