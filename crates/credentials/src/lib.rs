//! # Credentials
//!
//! Credential Resolver: fetches per-destination connection secrets and
//! decodes them strictly into `DestinationProfile`s.
//!
//! Secret material is never logged; errors name fields, not values.

pub mod error;
mod payload;
pub mod resolver;
pub mod stores;

pub use error::{CredentialError, Result};
pub use resolver::CredentialResolver;
pub use stores::{
    ConfiguredSecretStore, DirectorySecretStore, EnvSecretStore, StaticSecretStore,
    ENV_SECRET_PREFIX,
};
