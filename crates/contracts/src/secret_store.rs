//! SecretStore trait - read-only source of credential payloads

use crate::ContractError;

/// Read-only secret store
///
/// Returns the raw payload for a logical secret name. Decoding into typed
/// profiles is the Credential Resolver's job.
#[trait_variant::make(SecretStore: Send)]
pub trait LocalSecretStore {
    /// Backend name (used for logging)
    fn name(&self) -> &str;

    /// Fetch the payload of one secret
    ///
    /// # Errors
    /// `CredentialUnavailable` when the store cannot be reached or the
    /// secret does not exist
    async fn get_secret(&self, secret_name: &str) -> Result<String, ContractError>;
}
