//! Credential Resolver
//!
//! Resolves every configured destination into a `DestinationProfile` once
//! per invocation. Each secret name is fetched at most once per resolver.

use std::collections::{BTreeMap, HashMap};

use contracts::{ContractError, DestinationConfig, DestinationId, DestinationProfile, SecretStore};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::payload::{decode_profile, parse_payload};

/// Per-invocation credential resolver
pub struct CredentialResolver<S: SecretStore> {
    store: S,
    cache: HashMap<String, Map<String, Value>>,
}

impl<S: SecretStore> CredentialResolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve a destination set
    ///
    /// `default_remote_root` applies to destinations without their own
    /// `remote_root`.
    ///
    /// # Errors
    /// `CredentialUnavailable` when any secret cannot be fetched or any
    /// destination's entry cannot be decoded. Resolution is all-or-nothing.
    #[instrument(
        name = "credentials_resolve",
        skip(self, destinations),
        fields(store = self.store.name(), destinations = destinations.len())
    )]
    pub async fn resolve(
        &mut self,
        destinations: &[DestinationConfig],
        default_remote_root: &str,
    ) -> Result<BTreeMap<DestinationId, DestinationProfile>, ContractError> {
        let mut by_secret: BTreeMap<&str, Vec<DestinationId>> = BTreeMap::new();
        for destination in destinations {
            by_secret
                .entry(destination.secret_name.as_str())
                .or_default()
                .push(destination.id.clone());
        }

        let mut profiles = BTreeMap::new();
        for destination in destinations {
            let secret_name = destination.secret_name.as_str();
            let sharing = by_secret
                .get(secret_name)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let payload = self.payload(secret_name).await?;
            let remote_root = destination
                .remote_root
                .as_deref()
                .unwrap_or(default_remote_root);

            let profile = decode_profile(secret_name, payload, &destination.id, sharing, remote_root)
                .map_err(|e| {
                    warn!(
                        secret_name,
                        destination = %destination.id,
                        error = %e,
                        "credential decode failed"
                    );
                    ContractError::from(e)
                })?;

            debug!(
                destination = %profile.id,
                address = %profile.address(),
                auth = profile.identity.method(),
                "destination resolved"
            );
            profiles.insert(profile.id.clone(), profile);
        }

        info!(resolved = profiles.len(), "credentials resolved");
        Ok(profiles)
    }

    async fn payload(&mut self, secret_name: &str) -> Result<&Map<String, Value>, ContractError> {
        if !self.cache.contains_key(secret_name) {
            let raw = self.store.get_secret(secret_name).await.map_err(|e| {
                warn!(secret_name, error = %e, "secret fetch failed");
                e
            })?;
            let parsed = parse_payload(secret_name, &raw)?;
            self.cache.insert(secret_name.to_string(), parsed);
        }
        self.cache.get(secret_name).ok_or_else(|| {
            ContractError::credential_unavailable(secret_name, "payload cache miss")
        })
    }
}
