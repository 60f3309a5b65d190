//! Secret store backends

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use contracts::{ContractError, SecretStore, SecretStoreConfig};
use tracing::debug;

/// Environment variable prefix for `EnvSecretStore`
pub const ENV_SECRET_PREFIX: &str = "WEATHER_RELAY_SECRET_";

/// One `<name>.json` file per secret (mounted secrets volume)
#[derive(Debug, Clone)]
pub struct DirectorySecretStore {
    root: PathBuf,
}

impl DirectorySecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, secret_name: &str) -> Result<PathBuf, ContractError> {
        let valid = !secret_name.is_empty()
            && secret_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !secret_name.starts_with('.');
        if !valid {
            return Err(ContractError::credential_unavailable(
                secret_name,
                "secret name contains unsupported characters",
            ));
        }
        Ok(self.root.join(format!("{secret_name}.json")))
    }
}

impl SecretStore for DirectorySecretStore {
    fn name(&self) -> &str {
        "directory"
    }

    async fn get_secret(&self, secret_name: &str) -> Result<String, ContractError> {
        let path = self.path_for(secret_name)?;
        debug!(secret_name, path = %path.display(), "reading secret file");
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            ContractError::credential_unavailable(
                secret_name,
                format!("cannot read {}: {}", path.display(), e.kind()),
            )
        })
    }
}

/// JSON payloads in `WEATHER_RELAY_SECRET_<NAME>` variables
///
/// `<NAME>` is the secret name upper-cased with every non-alphanumeric
/// character replaced by `_` (`onprem-credentials` becomes
/// `WEATHER_RELAY_SECRET_ONPREM_CREDENTIALS`).
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn variable_for(secret_name: &str) -> String {
        let suffix: String = secret_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{ENV_SECRET_PREFIX}{suffix}")
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_secret(&self, secret_name: &str) -> Result<String, ContractError> {
        let variable = Self::variable_for(secret_name);
        debug!(secret_name, variable = %variable, "reading secret variable");
        std::env::var(&variable).map_err(|e| {
            ContractError::credential_unavailable(secret_name, format!("{variable}: {e}"))
        })
    }
}

/// In-memory store; counts fetches
#[derive(Debug, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, payload: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), payload.into());
        self
    }

    /// Number of `get_secret` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl SecretStore for StaticSecretStore {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_secret(&self, secret_name: &str) -> Result<String, ContractError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.secrets.get(secret_name).cloned().ok_or_else(|| {
            ContractError::credential_unavailable(secret_name, "secret not found")
        })
    }
}

/// Backend selected by `[secrets]` configuration
#[derive(Debug, Clone)]
pub enum ConfiguredSecretStore {
    Env(EnvSecretStore),
    Directory(DirectorySecretStore),
}

impl ConfiguredSecretStore {
    pub fn from_config(config: &SecretStoreConfig) -> Self {
        match config {
            SecretStoreConfig::Env => Self::Env(EnvSecretStore),
            SecretStoreConfig::Directory { path } => {
                Self::Directory(DirectorySecretStore::new(path))
            }
        }
    }
}

impl SecretStore for ConfiguredSecretStore {
    fn name(&self) -> &str {
        match self {
            Self::Env(s) => s.name(),
            Self::Directory(s) => s.name(),
        }
    }

    async fn get_secret(&self, secret_name: &str) -> Result<String, ContractError> {
        match self {
            Self::Env(s) => s.get_secret(secret_name).await,
            Self::Directory(s) => s.get_secret(secret_name).await,
        }
    }
}
