//! Destination identity and connection profiles
//!
//! `DestinationId` uses `Arc<str>` internally so that cloning it into every
//! per-destination task is a reference count bump.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Stable identifier of one configured remote endpoint.
///
/// # Examples
/// ```
/// use contracts::DestinationId;
///
/// let id: DestinationId = "op1".into();
/// let id2 = id.clone();
/// assert_eq!(id, id2);
/// assert_eq!(id.as_str(), "op1");
/// ```
#[derive(Clone, Default)]
pub struct DestinationId(Arc<str>);

impl DestinationId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for DestinationId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for DestinationId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DestinationId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DestinationId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for DestinationId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DestinationId({:?})", self.0)
    }
}

impl PartialEq for DestinationId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for DestinationId {}

impl PartialEq<str> for DestinationId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for DestinationId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl PartialOrd for DestinationId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DestinationId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// Same as str hash so `&str` lookups work
impl Hash for DestinationId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for DestinationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DestinationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

/// String whose contents never appear in `Debug` or `Display` output
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

/// How the relay authenticates to a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// PEM/OpenSSH private key material, already decoded
    PrivateKey {
        key_pem: SecretString,
        passphrase: Option<SecretString>,
    },
    /// Fallback when no key material is configured
    Password(SecretString),
    /// Network trust: the endpoint admits the relay without credentials
    None,
}

impl Identity {
    /// Auth method name, safe to log
    pub fn method(&self) -> &'static str {
        match self {
            Self::PrivateKey { .. } => "publickey",
            Self::Password(_) => "password",
            Self::None => "none",
        }
    }
}

/// Login name sent when a network-trust payload names no user
pub const DEFAULT_USERNAME: &str = "weather-relay";

/// One configured remote endpoint with resolved credentials
///
/// Resolved fresh every invocation so that rotated secrets take effect
/// without a redeploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationProfile {
    pub id: DestinationId,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub identity: Identity,
    /// Root directory on the endpoint under which partitions are written
    pub remote_root: String,
}

impl DestinationProfile {
    /// `host:port`, used for connecting and logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
