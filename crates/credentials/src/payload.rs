//! Secret payload decoding
//!
//! Three accepted shapes:
//! - single: `{"host", "port", "username", ...}`
//! - nested: `{"destinations": {"<id>": {single shape}}}`
//! - prefixed flat: `{"<id>_host", "<id>_port", ...}`
//!
//! A payload with neither key nor password means network trust: the
//! username becomes optional and the session authenticates with `none`.
//! Key or password entries still require a username.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use contracts::{DestinationId, DestinationProfile, Identity, SecretString, DEFAULT_USERNAME};
use serde_json::{Map, Value};

use crate::error::{CredentialError, Result};

const KNOWN_FIELDS: &[&str] = &[
    "host",
    "port",
    "username",
    "private_key",
    "private_key_encoding",
    "passphrase",
    "password",
];

/// Parse the raw payload text into a JSON object
pub(crate) fn parse_payload(secret_name: &str, raw: &str) -> Result<Map<String, Value>> {
    // serde_json errors quote offending input; drop them
    let value: Value = serde_json::from_str(raw).map_err(|_| CredentialError::InvalidJson {
        secret_name: secret_name.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CredentialError::NotAnObject {
            secret_name: secret_name.to_string(),
            destination: "*".to_string(),
        }),
    }
}

/// Extract the connection profile for one destination
///
/// `sharing` lists every destination id that references the same secret.
pub(crate) fn decode_profile(
    secret_name: &str,
    payload: &Map<String, Value>,
    destination: &DestinationId,
    sharing: &[DestinationId],
    remote_root: &str,
) -> Result<DestinationProfile> {
    let fields = select_entry(secret_name, payload, destination, sharing)?;
    let decoder = EntryDecoder {
        secret_name,
        destination: destination.as_str(),
        fields: &fields,
    };
    decoder.decode(destination.clone(), remote_root)
}

fn select_entry(
    secret_name: &str,
    payload: &Map<String, Value>,
    destination: &DestinationId,
    sharing: &[DestinationId],
) -> Result<Map<String, Value>> {
    if let Some(nested) = payload.get("destinations") {
        let entry = nested
            .as_object()
            .ok_or_else(|| CredentialError::NotAnObject {
                secret_name: secret_name.to_string(),
                destination: "destinations".to_string(),
            })?
            .get(destination.as_str())
            .ok_or_else(|| CredentialError::MissingDestination {
                secret_name: secret_name.to_string(),
                destination: destination.to_string(),
            })?;
        return entry
            .as_object()
            .cloned()
            .ok_or_else(|| CredentialError::NotAnObject {
                secret_name: secret_name.to_string(),
                destination: destination.to_string(),
            });
    }

    if payload.contains_key("host") {
        if sharing.len() > 1 {
            return Err(CredentialError::AmbiguousPayload {
                secret_name: secret_name.to_string(),
                destinations: sharing.iter().map(|d| d.to_string()).collect(),
            });
        }
        return Ok(payload.clone());
    }

    let prefix = format!("{destination}_");
    // Keys of a sharing destination whose id extends this one (`op1` vs `op1_b`)
    let longer: Vec<String> = sharing
        .iter()
        .filter(|other| other.len() > destination.len() && other.starts_with(prefix.as_str()))
        .map(|other| format!("{other}_"))
        .collect();
    let entry: Map<String, Value> = payload
        .iter()
        .filter(|(k, _)| !longer.iter().any(|p| k.starts_with(p.as_str())))
        .filter_map(|(k, v)| {
            k.strip_prefix(&prefix)
                .map(|field| (field.to_string(), v.clone()))
        })
        .collect();

    if entry.is_empty() {
        return Err(CredentialError::MissingDestination {
            secret_name: secret_name.to_string(),
            destination: destination.to_string(),
        });
    }
    Ok(entry)
}

struct EntryDecoder<'a> {
    secret_name: &'a str,
    destination: &'a str,
    fields: &'a Map<String, Value>,
}

impl EntryDecoder<'_> {
    fn decode(&self, id: DestinationId, remote_root: &str) -> Result<DestinationProfile> {
        if let Some(unknown) = self
            .fields
            .keys()
            .find(|k| !KNOWN_FIELDS.contains(&k.as_str()))
        {
            return Err(CredentialError::UnknownField {
                secret_name: self.secret_name.to_string(),
                destination: self.destination.to_string(),
                field: unknown.clone(),
            });
        }

        let host = self.required_str("host")?;
        let port = self.port()?;
        let identity = self.identity()?;
        let username = match identity {
            Identity::None => self
                .optional_str("username")?
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            _ => self.required_str("username")?,
        };

        Ok(DestinationProfile {
            id,
            host,
            port,
            username,
            identity,
            remote_root: remote_root.to_string(),
        })
    }

    fn identity(&self) -> Result<Identity> {
        if let Some(key) = self.optional_str("private_key")? {
            let key_pem = match self.optional_str("private_key_encoding")?.as_deref() {
                None | Some("raw") => key,
                Some("base64") => self.decode_base64(&key)?,
                Some(_) => {
                    return Err(self.malformed("private_key_encoding", "expected 'raw' or 'base64'"))
                }
            };
            let passphrase = self.optional_str("passphrase")?.map(SecretString::new);
            return Ok(Identity::PrivateKey {
                key_pem: SecretString::new(key_pem),
                passphrase,
            });
        }

        if let Some(password) = self.optional_str("password")? {
            return Ok(Identity::Password(SecretString::new(password)));
        }

        if self.fields.contains_key("passphrase") || self.fields.contains_key("private_key_encoding")
        {
            return Err(self.missing("private_key"));
        }
        Ok(Identity::None)
    }

    fn decode_base64(&self, encoded: &str) -> Result<String> {
        let compact: String = encoded.split_whitespace().collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| self.malformed("private_key", "invalid base64"))?;
        String::from_utf8(bytes).map_err(|_| self.malformed("private_key", "decoded key is not UTF-8"))
    }

    fn port(&self) -> Result<u16> {
        let value = self.fields.get("port").ok_or_else(|| self.missing("port"))?;
        let port = match value {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.trim().parse::<u16>().ok(),
            _ => None,
        };
        match port {
            Some(p) if p > 0 => Ok(p),
            _ => Err(self.malformed("port", "expected an integer in 1..=65535")),
        }
    }

    fn required_str(&self, field: &str) -> Result<String> {
        self.optional_str(field)?.ok_or_else(|| self.missing(field))
    }

    /// Empty strings count as absent
    fn optional_str(&self, field: &str) -> Result<Option<String>> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.malformed(field, "expected a string")),
        }
    }

    fn missing(&self, field: &str) -> CredentialError {
        CredentialError::MissingField {
            secret_name: self.secret_name.to_string(),
            destination: self.destination.to_string(),
            field: field.to_string(),
        }
    }

    fn malformed(&self, field: &str, reason: &str) -> CredentialError {
        CredentialError::MalformedField {
            secret_name: self.secret_name.to_string(),
            destination: self.destination.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
