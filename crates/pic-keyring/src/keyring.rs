// keyring.rs — Trusted signer keys with revocation and expiry.
//
// A keyring document comes in two shapes:
//
//   recommended: { "trusted_keys": { id: key | {public_key, expires_at?} },
//                  "revoked_keys": [id, ...] }
//   legacy:      { id: key, ... }
//
// Keys are decoded once at load time. After that, `status()` is a pure
// function of (key_id, now, keyring): revocation beats everything, then
// absence, then expiry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};

use crate::encoding::{decode_public_key, ED25519_PUBLIC_KEY_LEN};
use crate::error::KeyringError;

/// A decoded Ed25519 public key.
pub type PublicKeyBytes = [u8; ED25519_PUBLIC_KEY_LEN];

/// Result of looking up a signer at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    Ok(PublicKeyBytes),
    Missing,
    Revoked,
    Expired,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Ok(_) => "ok",
            KeyStatus::Missing => "missing",
            KeyStatus::Revoked => "revoked",
            KeyStatus::Expired => "expired",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, KeyStatus::Ok(_))
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trusted signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey {
    pub key_id: String,
    pub public_key: PublicKeyBytes,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TrustedKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// The set of trusted signer keys plus revocations.
///
/// Read-only after load. Share it behind an `Arc` across evaluations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedKeyRing {
    keys: BTreeMap<String, TrustedKey>,
    revoked: BTreeSet<String>,
}

impl TrustedKeyRing {
    /// A keyring that trusts nobody.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add (or replace) a trusted key.
    pub fn insert(&mut self, key: TrustedKey) {
        self.keys.insert(key.key_id.clone(), key);
    }

    /// Mark a key id as revoked. The id need not have a key.
    pub fn revoke(&mut self, key_id: impl Into<String>) {
        self.revoked.insert(key_id.into());
    }

    /// Classify `key_id` at instant `now`.
    ///
    /// Precedence: revoked, then missing, then expired, then ok. Surrounding
    /// whitespace in `key_id` is ignored, as it is when the keyring loads.
    pub fn status(&self, key_id: &str, now: DateTime<Utc>) -> KeyStatus {
        let key_id = key_id.trim();
        if self.revoked.contains(key_id) {
            return KeyStatus::Revoked;
        }
        match self.keys.get(key_id) {
            None => KeyStatus::Missing,
            Some(key) if key.is_expired(now) => KeyStatus::Expired,
            Some(key) => KeyStatus::Ok(key.public_key),
        }
    }

    pub fn get(&self, key_id: &str) -> Option<&TrustedKey> {
        self.keys.get(key_id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TrustedKey> {
        self.keys.values()
    }

    pub fn revoked_ids(&self) -> impl Iterator<Item = &str> {
        self.revoked.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parse a keyring JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, KeyringError> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| KeyringError::Malformed(format!("not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    /// Load a keyring file from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, KeyringError> {
        if !path.exists() {
            return Err(KeyringError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| KeyringError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| KeyringError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        let ring = Self::from_value(&value)?;
        tracing::debug!(
            path = %path.display(),
            keys = ring.len(),
            revoked = ring.revoked.len(),
            "loaded keyring"
        );
        Ok(ring)
    }

    /// Build a keyring from an already-parsed document, recommended or legacy.
    pub fn from_value(value: &Value) -> Result<Self, KeyringError> {
        let obj = value
            .as_object()
            .ok_or_else(|| KeyringError::Malformed("keyring must be a JSON object".into()))?;

        let is_recommended = obj.contains_key("trusted_keys") || obj.contains_key("revoked_keys");
        let mut ring = Self::empty();

        if !is_recommended {
            for (key_id, entry) in obj {
                ring.insert(parse_entry(key_id, entry)?);
            }
            return Ok(ring);
        }

        match obj.get("trusted_keys") {
            None | Some(Value::Null) => {}
            Some(Value::Object(keys)) => {
                for (key_id, entry) in keys {
                    ring.insert(parse_entry(key_id, entry)?);
                }
            }
            Some(_) => {
                return Err(KeyringError::Malformed(
                    "trusted_keys must be an object".into(),
                ))
            }
        }

        match obj.get("revoked_keys") {
            None | Some(Value::Null) => {}
            Some(Value::Array(ids)) => {
                for id in ids {
                    match id.as_str().map(str::trim) {
                        Some(s) if !s.is_empty() => ring.revoke(s),
                        _ => {
                            return Err(KeyringError::Malformed(
                                "revoked_keys entries must be non-empty strings".into(),
                            ))
                        }
                    }
                }
            }
            Some(_) => {
                return Err(KeyringError::Malformed(
                    "revoked_keys must be an array".into(),
                ))
            }
        }

        Ok(ring)
    }
}

fn parse_entry(key_id: &str, entry: &Value) -> Result<TrustedKey, KeyringError> {
    let key_id = key_id.trim();
    if key_id.is_empty() {
        return Err(KeyringError::EmptyKeyId);
    }

    let (encoded, expires_at) = match entry {
        Value::String(s) => (s.as_str(), None),
        Value::Object(fields) => {
            let encoded = fields
                .get("public_key")
                .and_then(Value::as_str)
                .ok_or_else(|| KeyringError::InvalidKey {
                    key_id: key_id.to_string(),
                    reason: "missing string field 'public_key'".to_string(),
                })?;
            (encoded, parse_expiry_field(key_id, fields)?)
        }
        _ => {
            return Err(KeyringError::InvalidKey {
                key_id: key_id.to_string(),
                reason: "entry must be a key string or an object".to_string(),
            })
        }
    };

    let raw = decode_public_key(encoded).map_err(|reason| KeyringError::InvalidKey {
        key_id: key_id.to_string(),
        reason,
    })?;
    let public_key: PublicKeyBytes =
        raw.as_slice().try_into().map_err(|_| KeyringError::InvalidKeyLength {
            key_id: key_id.to_string(),
            len: raw.len(),
        })?;

    Ok(TrustedKey {
        key_id: key_id.to_string(),
        public_key,
        expires_at,
    })
}

fn parse_expiry_field(
    key_id: &str,
    fields: &Map<String, Value>,
) -> Result<Option<DateTime<Utc>>, KeyringError> {
    match fields.get("expires_at") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_expiry(s)
            .map(Some)
            .ok_or_else(|| KeyringError::InvalidExpiry {
                key_id: key_id.to_string(),
                value: s.clone(),
            }),
        Some(other) => Err(KeyringError::InvalidExpiry {
            key_id: key_id.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Parse an ISO-8601 instant. Values without an offset are taken as UTC.
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let v = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(v, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// An example keyring in the recommended format.
pub fn example_keyring() -> Value {
    json!({
        "trusted_keys": {
            "demo_signer_v1": "u1esUbs/ZYS3PTPMIxiwsh47pyCUAv5VgzrmjEKbw6k=",
            "demo_signer_v2": {
                "public_key": "u1esUbs/ZYS3PTPMIxiwsh47pyCUAv5VgzrmjEKbw6k=",
                "expires_at": "2030-12-31T23:59:59Z"
            }
        },
        "revoked_keys": ["compromised_signer_v0"]
    })
}
