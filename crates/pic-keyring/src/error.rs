// error.rs — Error types for keyring loading.
//
// Every load-time failure names the file or the key id it concerns, so an
// operator can fix the keyring without guessing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or parsing a keyring.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// An explicitly configured keyring file does not exist.
    #[error("keyring file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read the keyring file.
    #[error("failed to read keyring at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The keyring file is not valid JSON.
    #[error("invalid JSON in keyring file {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The keyring document has the wrong shape.
    #[error("invalid keyring: {0}")]
    Malformed(String),

    /// A key id is empty or whitespace.
    #[error("key_id must be a non-empty string")]
    EmptyKeyId,

    /// A public key could not be decoded.
    #[error("invalid public key for '{key_id}': {reason}")]
    InvalidKey { key_id: String, reason: String },

    /// A public key decoded to the wrong number of bytes.
    #[error("public key for '{key_id}' has invalid length {len} bytes (expected 32 bytes for Ed25519)")]
    InvalidKeyLength { key_id: String, len: usize },

    /// An `expires_at` value is not an ISO-8601 datetime.
    #[error("invalid expires_at for '{key_id}': '{value}' (expected ISO-8601 datetime)")]
    InvalidExpiry { key_id: String, value: String },
}
