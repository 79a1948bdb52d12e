//! # pic-keyring
//!
//! Trusted signer keys for PIC signature evidence.
//!
//! A [`TrustedKeyRing`] is loaded once from a single [`KeyringSource`] and is
//! read-only afterwards. Public keys may be written as base64, hex (with or
//! without `0x`) or PEM; all are normalized to raw 32-byte Ed25519 keys at
//! load time, so a malformed key fails the load, naming its key id.
//!
//! ## Key invariants
//!
//! - **Revocation wins**: a revoked key is `revoked` even if it has not expired.
//! - **UTC only**: expiry is compared against a UTC instant; naive timestamps
//!   are read as UTC.
//! - **Pure lookups**: [`TrustedKeyRing::status`] depends only on its inputs.

pub mod encoding;
pub mod error;
pub mod keyring;
pub mod source;

pub use encoding::{decode_base64_lenient, decode_public_key, KeyEncoding};
pub use error::KeyringError;
pub use keyring::{
    example_keyring, parse_expiry, KeyStatus, PublicKeyBytes, TrustedKey, TrustedKeyRing,
};
pub use source::{KeyringSource, DEFAULT_KEYS_FILE, KEYS_PATH_ENV};
