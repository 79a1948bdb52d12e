// source.rs — Where the keyring comes from.
//
// Exactly one source is used, chosen in order:
//
//   1. an explicit path (CLI flag, config file, or PIC_KEYS_PATH)
//   2. ./pic_keys.json in the working directory
//   3. nothing: an empty keyring that trusts no signer
//
// An explicit path that does not exist is an error. The conventional local
// file is only used when present.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::KeyringError;
use crate::keyring::TrustedKeyRing;

/// Environment variable naming an explicit keyring file.
pub const KEYS_PATH_ENV: &str = "PIC_KEYS_PATH";

/// Conventional keyring file name, looked up in the working directory.
pub const DEFAULT_KEYS_FILE: &str = "pic_keys.json";

/// The resolved keyring source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyringSource {
    Explicit(PathBuf),
    Local(PathBuf),
    Empty,
}

impl KeyringSource {
    /// Resolve the source from an optional explicit path and a working dir.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Self {
        if let Some(path) = explicit {
            return KeyringSource::Explicit(path.to_path_buf());
        }
        let local = cwd.join(DEFAULT_KEYS_FILE);
        if local.is_file() {
            KeyringSource::Local(local)
        } else {
            KeyringSource::Empty
        }
    }

    /// Like [`resolve`](Self::resolve), but falls back to `PIC_KEYS_PATH`
    /// when no explicit path is given.
    pub fn from_env(explicit: Option<&Path>, cwd: &Path) -> Self {
        let env_path = std::env::var_os(KEYS_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::resolve(explicit.or(env_path.as_deref()), cwd)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            KeyringSource::Explicit(p) | KeyringSource::Local(p) => Some(p),
            KeyringSource::Empty => None,
        }
    }

    /// Load the keyring this source points at.
    pub fn load(&self) -> Result<TrustedKeyRing, KeyringError> {
        match self.path() {
            Some(path) => TrustedKeyRing::from_json_file(path),
            None => {
                tracing::debug!("no keyring configured; signature evidence will not verify");
                Ok(TrustedKeyRing::empty())
            }
        }
    }
}

impl fmt::Display for KeyringSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyringSource::Explicit(p) => write!(f, "{}", p.display()),
            KeyringSource::Local(p) => write!(f, "{} (local)", p.display()),
            KeyringSource::Empty => f.write_str("(none)"),
        }
    }
}
