// error.rs — Why a single evidence entry failed to verify.
//
// These are verification outcomes, not faults: every variant becomes a
// failed `EvidenceResult` and, in the pipeline, PIC_EVIDENCE_FAILED.
//
// Display strings never contain filesystem paths; they reach the caller
// unconditionally. The offending path is available through `path()` and is
// only surfaced as a diagnostic detail.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvidenceError {
    /// Only `file://` references are resolved. Nothing is fetched remotely.
    #[error("unsupported evidence uri: '{uri}'")]
    UnsupportedUri { uri: String },

    #[error("Evidence file not found")]
    FileNotFound { path: PathBuf },

    /// The path lies outside the sandbox root, lexically or after
    /// resolving symlinks.
    #[error("evidence path escapes sandbox root")]
    EscapesSandbox { path: PathBuf },

    #[error("evidence path is not a regular file")]
    NotAFile { path: PathBuf },

    #[error("evidence file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("failed to read evidence file: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The declared digest is not 64 hex digits.
    #[error("invalid sha256 digest '{value}'")]
    InvalidDigest { value: String },

    #[error("sha256 mismatch: expected {expected}, got {actual}")]
    Sha256Mismatch { expected: String, actual: String },

    /// The signer key is not usable: missing, revoked or expired.
    #[error("signer key {status}: '{key_id}'")]
    SignerKey {
        key_id: String,
        status: &'static str,
    },

    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,

    #[error("signature verification failed")]
    SignatureFailed,
}

impl EvidenceError {
    /// The filesystem path involved, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            EvidenceError::FileNotFound { path }
            | EvidenceError::EscapesSandbox { path }
            | EvidenceError::NotAFile { path }
            | EvidenceError::ReadFailed { path, .. } => Some(path),
            _ => None,
        }
    }
}
