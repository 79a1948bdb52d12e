// hasher.rs — Bounded SHA-256 hashing of evidence artifacts.
//
// All digests are SHA-256, lowercase hex. Files are streamed through the
// hasher rather than read into memory, and the stream is capped at
// `max_bytes + 1` so a file that grows between the size check and the read
// is still caught as oversize.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::EvidenceError;

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash everything `reader` yields, up to `max_bytes`.
///
/// Returns the digest and the number of bytes hashed.
pub fn hash_reader_capped<R: Read>(reader: R, max_bytes: u64) -> io::Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let copied = io::copy(&mut reader.take(max_bytes.saturating_add(1)), &mut hasher)?;
    Ok((format!("{:x}", hasher.finalize()), copied))
}

/// Hash a file on disk, failing if it holds more than `max_bytes`.
pub fn hash_file_capped(path: &Path, max_bytes: u64) -> Result<String, EvidenceError> {
    let file = File::open(path).map_err(|source| EvidenceError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let (digest, size) =
        hash_reader_capped(file, max_bytes).map_err(|source| EvidenceError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
    if size > max_bytes {
        return Err(EvidenceError::TooLarge {
            size,
            max: max_bytes,
        });
    }
    Ok(digest)
}

/// Normalize a declared digest to lowercase hex, rejecting anything that is
/// not exactly 64 hex digits.
pub fn normalize_digest(declared: &str) -> Result<String, EvidenceError> {
    let d = declared.trim();
    if d.len() != 64 || !d.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EvidenceError::InvalidDigest {
            value: declared.to_string(),
        });
    }
    Ok(d.to_ascii_lowercase())
}
