// sandbox.rs — Resolve `file://` evidence references inside a sandbox root.
//
// Containment is checked twice. First lexically, before the filesystem is
// touched: `.` and `..` are folded against the absolute path and the result
// must lie under the root. A reference that escapes this way is rejected the
// same whether or not its target exists. Then on canonical paths, so a
// symlink inside the root cannot point outside it. Both checks compare path
// components; a textual prefix check would let `/data/evidence-other` pass
// for root `/data/evidence`.

use std::path::{Component, Path, PathBuf};

use crate::error::EvidenceError;

const FILE_SCHEME: &str = "file://";

/// Turn a `file://` URI into a path. Relative paths are joined onto `base_dir`.
pub fn resolve_uri(uri: &str, base_dir: &Path) -> Result<PathBuf, EvidenceError> {
    let rest = uri
        .trim()
        .strip_prefix(FILE_SCHEME)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| EvidenceError::UnsupportedUri {
            uri: uri.to_string(),
        })?;
    let path = Path::new(rest);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(base_dir.join(path))
    }
}

/// Require `path` to be a regular file under `root`; returns its canonical
/// form.
pub fn confine(path: &Path, root: &Path) -> Result<PathBuf, EvidenceError> {
    let lexical_root = normalize_lexically(&absolute(root)?);
    let lexical = normalize_lexically(&absolute(path)?);
    if !lexical.starts_with(&lexical_root) {
        return Err(escapes(path, &lexical_root));
    }

    let canonical_root = root
        .canonicalize()
        .map_err(|source| EvidenceError::ReadFailed {
            path: root.to_path_buf(),
            source,
        })?;
    let canonical = path.canonicalize().map_err(|_| EvidenceError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    if !canonical.starts_with(&canonical_root) {
        return Err(escapes(path, &canonical_root));
    }
    if !canonical.is_file() {
        return Err(EvidenceError::NotAFile { path: canonical });
    }
    Ok(canonical)
}

fn escapes(path: &Path, root: &Path) -> EvidenceError {
    tracing::warn!(
        path = %path.display(),
        root = %root.display(),
        "evidence path escapes sandbox root"
    );
    EvidenceError::EscapesSandbox {
        path: path.to_path_buf(),
    }
}

fn absolute(path: &Path) -> Result<PathBuf, EvidenceError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| EvidenceError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Fold `.` and `..` without consulting the filesystem. `..` never climbs
/// above the filesystem root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
