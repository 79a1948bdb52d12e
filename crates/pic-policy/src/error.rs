// error.rs — Error types for the policy subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// An explicitly configured policy file does not exist.
    #[error("policy file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read the policy file.
    #[error("failed to read policy at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The policy document is not valid JSON, has the wrong shape, or names
    /// an unknown impact class.
    #[error("invalid policy{}: {reason}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Invalid {
        path: Option<PathBuf>,
        reason: String,
    },

    /// A tool name in `impact_by_tool` is empty.
    #[error("impact_by_tool contains an empty tool name")]
    EmptyToolName,
}
