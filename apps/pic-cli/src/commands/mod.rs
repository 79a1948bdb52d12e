// mod.rs — Shared bootstrap for `pic` subcommands.
//
// Every command that evaluates anything goes through `Bootstrap`: resolve the
// keyring and policy sources, load them, and build a Pipeline. Load failures
// are bootstrap errors (exit 1), never a Decision.

pub mod evidence;
pub mod keys;
pub mod policy;
pub mod schema;
pub mod serve;
pub mod signing;
pub mod verify;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use pic_keyring::{KeyringSource, TrustedKeyRing};
use pic_policy::{PolicyEngine, PolicySource};
use pic_proposal::{Decision, ErrorCode};
use pic_verifier::{Pipeline, PipelineOptions};

use crate::config::PicConfig;

pub const EXIT_OK: u8 = 0;
pub const EXIT_BOOTSTRAP: u8 = 1;
pub const EXIT_SCHEMA_INVALID: u8 = 2;
pub const EXIT_BLOCKED: u8 = 3;

/// Exit code for a Decision: 0 allowed, 2 schema invalid, 3 any other block.
pub fn decision_exit_code(decision: &Decision) -> ExitCode {
    match decision.code() {
        None => ExitCode::from(EXIT_OK),
        Some(ErrorCode::SchemaInvalid) => ExitCode::from(EXIT_SCHEMA_INVALID),
        Some(_) => ExitCode::from(EXIT_BLOCKED),
    }
}

/// Resolved configuration plus the project root it was resolved in.
pub struct Bootstrap {
    pub project_root: PathBuf,
    pub config: PicConfig,
}

impl Bootstrap {
    pub fn new(project_root: PathBuf, config: PicConfig) -> Self {
        Self {
            project_root,
            config,
        }
    }

    pub fn keyring_source(&self) -> KeyringSource {
        KeyringSource::resolve(self.config.keys_path.as_deref(), &self.project_root)
    }

    pub fn policy_source(&self) -> PolicySource {
        PolicySource::resolve(self.config.policy_path.as_deref(), &self.project_root)
    }

    pub fn load_keyring(&self) -> anyhow::Result<TrustedKeyRing> {
        let source = self.keyring_source();
        source
            .load()
            .with_context(|| format!("failed to load keyring from {}", source))
    }

    pub fn load_policy(&self) -> anyhow::Result<PolicyEngine> {
        let source = self.policy_source();
        source
            .load()
            .with_context(|| format!("failed to load policy from {}", source))
    }

    /// Build a pipeline whose relative evidence paths resolve against
    /// `base_dir`.
    pub fn pipeline(&self, base_dir: &Path) -> anyhow::Result<Pipeline> {
        let policy = self.load_policy()?;
        let keyring = self.load_keyring()?;
        tracing::debug!(
            policy = %self.policy_source(),
            keyring = %self.keyring_source(),
            tools = policy.impact_by_tool.len(),
            keys = keyring.len(),
            "pipeline bootstrapped"
        );
        Ok(Pipeline::new(Arc::new(policy), Arc::new(keyring))
            .with_limits(self.config.limits.clone())
            .with_options(PipelineOptions {
                verify_evidence: self.config.verify_evidence,
                proposal_base_dir: base_dir.to_path_buf(),
                debug: self.config.debug,
            }))
    }
}

/// Directory holding `file`, used as the base for relative evidence URIs.
pub fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
