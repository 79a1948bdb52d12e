// engine.rs — Impact policy lookups.
//
// The policy answers three questions and nothing else:
//
// 1. Which impact class does this tool belong to?      → impact_of()
// 2. Does that class require an Action Proposal?       → requires_pic()
// 3. Does that class require trusted-backed evidence?  → requires_evidence()
//
// Tools the policy does not classify pass through without a proposal. Once a
// tool is classified into a governed class, everything downstream fails
// closed. Money, privacy and irreversible are governed whatever the
// configured sets say.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use pic_proposal::ImpactClass;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;

/// Environment variable naming an explicit policy file.
pub const POLICY_PATH_ENV: &str = "PIC_POLICY_PATH";

/// Conventional policy file name, looked up in the working directory.
pub const DEFAULT_POLICY_FILE: &str = "pic_policy.json";

fn high_impact_set() -> BTreeSet<ImpactClass> {
    ImpactClass::ALL
        .iter()
        .copied()
        .filter(ImpactClass::is_high_impact)
        .collect()
}

/// Operator policy mapping tools to impact classes.
///
/// Loaded once and read-only for the lifetime of every evaluation that uses
/// it. Reloading means building a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEngine {
    #[serde(default)]
    pub impact_by_tool: BTreeMap<String, ImpactClass>,
    #[serde(default = "high_impact_set")]
    pub require_pic_for_impacts: BTreeSet<ImpactClass>,
    #[serde(default = "high_impact_set")]
    pub require_evidence_for_impacts: BTreeSet<ImpactClass>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self {
            impact_by_tool: BTreeMap::new(),
            require_pic_for_impacts: high_impact_set(),
            require_evidence_for_impacts: high_impact_set(),
        }
    }
}

impl PolicyEngine {
    /// Classify a tool, or `None` if the policy does not know it.
    pub fn impact_of(&self, tool_name: &str) -> Option<ImpactClass> {
        self.impact_by_tool.get(tool_name.trim()).copied()
    }

    pub fn requires_pic(&self, impact: ImpactClass) -> bool {
        impact.is_high_impact() || self.require_pic_for_impacts.contains(&impact)
    }

    pub fn requires_evidence(&self, impact: ImpactClass) -> bool {
        impact.is_high_impact() || self.require_evidence_for_impacts.contains(&impact)
    }

    /// Whether a call to `tool_name` must carry a proposal.
    pub fn tool_requires_pic(&self, tool_name: &str) -> bool {
        self.impact_of(tool_name)
            .map(|impact| self.requires_pic(impact))
            .unwrap_or(false)
    }

    /// Build a policy from a parsed JSON document.
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        Self::parse(value, None)
    }

    /// Load a policy file from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, PolicyError> {
        if !path.exists() {
            return Err(PolicyError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| PolicyError::Invalid {
            path: Some(path.to_path_buf()),
            reason: e.to_string(),
        })?;
        let policy = Self::parse(&value, Some(path))?;
        tracing::debug!(
            path = %path.display(),
            tools = policy.impact_by_tool.len(),
            "loaded impact policy"
        );
        Ok(policy)
    }

    fn parse(value: &Value, path: Option<&Path>) -> Result<Self, PolicyError> {
        let invalid = |reason: String| PolicyError::Invalid {
            path: path.map(Path::to_path_buf),
            reason,
        };
        if !value.is_object() {
            return Err(invalid("policy must be a JSON object".into()));
        }
        let policy: PolicyEngine =
            serde_json::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?;
        if policy.impact_by_tool.keys().any(|t| t.trim().is_empty()) {
            return Err(PolicyError::EmptyToolName);
        }
        Ok(policy)
    }
}

/// The resolved policy source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    Explicit(PathBuf),
    Local(PathBuf),
    BuiltIn,
}

impl PolicySource {
    /// Explicit path, else `./pic_policy.json` if present, else the built-in
    /// default policy.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Self {
        if let Some(path) = explicit {
            return PolicySource::Explicit(path.to_path_buf());
        }
        let local = cwd.join(DEFAULT_POLICY_FILE);
        if local.is_file() {
            PolicySource::Local(local)
        } else {
            PolicySource::BuiltIn
        }
    }

    /// Like [`resolve`](Self::resolve), consulting `PIC_POLICY_PATH` when no
    /// explicit path is given.
    pub fn from_env(explicit: Option<&Path>, cwd: &Path) -> Self {
        let env_path = std::env::var_os(POLICY_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::resolve(explicit.or(env_path.as_deref()), cwd)
    }

    pub fn load(&self) -> Result<PolicyEngine, PolicyError> {
        match self {
            PolicySource::Explicit(p) | PolicySource::Local(p) => PolicyEngine::from_json_file(p),
            PolicySource::BuiltIn => Ok(PolicyEngine::default()),
        }
    }
}

impl std::fmt::Display for PolicySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicySource::Explicit(p) => write!(f, "{}", p.display()),
            PolicySource::Local(p) => write!(f, "{} (local)", p.display()),
            PolicySource::BuiltIn => f.write_str("(built-in default)"),
        }
    }
}
