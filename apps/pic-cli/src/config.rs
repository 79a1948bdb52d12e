// config.rs — Project configuration for the `pic` binary.
//
// Three layers, later wins:
//
//   1. pic.toml in the project root (optional)
//   2. PIC_KEYS_PATH / PIC_POLICY_PATH / PIC_DEBUG
//   3. command-line flags (applied by the caller)
//
// Relative paths in pic.toml are resolved against the project root.

use std::path::{Path, PathBuf};

use anyhow::Context;
use pic_bridge::BridgeConfig;
use pic_keyring::KEYS_PATH_ENV;
use pic_policy::POLICY_PATH_ENV;
use pic_verifier::EvaluationLimits;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "pic.toml";
pub const DEBUG_ENV: &str = "PIC_DEBUG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PicConfig {
    /// Explicit keyring file.
    pub keys_path: Option<PathBuf>,
    /// Explicit policy file.
    pub policy_path: Option<PathBuf>,
    /// Verify evidence attached to proposals.
    pub verify_evidence: bool,
    /// Include diagnostic details in blocked Decisions.
    pub debug: bool,
    pub limits: EvaluationLimits,
    pub bridge: BridgeConfig,
}

impl PicConfig {
    /// Load `pic.toml` from `project_root` if it exists, else defaults.
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        let path = project_root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: PicConfig = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.resolve_relative(project_root);
        tracing::debug!(path = %path.display(), "loaded project config");
        Ok(config)
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply environment overrides from an arbitrary lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(p) = non_empty(KEYS_PATH_ENV) {
            self.keys_path = Some(PathBuf::from(p));
        }
        if let Some(p) = non_empty(POLICY_PATH_ENV) {
            self.policy_path = Some(PathBuf::from(p));
        }
        if let Some(v) = non_empty(DEBUG_ENV) {
            self.debug = is_truthy(&v);
        }
    }

    /// Fold `[bridge] debug` and the top-level `debug` into one value, so
    /// the pipeline and the bridge never disagree about diagnostic details.
    /// Either switch turns debug on for both.
    pub fn unify_debug(&mut self) {
        let debug = self.debug || self.bridge.debug;
        self.debug = debug;
        self.bridge.debug = debug;
    }

    fn resolve_relative(&mut self, root: &Path) {
        for path in [
            &mut self.keys_path,
            &mut self.policy_path,
            &mut self.limits.evidence_root_dir,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PicConfig::load(dir.path()).unwrap();
        assert!(config.keys_path.is_none());
        assert!(!config.verify_evidence);
        assert_eq!(config.limits, EvaluationLimits::default());
        assert_eq!(config.bridge, BridgeConfig::default());
    }

    #[test]
    fn toml_sections_and_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
keys_path = "keys/pic_keys.json"
verify_evidence = true

[limits]
max_proposal_bytes = 1024
evidence_root_dir = "artifacts"

[bridge]
port = 9000
"#,
        )
        .unwrap();

        let config = PicConfig::load(dir.path()).unwrap();
        assert_eq!(
            config.keys_path.as_deref(),
            Some(dir.path().join("keys/pic_keys.json").as_path())
        );
        assert!(config.verify_evidence);
        assert_eq!(config.limits.max_proposal_bytes, 1024);
        assert_eq!(config.limits.max_items, 64);
        assert_eq!(
            config.limits.evidence_root_dir.as_deref(),
            Some(dir.path().join("artifacts").as_path())
        );
        assert_eq!(config.bridge.port, 9000);
        assert_eq!(config.bridge.host, "127.0.0.1");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "limits = 3").unwrap();
        assert!(PicConfig::load(dir.path()).is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = PicConfig {
            keys_path: Some(PathBuf::from("/from/file.json")),
            ..Default::default()
        };
        let env: HashMap<&str, &str> = [
            (KEYS_PATH_ENV, "/from/env.json"),
            (POLICY_PATH_ENV, ""),
            (DEBUG_ENV, "yes"),
        ]
        .into_iter()
        .collect();
        config.apply_env_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.keys_path, Some(PathBuf::from("/from/env.json")));
        assert_eq!(config.policy_path, None);
        assert!(config.debug);
    }

    #[test]
    fn bridge_debug_and_top_level_debug_agree() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[bridge]\ndebug = true\n").unwrap();
        let mut config = PicConfig::load(dir.path()).unwrap();
        config.unify_debug();
        assert!(config.debug);
        assert!(config.bridge.debug);

        let mut config = PicConfig {
            debug: true,
            ..Default::default()
        };
        config.unify_debug();
        assert!(config.bridge.debug);

        let mut config = PicConfig::default();
        config.unify_debug();
        assert!(!config.debug);
        assert!(!config.bridge.debug);
    }
}
