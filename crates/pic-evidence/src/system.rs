// system.rs — Verify every evidence entry of a proposal.
//
// Each entry is verified on its own, hash and signature entries may be mixed,
// and one entry's failure does not stop the others from being checked. The
// report then says which ids verified, and those that name a provenance
// entry are upgraded to `trusted` in a `TrustOverrides` set.
//
// When two entries share an id and disagree, one success is enough for the
// upgrade (optimistic union). The pipeline still blocks on the failed entry.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pic_keyring::TrustedKeyRing;
use pic_proposal::{ActionProposal, EvidenceEntry, HashEvidence, TrustOverrides};
use serde::Serialize;

use crate::error::EvidenceError;
use crate::hasher::{hash_file_capped, normalize_digest};
use crate::sandbox::{confine, resolve_uri};
use crate::signature::verify_signature;

/// Default cap on evidence file size: 5 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Where and how much the evidence system may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceSettings {
    /// Base for relative `file://` references.
    pub base_dir: PathBuf,
    /// Sandbox root. Defaults to `base_dir` when unset.
    pub root_dir: Option<PathBuf>,
    pub max_file_bytes: u64,
}

impl EvidenceSettings {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            root_dir: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn sandbox_root(&self) -> &Path {
        self.root_dir.as_deref().unwrap_or(&self.base_dir)
    }
}

/// Outcome of verifying one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub ok: bool,
    /// Caller-facing reason. Never contains a filesystem path.
    pub message: String,
    /// The file involved in a failure, for diagnostics only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Outcome of verifying every entry of one proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvidenceReport {
    pub results: Vec<EvidenceResult>,
}

impl EvidenceReport {
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|r| r.ok)
    }

    pub fn first_failure(&self) -> Option<&EvidenceResult> {
        self.results.iter().find(|r| !r.ok)
    }

    pub fn verified_ids(&self) -> BTreeSet<&str> {
        self.results
            .iter()
            .filter(|r| r.ok)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Upgrades earned by this report for `proposal`.
    pub fn trust_overrides(&self, proposal: &ActionProposal) -> TrustOverrides {
        let mut overrides = TrustOverrides::new();
        for id in self.verified_ids() {
            if proposal.provenance_entry(id).is_some() {
                overrides.upgrade(id);
            }
        }
        overrides
    }
}

/// Verifies evidence entries against the filesystem sandbox and a keyring.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceSystem<'a> {
    keyring: &'a TrustedKeyRing,
    settings: &'a EvidenceSettings,
}

impl<'a> EvidenceSystem<'a> {
    pub fn new(keyring: &'a TrustedKeyRing, settings: &'a EvidenceSettings) -> Self {
        Self { keyring, settings }
    }

    /// Verify one entry. Never panics on bad input; every failure is a
    /// failed result with a reason.
    pub fn verify_entry(&self, entry: &EvidenceEntry, now: DateTime<Utc>) -> EvidenceResult {
        let outcome = match entry {
            EvidenceEntry::Hash(h) => self.verify_hash(h).map(|()| "sha256 verified"),
            EvidenceEntry::Sig(s) => {
                verify_signature(s, self.keyring, now).map(|()| "signature verified")
            }
        };
        let (ok, message, path) = match outcome {
            Ok(msg) => (true, msg.to_string(), None),
            Err(e) => (false, e.to_string(), e.path().map(Path::to_path_buf)),
        };
        tracing::debug!(id = entry.id(), kind = entry.kind(), ok, %message, "evidence checked");
        EvidenceResult {
            id: entry.id().to_string(),
            kind: entry.kind(),
            ok,
            message,
            path,
        }
    }

    /// Verify every entry of `proposal`.
    pub fn verify_all(&self, proposal: &ActionProposal, now: DateTime<Utc>) -> EvidenceReport {
        EvidenceReport {
            results: proposal
                .evidence
                .iter()
                .map(|e| self.verify_entry(e, now))
                .collect(),
        }
    }

    fn verify_hash(&self, entry: &HashEvidence) -> Result<(), EvidenceError> {
        let expected = normalize_digest(&entry.sha256)?;
        let path = resolve_uri(&entry.uri, &self.settings.base_dir)?;
        let path = confine(&path, self.settings.sandbox_root())?;

        let max = self.settings.max_file_bytes;
        let size = std::fs::metadata(&path)
            .map_err(|source| EvidenceError::ReadFailed {
                path: path.clone(),
                source,
            })?
            .len();
        if size > max {
            return Err(EvidenceError::TooLarge { size, max });
        }

        let actual = hash_file_capped(&path, max)?;
        if actual != expected {
            return Err(EvidenceError::Sha256Mismatch { expected, actual });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_bytes;
    use crate::signature::test_keys::*;
    use chrono::TimeZone;
    use pic_proposal::{validate_proposal, SigEvidence};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    const PAYLOAD: &str = "amount=500;currency=USD;invoice=123";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    fn proposal(evidence: Value) -> ActionProposal {
        validate_proposal(&json!({
            "protocol": "PIC/1.0",
            "intent": "Pay invoice 123",
            "impact": "money",
            "provenance": [{"id": "invoice_123", "trust": "untrusted"}],
            "claims": [{"text": "Invoice is genuine", "evidence": ["invoice_123"]}],
            "action": {"tool": "payments_send", "args": {"amount": 500}},
            "evidence": evidence
        }))
        .unwrap()
    }

    fn hash_entry(id: &str, uri: &str, sha256: &str) -> Value {
        json!({"id": id, "type": "hash", "uri": uri, "sha256": sha256})
    }

    #[test]
    fn matching_hash_verifies_and_upgrades() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("invoice.txt"), "invoice 123: $500").unwrap();
        let digest = hash_bytes(b"invoice 123: $500");

        let p = proposal(json!([hash_entry("invoice_123", "file://invoice.txt", &digest)]));
        let ring = TrustedKeyRing::empty();
        let settings = EvidenceSettings::new(dir.path());
        let report = EvidenceSystem::new(&ring, &settings).verify_all(&p, now());

        assert!(report.all_ok());
        assert_eq!(report.results[0].message, "sha256 verified");
        assert!(report.trust_overrides(&p).is_upgraded("invoice_123"));
    }

    #[test]
    fn hashing_is_deterministic_and_detects_one_byte_flip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("artifact.bin");
        let mut bytes = b"the quick brown fox".to_vec();
        std::fs::write(&file, &bytes).unwrap();
        let digest = hash_bytes(&bytes);

        let p = proposal(json!([hash_entry("invoice_123", "file://artifact.bin", &digest)]));
        let ring = TrustedKeyRing::empty();
        let settings = EvidenceSettings::new(dir.path());
        let system = EvidenceSystem::new(&ring, &settings);

        let first = system.verify_all(&p, now());
        let second = system.verify_all(&p, now());
        assert_eq!(first, second);
        assert!(first.all_ok());

        bytes[0] ^= 0x01;
        std::fs::write(&file, &bytes).unwrap();
        let flipped = system.verify_all(&p, now());
        assert!(!flipped.all_ok());
        assert!(flipped.results[0].message.starts_with("sha256 mismatch"));
    }

    #[test]
    fn missing_file_fails_without_upgrade() {
        let dir = TempDir::new().unwrap();
        let p = proposal(json!([hash_entry(
            "invoice_123",
            "file://nonexistent/path/to/file.txt",
            &"0".repeat(64)
        )]));
        let ring = TrustedKeyRing::empty();
        let settings = EvidenceSettings::new(dir.path());
        let report = EvidenceSystem::new(&ring, &settings).verify_all(&p, now());

        let failure = report.first_failure().unwrap();
        assert!(failure.message.starts_with("Evidence file not found"));
        assert!(report.trust_overrides(&p).is_empty());
    }

    #[test]
    fn traversal_outside_root_fails_closed() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(outer.path().join("passwd"), "root:x:0:0").unwrap();

        let p = proposal(json!([hash_entry(
            "invoice_123",
            "file://../passwd",
            &hash_bytes(b"root:x:0:0")
        )]));
        let ring = TrustedKeyRing::empty();
        let settings = EvidenceSettings::new(&root);
        let report = EvidenceSystem::new(&ring, &settings).verify_all(&p, now());

        let result = &report.results[0];
        assert_eq!(result.message, "evidence path escapes sandbox root");
        assert!(result.path.as_ref().unwrap().ends_with("passwd"));
    }

    #[test]
    fn traversal_to_missing_file_is_indistinguishable() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        std::fs::create_dir(&root).unwrap();

        let p = proposal(json!([hash_entry(
            "invoice_123",
            "file://../no_such_file",
            &"0".repeat(64)
        )]));
        let ring = TrustedKeyRing::empty();
        let settings = EvidenceSettings::new(&root);
        let report = EvidenceSystem::new(&ring, &settings).verify_all(&p, now());

        assert_eq!(report.results[0].message, "evidence path escapes sandbox root");
    }

    #[test]
    fn explicit_root_overrides_base_dir() {
        let outer = TempDir::new().unwrap();
        let base = outer.path().join("proposals");
        let root = outer.path().join("evidence");
        std::fs::create_dir(&base).unwrap();
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();

        let p = proposal(json!([hash_entry(
            "invoice_123",
            "file://../evidence/a.txt",
            &hash_bytes(b"a")
        )]));
        let ring = TrustedKeyRing::empty();
        let mut settings = EvidenceSettings::new(&base);
        settings.root_dir = Some(root);
        assert!(EvidenceSystem::new(&ring, &settings)
            .verify_all(&p, now())
            .all_ok());
    }

    #[test]
    fn two_megabyte_file_verifies_under_default_limit() {
        let dir = TempDir::new().unwrap();
        let data = vec![b'x'; 2 * 1024 * 1024];
        std::fs::write(dir.path().join("large.bin"), &data).unwrap();

        let p = proposal(json!([hash_entry(
            "invoice_123",
            "file://large.bin",
            &hash_bytes(&data)
        )]));
        let ring = TrustedKeyRing::empty();
        let settings = EvidenceSettings::new(dir.path());
        assert!(EvidenceSystem::new(&ring, &settings)
            .verify_all(&p, now())
            .all_ok());
    }

    #[test]
    fn oversize_file_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![0u8; 2048]).unwrap();

        let p = proposal(json!([hash_entry(
            "invoice_123",
            "file://big.bin",
            &hash_bytes(&[0u8; 2048])
        )]));
        let ring = TrustedKeyRing::empty();
        let mut settings = EvidenceSettings::new(dir.path());
        settings.max_file_bytes = 1024;
        let report = EvidenceSystem::new(&ring, &settings).verify_all(&p, now());
        assert!(report.results[0].message.starts_with("evidence file too large"));
    }

    #[test]
    fn mixed_hash_and_signature_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("invoice.txt"), "inv").unwrap();
        let pair = keypair(9);
        let ring = keyring_with("demo_signer_v1", &pair);

        let p = proposal(json!([
            hash_entry("invoice_123", "file://invoice.txt", &hash_bytes(b"inv")),
            {
                "id": "approval_123",
                "type": "sig",
                "payload": PAYLOAD,
                "signature": sign_b64(&pair, PAYLOAD),
                "key_id": "demo_signer_v1"
            }
        ]));
        let settings = EvidenceSettings::new(dir.path());
        let report = EvidenceSystem::new(&ring, &settings).verify_all(&p, now());

        assert!(report.all_ok());
        assert_eq!(report.results[1].message, "signature verified");
        assert_eq!(report.results[1].kind, "sig");
        // approval_123 names no provenance entry, so only invoice_123 upgrades.
        let overrides = report.trust_overrides(&p);
        assert_eq!(overrides.len(), 1);
        assert!(overrides.is_upgraded("invoice_123"));
    }

    #[test]
    fn one_success_upgrades_despite_a_failing_duplicate() {
        let pair = keypair(3);
        let ring = keyring_with("demo_signer_v1", &pair);
        let settings = EvidenceSettings::new(".");
        let system = EvidenceSystem::new(&ring, &settings);

        let good = EvidenceEntry::Sig(SigEvidence {
            id: "invoice_123".into(),
            payload: PAYLOAD.into(),
            signature: sign_b64(&pair, PAYLOAD),
            key_id: "demo_signer_v1".into(),
        });
        let bad = EvidenceEntry::Sig(SigEvidence {
            id: "invoice_123".into(),
            payload: PAYLOAD.into(),
            signature: sign_b64(&keypair(4), PAYLOAD),
            key_id: "demo_signer_v1".into(),
        });
        let p = proposal(json!([]));
        let report = EvidenceReport {
            results: vec![system.verify_entry(&good, now()), system.verify_entry(&bad, now())],
        };

        assert!(!report.all_ok());
        assert!(report.trust_overrides(&p).is_upgraded("invoice_123"));
    }
}
