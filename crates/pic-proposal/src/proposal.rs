// proposal.rs — The PIC/1.0 Action Proposal data model.
//
// An ActionProposal is the contract an agent attaches to exactly one tool
// call: what it intends, how risky it is, which inputs justified it, and
// which artifacts back those claims. Values of these types are only ever
// produced by `schema::validate_proposal`, so every downstream stage can
// assume a shape-correct proposal.
//
// Proposals are immutable once parsed. Trust upgrades earned through
// verified evidence live in a separate `TrustOverrides` working set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only protocol tag this implementation accepts.
pub const PROTOCOL_VERSION: &str = "PIC/1.0";

/// How much an input that influenced the action can be relied upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Trusted,
    SemiTrusted,
    Untrusted,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Trusted => "trusted",
            TrustLevel::SemiTrusted => "semi_trusted",
            TrustLevel::Untrusted => "untrusted",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk category of a side-effecting action.
///
/// `Ord` is derived so impact sets can live in `BTreeSet`s and serialize in a
/// stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactClass {
    Read,
    Write,
    External,
    Irreversible,
    Money,
    Compute,
    Privacy,
}

impl ImpactClass {
    /// Every impact class, in declaration order.
    pub const ALL: [ImpactClass; 7] = [
        ImpactClass::Read,
        ImpactClass::Write,
        ImpactClass::External,
        ImpactClass::Irreversible,
        ImpactClass::Money,
        ImpactClass::Compute,
        ImpactClass::Privacy,
    ];

    /// Money, privacy and irreversible actions always share the strictest
    /// gating class, whatever the operator's policy says.
    pub fn is_high_impact(&self) -> bool {
        matches!(
            self,
            ImpactClass::Money | ImpactClass::Privacy | ImpactClass::Irreversible
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactClass::Read => "read",
            ImpactClass::Write => "write",
            ImpactClass::External => "external",
            ImpactClass::Irreversible => "irreversible",
            ImpactClass::Money => "money",
            ImpactClass::Compute => "compute",
            ImpactClass::Privacy => "privacy",
        }
    }
}

impl fmt::Display for ImpactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImpactClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImpactClass::ALL
            .iter()
            .copied()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| format!("unknown impact class '{}'", s))
    }
}

/// One input that causally influenced the proposed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Unique key; claims and evidence entries refer to provenance by this id.
    pub id: String,
    /// Declared trust, before any evidence-based upgrade.
    pub trust: TrustLevel,
    /// Free-form description of where the input came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A statement the agent relies on, with the ids that back it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    /// Each id must name an evidence entry or a provenance entry.
    pub evidence: Vec<String>,
}

/// The tool call the proposal was written for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolBinding {
    pub tool: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Content-hash evidence: a local file whose SHA-256 must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashEvidence {
    pub id: String,
    /// `file://` reference; older proposals call this field `ref`.
    #[serde(alias = "ref")]
    pub uri: String,
    pub sha256: String,
}

/// Signature evidence: an Ed25519 signature over a UTF-8 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigEvidence {
    pub id: String,
    pub payload: String,
    /// Base64-encoded 64-byte signature.
    pub signature: String,
    pub key_id: String,
}

/// A verifiable artifact backing a claim. Tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvidenceEntry {
    Hash(HashEvidence),
    Sig(SigEvidence),
}

impl EvidenceEntry {
    pub fn id(&self) -> &str {
        match self {
            EvidenceEntry::Hash(h) => &h.id,
            EvidenceEntry::Sig(s) => &s.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EvidenceEntry::Hash(_) => "hash",
            EvidenceEntry::Sig(_) => "sig",
        }
    }
}

/// A complete, schema-valid PIC/1.0 Action Proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProposal {
    pub protocol: String,
    pub intent: String,
    pub impact: ImpactClass,
    pub provenance: Vec<ProvenanceEntry>,
    pub claims: Vec<Claim>,
    pub action: ToolBinding,
    #[serde(default)]
    pub evidence: Vec<EvidenceEntry>,
}

impl ActionProposal {
    /// Look up a provenance entry by id.
    pub fn provenance_entry(&self, id: &str) -> Option<&ProvenanceEntry> {
        self.provenance.iter().find(|p| p.id == id)
    }

    /// Whether `id` names any evidence entry in this proposal.
    pub fn has_evidence_id(&self, id: &str) -> bool {
        self.evidence.iter().any(|e| e.id() == id)
    }
}
