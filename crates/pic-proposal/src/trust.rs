// trust.rs — Evaluation-scoped trust upgrades.
//
// Verified evidence may raise a provenance entry to `trusted`. The upgrade
// is recorded here, keyed by provenance id, and never written back into the
// proposal. The set only grows: there is no way to downgrade an entry.

use std::collections::BTreeSet;

use crate::proposal::{ActionProposal, ProvenanceEntry, TrustLevel};

/// Provenance ids upgraded to `trusted` during one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustOverrides {
    upgraded: BTreeSet<String>,
}

impl TrustOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `provenance_id` is backed by verified evidence.
    pub fn upgrade(&mut self, provenance_id: impl Into<String>) {
        self.upgraded.insert(provenance_id.into());
    }

    pub fn is_upgraded(&self, provenance_id: &str) -> bool {
        self.upgraded.contains(provenance_id)
    }

    /// Trust of `entry` after applying upgrades.
    pub fn effective(&self, entry: &ProvenanceEntry) -> TrustLevel {
        if self.is_upgraded(&entry.id) {
            TrustLevel::Trusted
        } else {
            entry.trust
        }
    }

    /// Ids of every provenance entry that is trusted, originally or by upgrade.
    pub fn trusted_ids<'a>(&self, proposal: &'a ActionProposal) -> BTreeSet<&'a str> {
        proposal
            .provenance
            .iter()
            .filter(|p| self.effective(p) == TrustLevel::Trusted)
            .map(|p| p.id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.upgraded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upgraded.is_empty()
    }
}
