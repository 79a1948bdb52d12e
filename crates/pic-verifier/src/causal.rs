// causal.rs — The core trust rule.
//
// Four checks, in order, against a schema-valid proposal, the real tool
// call, and the evaluation's trust overrides:
//
// 1. Tool binding: action.tool and action.args equal the real call.
// 2. Impact: a tool the policy classifies must be proposed with that class.
// 3. Evidence requirement: a governed class needs at least one claim backed
//    by a trusted provenance id (declared trusted or upgraded by evidence).
// 4. Linkage: every id a claim cites names an evidence or provenance entry.
//
// The first failed check blocks the proposal. There is no partial allow.

use pic_policy::PolicyEngine;
use pic_proposal::{ActionProposal, ErrorCode, PicError, TrustOverrides};
use serde_json::json;

use crate::envelope::ToolCall;

/// Applies the causal trust rule using a loaded policy.
#[derive(Debug, Clone, Copy)]
pub struct CausalVerifier<'a> {
    policy: &'a PolicyEngine,
}

impl<'a> CausalVerifier<'a> {
    pub fn new(policy: &'a PolicyEngine) -> Self {
        Self { policy }
    }

    /// Run all four checks.
    pub fn verify(
        &self,
        proposal: &ActionProposal,
        call: &ToolCall,
        overrides: &TrustOverrides,
    ) -> Result<(), PicError> {
        check_binding(proposal, call)?;
        self.check_impact(proposal, call)?;
        self.check_evidence_requirement(proposal, overrides)?;
        check_linkage(proposal)
    }

    /// The declared impact must match the policy's class for the real tool.
    pub fn check_impact(&self, proposal: &ActionProposal, call: &ToolCall) -> Result<(), PicError> {
        match self.policy.impact_of(&call.name) {
            Some(expected) if expected != proposal.impact => Err(PicError::new(
                ErrorCode::PolicyViolation,
                format!(
                    "tool '{}' is classified as '{}' but the proposal declares '{}'",
                    call.name, expected, proposal.impact
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Governed classes need a claim citing a trusted provenance id.
    pub fn check_evidence_requirement(
        &self,
        proposal: &ActionProposal,
        overrides: &TrustOverrides,
    ) -> Result<(), PicError> {
        if !self.policy.requires_evidence(proposal.impact) {
            return Ok(());
        }
        let trusted = overrides.trusted_ids(proposal);
        let backed = proposal
            .claims
            .iter()
            .any(|claim| claim.evidence.iter().any(|id| trusted.contains(id.as_str())));
        if backed {
            return Ok(());
        }
        Err(PicError::new(
            ErrorCode::EvidenceRequired,
            format!(
                "impact '{}' requires at least one claim backed by trusted provenance",
                proposal.impact
            ),
        )
        .with_details(json!({
            "impact": proposal.impact,
            "trusted_provenance": trusted,
        })))
    }
}

/// The proposal must be for exactly this call.
pub fn check_binding(proposal: &ActionProposal, call: &ToolCall) -> Result<(), PicError> {
    if proposal.action.tool != call.name {
        return Err(PicError::new(
            ErrorCode::ToolBindingMismatch,
            format!(
                "proposal is bound to tool '{}' but the call is to '{}'",
                proposal.action.tool, call.name
            ),
        ));
    }
    if proposal.action.args != call.args {
        let differing: Vec<&str> = proposal
            .action
            .args
            .keys()
            .chain(call.args.keys())
            .filter(|k| proposal.action.args.get(*k) != call.args.get(*k))
            .map(String::as_str)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        return Err(PicError::new(
            ErrorCode::ToolBindingMismatch,
            format!(
                "proposal arguments do not match the call to '{}'",
                call.name
            ),
        )
        .with_details(json!({ "differing_args": differing })));
    }
    Ok(())
}

/// Every id cited by a claim must exist in the proposal.
pub fn check_linkage(proposal: &ActionProposal) -> Result<(), PicError> {
    for (i, claim) in proposal.claims.iter().enumerate() {
        for id in &claim.evidence {
            if proposal.provenance_entry(id).is_none() && !proposal.has_evidence_id(id) {
                return Err(PicError::new(
                    ErrorCode::VerifierFailed,
                    format!("claims[{}] references unknown evidence id '{}'", i, id),
                ));
            }
        }
    }
    Ok(())
}
