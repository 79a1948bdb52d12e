// pipeline.rs — Fail-closed evaluation of one tool call.
//
// States, in order:
//
//   Limits → Schema → Binding → Evidence (optional) → Verify → Decide
//
// Each stage returns `Result<_, PicError>` and the first error ends the
// evaluation. The deadline is checked after every stage. The whole run is
// wrapped in `catch_unwind`, so a panic inside any stage still produces a
// blocking Decision (PIC_INTERNAL_ERROR) rather than escaping to the caller.
//
// Policy and keyring are shared read-only through `Arc`; a Pipeline holds no
// mutable state, so one instance can serve concurrent evaluations.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use pic_evidence::{EvidenceReport, EvidenceSettings, EvidenceSystem};
use pic_keyring::TrustedKeyRing;
use pic_policy::PolicyEngine;
use pic_proposal::{
    json_type_name, validate_proposal, ActionProposal, Decision, ErrorCode, PicError,
    TrustOverrides,
};
use serde_json::{json, Value};

use crate::causal::{check_binding, CausalVerifier};
use crate::envelope::ToolCall;
use crate::limits::{Deadline, EvaluationLimits, Stage};

/// Per-pipeline switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Verify attached evidence. When off, evidence never upgrades trust.
    pub verify_evidence: bool,
    /// Base directory for relative `file://` evidence.
    pub proposal_base_dir: PathBuf,
    /// Include `details` in blocking Decisions.
    pub debug: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            verify_evidence: true,
            proposal_base_dir: PathBuf::from("."),
            debug: false,
        }
    }
}

/// The evaluation pipeline: policy, keyring, limits, options.
#[derive(Debug, Clone)]
pub struct Pipeline {
    policy: Arc<PolicyEngine>,
    keyring: Arc<TrustedKeyRing>,
    limits: EvaluationLimits,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(policy: Arc<PolicyEngine>, keyring: Arc<TrustedKeyRing>) -> Self {
        Self {
            policy,
            keyring,
            limits: EvaluationLimits::default(),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_limits(mut self, limits: EvaluationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn keyring(&self) -> &TrustedKeyRing {
        &self.keyring
    }

    pub fn limits(&self) -> &EvaluationLimits {
        &self.limits
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Evaluate a real tool call whose arguments may carry a proposal under
    /// `__pic`.
    pub fn evaluate_tool_call(&self, tool_name: &str, tool_args: &Value) -> Decision {
        self.run(tool_name, |deadline| {
            self.tool_call_stages(tool_name, tool_args, deadline)
        })
    }

    /// Evaluate a serialized proposal. The size limit is enforced before the
    /// bytes are parsed. With no `call`, the proposal is bound to its own
    /// declared action.
    pub fn evaluate_proposal_bytes(&self, raw: &[u8], call: Option<&ToolCall>) -> Decision {
        let tool = call.map(|c| c.name.as_str()).unwrap_or("-");
        self.run(tool, |deadline| self.bytes_stages(raw, call, deadline))
    }

    /// Verify only the evidence of `proposal`, without the causal checks.
    pub fn verify_evidence(&self, proposal: &ActionProposal) -> EvidenceReport {
        let settings = self.evidence_settings();
        EvidenceSystem::new(&self.keyring, &settings).verify_all(proposal, Utc::now())
    }

    fn run<F>(&self, tool: &str, stages: F) -> Decision
    where
        F: FnOnce(&Deadline) -> Result<(), PicError>,
    {
        let deadline = Deadline::start(self.limits.max_eval_ms);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| stages(&deadline)))
            .unwrap_or_else(|payload| {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(tool, %reason, "internal fault during evaluation");
                Err(PicError::internal("Internal verification error")
                    .with_details(json!({ "reason": reason })))
            });

        let eval_ms = deadline.elapsed_ms();
        match outcome {
            Ok(()) => {
                tracing::info!(tool, eval_ms, "ALLOW");
                Decision::allow(eval_ms)
            }
            Err(err) => {
                tracing::info!(tool, code = %err.code, eval_ms, message = %err.message, "BLOCK");
                Decision::block(err, eval_ms, self.options.debug)
            }
        }
    }

    fn tool_call_stages(
        &self,
        tool_name: &str,
        tool_args: &Value,
        deadline: &Deadline,
    ) -> Result<(), PicError> {
        if tool_name.trim().is_empty() {
            return Err(PicError::invalid_request("Missing or empty 'tool_name'"));
        }
        let raw_args = tool_args.as_object().ok_or_else(|| {
            PicError::invalid_request("'tool_args' must be an object")
                .with_details(json!({ "found": json_type_name(tool_args) }))
        })?;

        let (call, proposal) = ToolCall::from_envelope(tool_name, raw_args);
        match proposal {
            None => self.no_proposal(&call),
            Some(Value::String(raw)) => self.bytes_stages(raw.as_bytes(), Some(&call), deadline),
            Some(value) => {
                let size = serde_json::to_vec(&value)
                    .map_err(|e| PicError::internal(format!("failed to measure proposal: {}", e)))?
                    .len();
                self.limits.check_bytes(size)?;
                self.value_stages(&value, Some(&call), deadline)
            }
        }
    }

    fn no_proposal(&self, call: &ToolCall) -> Result<(), PicError> {
        match self.policy.impact_of(&call.name) {
            Some(impact) if self.policy.requires_pic(impact) => Err(PicError::new(
                ErrorCode::PolicyViolation,
                format!(
                    "tool '{}' has impact '{}' and requires a PIC proposal",
                    call.name, impact
                ),
            )),
            _ => {
                tracing::debug!(tool = %call.name, "unclassified tool without proposal");
                Ok(())
            }
        }
    }

    fn bytes_stages(
        &self,
        raw: &[u8],
        call: Option<&ToolCall>,
        deadline: &Deadline,
    ) -> Result<(), PicError> {
        self.limits.check_bytes(raw.len())?;
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| PicError::schema_invalid(format!("proposal is not valid JSON: {}", e)))?;
        self.value_stages(&value, call, deadline)
    }

    fn value_stages(
        &self,
        value: &Value,
        call: Option<&ToolCall>,
        deadline: &Deadline,
    ) -> Result<(), PicError> {
        self.limits.check_items(value)?;
        deadline.check(Stage::Limits)?;

        let proposal = validate_proposal(value)?;
        deadline.check(Stage::Schema)?;

        let own_call;
        let call = match call {
            Some(c) => c,
            None => {
                own_call = ToolCall::from_binding(&proposal.action);
                &own_call
            }
        };
        check_binding(&proposal, call)?;
        deadline.check(Stage::Binding)?;

        let overrides = if self.options.verify_evidence && !proposal.evidence.is_empty() {
            let overrides = self.evidence_stage(&proposal, deadline)?;
            deadline.check(Stage::Evidence)?;
            overrides
        } else {
            TrustOverrides::new()
        };

        CausalVerifier::new(&self.policy).verify(&proposal, call, &overrides)?;
        deadline.check(Stage::Verify)?;

        deadline.check(Stage::Decide)
    }

    fn evidence_stage(
        &self,
        proposal: &ActionProposal,
        deadline: &Deadline,
    ) -> Result<TrustOverrides, PicError> {
        let settings = self.evidence_settings();
        let system = EvidenceSystem::new(&self.keyring, &settings);
        let now = Utc::now();

        let mut report = EvidenceReport::default();
        for entry in &proposal.evidence {
            report.results.push(system.verify_entry(entry, now));
            deadline.check(Stage::Evidence)?;
        }

        if let Some(failed) = report.first_failure() {
            return Err(PicError::new(
                ErrorCode::EvidenceFailed,
                format!("evidence '{}' failed: {}", failed.id, failed.message),
            )
            .with_details(json!({ "results": report.results })));
        }
        Ok(report.trust_overrides(proposal))
    }

    fn evidence_settings(&self) -> EvidenceSettings {
        EvidenceSettings {
            base_dir: self.options.proposal_base_dir.clone(),
            root_dir: self.limits.evidence_root_dir.clone(),
            max_file_bytes: self.limits.max_file_bytes,
        }
    }
}
