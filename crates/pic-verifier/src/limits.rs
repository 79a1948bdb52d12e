// limits.rs — Resource limits and the cooperative time budget.
//
// Size and item limits are enforced before any typed parsing. The time
// budget is a soft bound: it is checked at stage boundaries (and between
// evidence entries), never by interrupting a file read or a signature check
// already in progress.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use pic_evidence::DEFAULT_MAX_FILE_BYTES;
use pic_proposal::PicError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Limits applied to every evaluation. Configuration, never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationLimits {
    /// Maximum serialized proposal size in bytes.
    pub max_proposal_bytes: usize,
    /// Maximum length of provenance, claims, evidence, and each claim's id list.
    pub max_items: usize,
    /// Soft wall-clock budget per evaluation.
    pub max_eval_ms: u64,
    /// Maximum evidence file size in bytes.
    pub max_file_bytes: u64,
    /// Sandbox root for hash evidence. Falls back to the proposal base dir.
    pub evidence_root_dir: Option<PathBuf>,
}

impl Default for EvaluationLimits {
    fn default() -> Self {
        Self {
            max_proposal_bytes: 64 * 1024,
            max_items: 64,
            max_eval_ms: 500,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            evidence_root_dir: None,
        }
    }
}

impl EvaluationLimits {
    pub fn check_bytes(&self, len: usize) -> Result<(), PicError> {
        if len > self.max_proposal_bytes {
            return Err(PicError::limit_exceeded(format!(
                "proposal too large: {} bytes (max {})",
                len, self.max_proposal_bytes
            )));
        }
        Ok(())
    }

    /// Count the sequences of an untyped proposal. Fields with the wrong
    /// type are left for schema validation to report.
    pub fn check_items(&self, proposal: &Value) -> Result<(), PicError> {
        for field in ["provenance", "claims", "evidence"] {
            if let Some(items) = proposal.get(field).and_then(Value::as_array) {
                self.check_len(field, items.len())?;
            }
        }
        if let Some(claims) = proposal.get("claims").and_then(Value::as_array) {
            for (i, claim) in claims.iter().enumerate() {
                if let Some(ids) = claim.get("evidence").and_then(Value::as_array) {
                    self.check_len(&format!("claims[{}].evidence", i), ids.len())?;
                }
            }
        }
        Ok(())
    }

    fn check_len(&self, field: &str, len: usize) -> Result<(), PicError> {
        if len > self.max_items {
            return Err(PicError::limit_exceeded(format!(
                "too many items in {}: {} (max {})",
                field, len, self.max_items
            )));
        }
        Ok(())
    }
}

/// Pipeline states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Limits,
    Schema,
    Binding,
    Evidence,
    Verify,
    Decide,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Limits => "limits",
            Stage::Schema => "schema",
            Stage::Binding => "binding",
            Stage::Evidence => "evidence",
            Stage::Verify => "verify",
            Stage::Decide => "decide",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock budget for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(max_eval_ms: u64) -> Self {
        Self::starting_at(Instant::now(), max_eval_ms)
    }

    pub fn starting_at(started: Instant, max_eval_ms: u64) -> Self {
        Self {
            started,
            budget: Duration::from_millis(max_eval_ms),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Fail if the budget is spent by the time `stage` completes.
    pub fn check(&self, stage: Stage) -> Result<(), PicError> {
        let elapsed = self.elapsed();
        if elapsed > self.budget {
            tracing::debug!(
                stage = %stage,
                elapsed_ms = elapsed.as_millis() as u64,
                "time budget exceeded"
            );
            return Err(PicError::limit_exceeded(format!(
                "evaluation exceeded time budget of {} ms during {} stage",
                self.budget.as_millis(),
                stage
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pic_proposal::ErrorCode;
    use serde_json::json;

    #[test]
    fn defaults() {
        let limits = EvaluationLimits::default();
        assert_eq!(limits.max_proposal_bytes, 65_536);
        assert_eq!(limits.max_items, 64);
        assert_eq!(limits.max_eval_ms, 500);
        assert_eq!(limits.max_file_bytes, 5 * 1024 * 1024);
        assert!(limits.evidence_root_dir.is_none());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let limits: EvaluationLimits = serde_json::from_value(json!({"max_items": 4})).unwrap();
        assert_eq!(limits.max_items, 4);
        assert_eq!(limits.max_eval_ms, 500);
    }

    #[test]
    fn byte_limit_is_inclusive() {
        let limits = EvaluationLimits {
            max_proposal_bytes: 10,
            ..Default::default()
        };
        assert!(limits.check_bytes(10).is_ok());
        assert_eq!(limits.check_bytes(11).unwrap_err().code, ErrorCode::LimitExceeded);
    }

    #[test]
    fn item_limit_covers_nested_claim_ids() {
        let limits = EvaluationLimits {
            max_items: 2,
            ..Default::default()
        };
        assert!(limits
            .check_items(&json!({"provenance": [1, 2], "claims": [{"evidence": ["a", "b"]}]}))
            .is_ok());
        let err = limits
            .check_items(&json!({"claims": [{"evidence": ["a", "b", "c"]}]}))
            .unwrap_err();
        assert!(err.message.contains("claims[0].evidence"));
        assert!(limits.check_items(&json!({"evidence": [1, 2, 3]})).is_err());
    }

    #[test]
    fn wrong_types_are_left_to_schema() {
        let limits = EvaluationLimits::default();
        assert!(limits.check_items(&json!({"provenance": "nope"})).is_ok());
    }

    #[test]
    fn spent_budget_fails_check() {
        let Some(past) = Instant::now().checked_sub(Duration::from_millis(50)) else {
            return;
        };
        let deadline = Deadline::starting_at(past, 10);
        let err = deadline.check(Stage::Evidence).unwrap_err();
        assert_eq!(err.code, ErrorCode::LimitExceeded);
        assert!(err.message.contains("evidence"));

        assert!(Deadline::start(60_000).check(Stage::Schema).is_ok());
    }
}
