// decision.rs — The externally observable result of an evaluation.
//
// Every stage of the pipeline returns `Result<_, PicError>`. Only the
// orchestration layer turns a `PicError` into a `Decision`, and a Decision
// is always returned as a value: callers never see a thrown failure.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Closed set of PIC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "PIC_INVALID_REQUEST")]
    InvalidRequest,
    #[serde(rename = "PIC_LIMIT_EXCEEDED")]
    LimitExceeded,
    #[serde(rename = "PIC_SCHEMA_INVALID")]
    SchemaInvalid,
    #[serde(rename = "PIC_VERIFIER_FAILED")]
    VerifierFailed,
    #[serde(rename = "PIC_TOOL_BINDING_MISMATCH")]
    ToolBindingMismatch,
    #[serde(rename = "PIC_EVIDENCE_REQUIRED")]
    EvidenceRequired,
    #[serde(rename = "PIC_EVIDENCE_FAILED")]
    EvidenceFailed,
    #[serde(rename = "PIC_POLICY_VIOLATION")]
    PolicyViolation,
    #[serde(rename = "PIC_INTERNAL_ERROR")]
    InternalError,
    /// Produced only by bridge clients, never by the evaluation core.
    #[serde(rename = "PIC_BRIDGE_UNREACHABLE")]
    BridgeUnreachable,
}

impl ErrorCode {
    /// Codes the evaluation core itself can emit.
    pub const CORE: [ErrorCode; 9] = [
        ErrorCode::InvalidRequest,
        ErrorCode::LimitExceeded,
        ErrorCode::SchemaInvalid,
        ErrorCode::VerifierFailed,
        ErrorCode::ToolBindingMismatch,
        ErrorCode::EvidenceRequired,
        ErrorCode::EvidenceFailed,
        ErrorCode::PolicyViolation,
        ErrorCode::InternalError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "PIC_INVALID_REQUEST",
            ErrorCode::LimitExceeded => "PIC_LIMIT_EXCEEDED",
            ErrorCode::SchemaInvalid => "PIC_SCHEMA_INVALID",
            ErrorCode::VerifierFailed => "PIC_VERIFIER_FAILED",
            ErrorCode::ToolBindingMismatch => "PIC_TOOL_BINDING_MISMATCH",
            ErrorCode::EvidenceRequired => "PIC_EVIDENCE_REQUIRED",
            ErrorCode::EvidenceFailed => "PIC_EVIDENCE_FAILED",
            ErrorCode::PolicyViolation => "PIC_POLICY_VIOLATION",
            ErrorCode::InternalError => "PIC_INTERNAL_ERROR",
            ErrorCode::BridgeUnreachable => "PIC_BRIDGE_UNREACHABLE",
        }
    }

    /// Parse a code the core can emit. `PIC_BRIDGE_UNREACHABLE` and anything
    /// unrecognized yield `None`.
    pub fn from_core_str(s: &str) -> Option<ErrorCode> {
        ErrorCode::CORE.iter().copied().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed stage failure. Carries optional diagnostic details that only
/// reach the caller when debug mode is on.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct PicError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

impl PicError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::LimitExceeded, message)
    }

    pub fn schema_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SchemaInvalid, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<crate::error::SchemaError> for PicError {
    fn from(e: crate::error::SchemaError) -> Self {
        PicError::schema_invalid(e.to_string())
    }
}

/// The error object inside a blocked Decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Binary allow/block outcome of one evaluation.
///
/// Invariant: `error` is `Some` exactly when `allowed` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub error: Option<DecisionError>,
    pub eval_ms: u64,
}

impl Decision {
    pub fn allow(eval_ms: u64) -> Self {
        Self {
            allowed: true,
            error: None,
            eval_ms,
        }
    }

    /// Block with the given failure. `details` is dropped unless
    /// `include_details` is set.
    pub fn block(err: PicError, eval_ms: u64, include_details: bool) -> Self {
        Self {
            allowed: false,
            error: Some(DecisionError {
                code: err.code,
                message: err.message,
                details: if include_details { err.details } else { None },
            }),
            eval_ms,
        }
    }

    /// The blocking code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn allow_serializes_null_error() {
        let json = serde_json::to_value(Decision::allow(3)).unwrap();
        assert_eq!(json, json!({"allowed": true, "error": null, "eval_ms": 3}));
    }

    #[test]
    fn block_hides_details_unless_requested() {
        let err = PicError::new(ErrorCode::EvidenceFailed, "sha256 mismatch")
            .with_details(json!({"id": "invoice_123"}));

        let quiet = serde_json::to_value(Decision::block(err.clone(), 1, false)).unwrap();
        assert_eq!(quiet["error"]["code"], "PIC_EVIDENCE_FAILED");
        assert!(quiet["error"].get("details").is_none());

        let verbose = serde_json::to_value(Decision::block(err, 1, true)).unwrap();
        assert_eq!(verbose["error"]["details"]["id"], "invoice_123");
    }

    #[test]
    fn bridge_unreachable_is_not_a_core_code() {
        assert_eq!(
            ErrorCode::from_core_str("PIC_SCHEMA_INVALID"),
            Some(ErrorCode::SchemaInvalid)
        );
        assert_eq!(ErrorCode::from_core_str("PIC_BRIDGE_UNREACHABLE"), None);
        assert_eq!(ErrorCode::from_core_str("PIC_MADE_UP"), None);
    }

    #[test]
    fn wire_names_match_display() {
        for code in ErrorCode::CORE {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code));
        }
    }
}
