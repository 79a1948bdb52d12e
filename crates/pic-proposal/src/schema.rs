// schema.rs — Structural validation of PIC/1.0 proposals.
//
// Two passes, both all-or-nothing:
//
// 1. Shape: serde deserializes the JSON value into `ActionProposal`. This
//    catches missing fields, wrong types, unknown impact classes, unknown
//    trust levels and unknown evidence types.
// 2. Content: the checks serde cannot express: protocol tag, non-empty
//    identifiers, unique provenance ids.
//
// The first violated constraint is reported; nothing partial is returned.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::SchemaError;
use crate::proposal::{ActionProposal, EvidenceEntry, PROTOCOL_VERSION};

/// Parse raw bytes as JSON, then validate.
pub fn parse_proposal(raw: &[u8]) -> Result<ActionProposal, SchemaError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
    validate_proposal(&value)
}

/// Validate an already-parsed JSON value as a PIC/1.0 proposal.
pub fn validate_proposal(value: &Value) -> Result<ActionProposal, SchemaError> {
    if !value.is_object() {
        return Err(SchemaError::NotAnObject {
            found: json_type_name(value),
        });
    }

    let proposal: ActionProposal =
        serde_json::from_value(value.clone()).map_err(|e| SchemaError::Shape(e.to_string()))?;

    check_content(&proposal)?;
    Ok(proposal)
}

fn check_content(proposal: &ActionProposal) -> Result<(), SchemaError> {
    if proposal.protocol != PROTOCOL_VERSION {
        return Err(SchemaError::Protocol {
            found: proposal.protocol.clone(),
            expected: PROTOCOL_VERSION,
        });
    }

    if proposal.intent.trim().is_empty() {
        return Err(SchemaError::empty("intent"));
    }

    let mut seen = HashSet::new();
    for (i, entry) in proposal.provenance.iter().enumerate() {
        if entry.id.trim().is_empty() {
            return Err(SchemaError::empty(format!("provenance[{}].id", i)));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(SchemaError::DuplicateProvenance {
                id: entry.id.clone(),
            });
        }
    }

    for (i, claim) in proposal.claims.iter().enumerate() {
        for (j, id) in claim.evidence.iter().enumerate() {
            if id.trim().is_empty() {
                return Err(SchemaError::empty(format!("claims[{}].evidence[{}]", i, j)));
            }
        }
    }

    if proposal.action.tool.trim().is_empty() {
        return Err(SchemaError::empty("action.tool"));
    }

    for (i, entry) in proposal.evidence.iter().enumerate() {
        let required: Vec<(&str, &str)> = match entry {
            EvidenceEntry::Hash(h) => vec![
                ("id", h.id.as_str()),
                ("uri", h.uri.as_str()),
                ("sha256", h.sha256.as_str()),
            ],
            EvidenceEntry::Sig(s) => vec![
                ("id", s.id.as_str()),
                ("signature", s.signature.as_str()),
                ("key_id", s.key_id.as_str()),
            ],
        };
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SchemaError::empty(format!("evidence[{}].{}", i, field)));
            }
        }
    }

    Ok(())
}

/// Human-readable JSON type name, used in rejection messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{ImpactClass, TrustLevel};
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "protocol": "PIC/1.0",
            "intent": "Send payment",
            "impact": "money",
            "provenance": [{"id": "invoice_123", "trust": "trusted", "source": "unit-test"}],
            "claims": [{"text": "Pay $500", "evidence": ["invoice_123"]}],
            "action": {"tool": "payments_send", "args": {"amount": 500}}
        })
    }

    fn expect_err(value: Value) -> SchemaError {
        match validate_proposal(&value) {
            Err(e) => e,
            Ok(p) => panic!("expected schema error, got {:?}", p),
        }
    }

    #[test]
    fn accepts_valid_proposal() {
        let p = validate_proposal(&valid()).unwrap();
        assert_eq!(p.impact, ImpactClass::Money);
        assert_eq!(p.provenance[0].trust, TrustLevel::Trusted);
        assert_eq!(p.action.args["amount"], json!(500));
        assert!(p.evidence.is_empty());
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut v = valid();
        v.as_object_mut().unwrap().remove("intent");
        match expect_err(v) {
            SchemaError::Shape(msg) => assert!(msg.contains("intent")),
            other => panic!("expected Shape, got {:?}", other),
        }
    }

    #[test]
    fn rejects_wrong_type() {
        let mut v = valid();
        v["claims"] = json!("not-a-list");
        assert!(matches!(expect_err(v), SchemaError::Shape(_)));
    }

    #[test]
    fn rejects_unknown_impact() {
        let mut v = valid();
        v["impact"] = json!("lottery");
        match expect_err(v) {
            SchemaError::Shape(msg) => assert!(msg.contains("lottery")),
            other => panic!("expected Shape, got {:?}", other),
        }
    }

    #[test]
    fn rejects_wrong_protocol() {
        let mut v = valid();
        v["protocol"] = json!("PIC/0.9");
        assert!(matches!(expect_err(v), SchemaError::Protocol { .. }));
    }

    #[test]
    fn rejects_empty_provenance_id() {
        let mut v = valid();
        v["provenance"][0]["id"] = json!("  ");
        assert_eq!(expect_err(v), SchemaError::empty("provenance[0].id"));
    }

    #[test]
    fn rejects_duplicate_provenance_id() {
        let mut v = valid();
        v["provenance"] = json!([
            {"id": "a", "trust": "trusted"},
            {"id": "a", "trust": "untrusted"}
        ]);
        assert!(matches!(
            expect_err(v),
            SchemaError::DuplicateProvenance { .. }
        ));
    }

    #[test]
    fn rejects_empty_tool() {
        let mut v = valid();
        v["action"]["tool"] = json!("");
        assert_eq!(expect_err(v), SchemaError::empty("action.tool"));
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(
            expect_err(json!([1, 2, 3])),
            SchemaError::NotAnObject { found: "array" }
        );
    }

    #[test]
    fn rejects_unknown_evidence_type() {
        let mut v = valid();
        v["evidence"] = json!([{"id": "x", "type": "url", "uri": "https://example.com"}]);
        assert!(matches!(expect_err(v), SchemaError::Shape(_)));
    }

    #[test]
    fn accepts_mixed_evidence_and_extra_fields() {
        let mut v = valid();
        v["evidence"] = json!([
            {"id": "invoice_123", "type": "hash", "uri": "file://a.txt", "sha256": "00"},
            {"id": "approval_123", "type": "sig", "payload": "p", "signature": "c2ln",
             "key_id": "demo_signer_v1", "signer": "demo_signer_v1"}
        ]);
        let p = validate_proposal(&v).unwrap();
        assert_eq!(p.evidence.len(), 2);
        assert_eq!(p.evidence[1].kind(), "sig");
    }

    #[test]
    fn parse_reports_invalid_json() {
        assert!(matches!(
            parse_proposal(b"{not json"),
            Err(SchemaError::InvalidJson(_))
        ));
    }
}
