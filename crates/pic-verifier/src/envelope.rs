// envelope.rs — The real tool call and the proposal riding inside it.
//
// Agents attach the proposal to the tool arguments under `__pic`. That key
// and `__pic_request_id` are transport metadata: they are removed before the
// arguments are compared with `proposal.action.args`. Any other key, even one
// that merely starts with `__pic`, is a real argument and stays bound.

use pic_proposal::ToolBinding;
use serde_json::{Map, Value};

/// Argument key carrying the Action Proposal.
pub const PIC_ENVELOPE_KEY: &str = "__pic";

/// Argument key carrying a caller-side correlation id.
pub const PIC_REQUEST_ID_KEY: &str = "__pic_request_id";

fn is_transport_key(key: &str) -> bool {
    key == PIC_ENVELOPE_KEY || key == PIC_REQUEST_ID_KEY
}

/// The tool invocation a proposal must be bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Split raw tool arguments into the call itself and the attached
    /// proposal, if any. A `null` proposal counts as absent.
    pub fn from_envelope(
        name: impl Into<String>,
        raw_args: &Map<String, Value>,
    ) -> (Self, Option<Value>) {
        let proposal = raw_args
            .get(PIC_ENVELOPE_KEY)
            .filter(|v| !v.is_null())
            .cloned();
        let args = raw_args
            .iter()
            .filter(|(k, _)| !is_transport_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        (Self::new(name, args), proposal)
    }

    /// The call a proposal declares for itself. Used when verifying a
    /// proposal document offline.
    pub fn from_binding(binding: &ToolBinding) -> Self {
        Self::new(binding.tool.clone(), binding.args.clone())
    }
}
