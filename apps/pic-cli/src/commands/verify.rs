// verify.rs — `pic verify <file>`: run a proposal document through the full
// pipeline.
//
// Without `--tool`, the proposal is bound to its own declared action. With
// `--tool`, the declared action must name that tool (the args compared are
// the proposal's own, so only substitution of the tool name is detected).

use std::path::Path;
use std::process::ExitCode;

use pic_verifier::ToolCall;
use serde_json::{Map, Value};

use super::{decision_exit_code, parent_dir, read_file, Bootstrap};

pub fn execute(boot: &Bootstrap, file: &Path, tool: Option<&str>) -> anyhow::Result<ExitCode> {
    let raw = read_file(file)?;
    let pipeline = boot.pipeline(&parent_dir(file))?;

    let call = match tool {
        Some(name) if raw.len() <= pipeline.limits().max_proposal_bytes => {
            Some(ToolCall::new(name.trim(), declared_args(&raw)))
        }
        // Oversized input: leave it to the pipeline to reject unparsed.
        Some(name) => Some(ToolCall::new(name.trim(), Map::new())),
        None => None,
    };

    let decision = pipeline.evaluate_proposal_bytes(&raw, call.as_ref());
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(decision_exit_code(&decision))
}

fn declared_args(raw: &[u8]) -> Map<String, Value> {
    serde_json::from_slice::<Value>(raw)
        .ok()
        .and_then(|v| v.pointer("/action/args").and_then(Value::as_object).cloned())
        .unwrap_or_default()
}
