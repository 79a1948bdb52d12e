// client.rs — Fail-closed client for a running bridge.
//
// Every way the bridge can fail to give a clear, well-formed answer turns
// into a blocked Decision with PIC_BRIDGE_UNREACHABLE: connection refused,
// timeout, a non-JSON body, a response whose shape contradicts itself. The
// client never returns an allow it could not fully read.

use std::time::Duration;

use pic_proposal::{Decision, DecisionError, ErrorCode, PicError};
use serde_json::{json, Value};

use crate::config::{DEFAULT_HOST, DEFAULT_PORT};
use crate::error::BridgeError;

pub const DEFAULT_CLIENT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct BridgeClient {
    base_url: String,
    http: reqwest::Client,
}

impl BridgeClient {
    /// Client for `base_url` (e.g. `http://127.0.0.1:7580`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Client(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn local() -> Result<Self, BridgeError> {
        Self::new(
            format!("http://{}:{}", DEFAULT_HOST, DEFAULT_PORT),
            Duration::from_millis(DEFAULT_CLIENT_TIMEOUT_MS),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the bridge for a decision on one tool call.
    pub async fn verify(&self, tool_name: &str, tool_args: &Value) -> Decision {
        let body = json!({"tool_name": tool_name, "tool_args": tool_args});
        let url = format!("{}/verify", self.base_url);

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "bridge request failed");
                return unreachable(format!("bridge request failed: {}", e));
            }
        };
        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(bytes) => interpret_response(status, &bytes),
            Err(e) => unreachable(format!("bridge response could not be read: {}", e)),
        }
    }

    /// `true` when `/health` answers `{"status":"ok"}`.
    pub async fn health(&self) -> Result<bool, BridgeError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::Client(e.to_string()))?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| BridgeError::Client(e.to_string()))?;
        Ok(body.get("status").and_then(Value::as_str) == Some("ok"))
    }
}

fn unreachable(message: impl Into<String>) -> Decision {
    Decision::block(PicError::new(ErrorCode::BridgeUnreachable, message), 0, false)
}

/// Turn a raw bridge response into a Decision, failing closed on anything
/// ambiguous.
pub fn interpret_response(status: u16, body: &[u8]) -> Decision {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => {
            return unreachable(format!(
                "bridge returned non-JSON response (HTTP {})",
                status
            ))
        }
    };
    let Some(obj) = value.as_object() else {
        return unreachable("bridge response is not a JSON object");
    };
    let Some(allowed) = obj.get("allowed").and_then(Value::as_bool) else {
        return unreachable("bridge response has no boolean 'allowed'");
    };
    let eval_ms = obj.get("eval_ms").and_then(Value::as_u64).unwrap_or(0);
    let error = obj.get("error").unwrap_or(&Value::Null);

    if allowed {
        if status != 200 {
            return unreachable(format!("bridge allowed with HTTP {}", status));
        }
        if !error.is_null() {
            return unreachable("bridge response allowed with a non-null error");
        }
        return Decision::allow(eval_ms);
    }

    let Some(code) = error
        .get("code")
        .and_then(Value::as_str)
        .and_then(ErrorCode::from_core_str)
    else {
        return unreachable("bridge blocked with a missing or unknown error code");
    };
    let Some(message) = error.get("message").and_then(Value::as_str) else {
        return unreachable("bridge blocked without an error message");
    };
    Decision {
        allowed: false,
        error: Some(DecisionError {
            code,
            message: message.to_string(),
            details: error.get("details").cloned(),
        }),
        eval_ms,
    }
}
