// server.rs — The loopback HTTP bridge.
//
//   GET  /health  → 200 {"status":"ok"}
//   POST /verify  → 200 Decision
//
// The request body is attacker-influenced, so it is checked before it is
// read: Content-Type, then Content-Length (present, numeric, non-negative,
// non-zero, within the cap). The body is then read under a timeout and must
// be exactly the declared length. Any of these failures is a 400 carrying a
// blocked Decision (PIC_INVALID_REQUEST, eval_ms 0).
//
// Once a well-formed object is in hand the response is always 200: the
// verdict lives in `allowed`, never in the status code.

use std::sync::{Arc, RwLock};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pic_proposal::{json_type_name, Decision, PicError};
use pic_verifier::Pipeline;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Shared server state: the current pipeline and the transport config.
///
/// The pipeline can be swapped with [`replace_pipeline`](Self::replace_pipeline)
/// (operator-triggered reload). Requests already running keep the pipeline
/// they started with.
#[derive(Debug)]
pub struct BridgeState {
    pipeline: RwLock<Arc<Pipeline>>,
    config: BridgeConfig,
}

impl BridgeState {
    pub fn new(pipeline: Pipeline, config: BridgeConfig) -> Self {
        Self {
            pipeline: RwLock::new(Arc::new(pipeline)),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The pipeline new requests will use.
    pub fn pipeline(&self) -> Arc<Pipeline> {
        let guard = self.pipeline.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a freshly loaded pipeline.
    pub fn replace_pipeline(&self, pipeline: Pipeline) {
        let mut guard = self.pipeline.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(pipeline);
        tracing::info!("bridge pipeline reloaded");
    }
}

/// Build the bridge router.
pub fn router(state: Arc<BridgeState>) -> Router {
    Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/verify", post(verify).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state)
}

/// Bind the configured loopback address.
pub async fn bind(config: &BridgeConfig) -> Result<TcpListener, BridgeError> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|source| BridgeError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<BridgeState>,
    shutdown: F,
) -> Result<(), BridgeError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "PIC HTTP bridge listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("PIC HTTP bridge shut down");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": "Method not allowed"})),
    )
        .into_response()
}

async fn verify(
    State(state): State<Arc<BridgeState>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request = match read_json_body(state.config(), &headers, body).await {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(reason = %err.message, "rejected bridge request");
            let decision = Decision::block(err, 0, state.config().debug);
            return (StatusCode::BAD_REQUEST, Json(decision)).into_response();
        }
    };

    let tool_name = request
        .get("tool_name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim();
    let tool_args = request.get("tool_args").unwrap_or(&Value::Null);

    let decision = state.pipeline().evaluate_tool_call(tool_name, tool_args);
    (StatusCode::OK, Json(decision)).into_response()
}

async fn read_json_body(
    config: &BridgeConfig,
    headers: &HeaderMap,
    body: Body,
) -> Result<Value, PicError> {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        let ct = content_type.to_str().unwrap_or("");
        if !ct.contains("application/json") {
            return Err(PicError::invalid_request(format!(
                "Expected Content-Type application/json, got '{}'",
                ct
            )));
        }
    }

    let declared = declared_length(headers, config.body_limit())?;

    let read =
        tokio::time::timeout(config.read_timeout(), axum::body::to_bytes(body, declared)).await;
    let bytes = match read {
        Err(_) => {
            return Err(PicError::invalid_request(format!(
                "Request body read timed out after {} ms",
                config.read_timeout_ms
            )))
        }
        Ok(Err(e)) => {
            return Err(PicError::invalid_request(
                "Request body could not be read within its declared Content-Length",
            )
            .with_details(json!({ "reason": e.to_string() })))
        }
        Ok(Ok(bytes)) => bytes,
    };

    if bytes.len() < declared {
        return Err(PicError::invalid_request(format!(
            "Incomplete request body: expected {} bytes, got {}",
            declared,
            bytes.len()
        )));
    }

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        PicError::invalid_request("Malformed or non-JSON body")
            .with_details(json!({ "reason": e.to_string() }))
    })?;
    if !value.is_object() {
        return Err(PicError::invalid_request(format!(
            "Request body must be a JSON object, got {}",
            json_type_name(&value)
        )));
    }
    Ok(value)
}

fn declared_length(headers: &HeaderMap, limit: usize) -> Result<usize, PicError> {
    let raw = headers
        .get(header::CONTENT_LENGTH)
        .ok_or_else(|| PicError::invalid_request("Missing Content-Length header"))?;
    let text = raw.to_str().unwrap_or("").trim();
    let length: i64 = text.parse().map_err(|_| {
        PicError::invalid_request(format!("Invalid Content-Length header: '{}'", text))
    })?;

    if length < 0 {
        return Err(PicError::invalid_request(format!(
            "Invalid Content-Length: negative value ({})",
            length
        )));
    }
    if length == 0 {
        return Err(PicError::invalid_request("Empty request body"));
    }
    let length = usize::try_from(length).unwrap_or(usize::MAX);
    if length > limit {
        return Err(PicError::invalid_request(format!(
            "Request body too large: {} bytes (max {})",
            length, limit
        )));
    }
    Ok(length)
}
