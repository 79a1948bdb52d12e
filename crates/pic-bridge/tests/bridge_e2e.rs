// bridge_e2e.rs — The bridge over a real loopback socket.
//
// Starts the server on 127.0.0.1:0 and talks to it with `BridgeClient` and
// with a raw TCP stream for the slow-body case.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use pic_bridge::{bind, serve, BridgeClient, BridgeConfig, BridgeState};
use pic_evidence::hash_bytes;
use pic_keyring::TrustedKeyRing;
use pic_policy::PolicyEngine;
use pic_proposal::ErrorCode;
use pic_verifier::{Pipeline, PipelineOptions};

const INVOICE: &[u8] = b"Invoice 123\nAmount: 500 USD\n";

struct Running {
    base_url: String,
    addr: std::net::SocketAddr,
    stop: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

async fn start(dir: &std::path::Path, config: BridgeConfig) -> Running {
    let policy =
        PolicyEngine::from_value(&json!({"impact_by_tool": {"payments_send": "money"}})).unwrap();
    let pipeline = Pipeline::new(Arc::new(policy), Arc::new(TrustedKeyRing::empty()))
        .with_options(PipelineOptions {
            verify_evidence: true,
            proposal_base_dir: dir.to_path_buf(),
            debug: false,
        });

    let listener = bind(&BridgeConfig { port: 0, ..config.clone() }).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(BridgeState::new(pipeline, config));
    let (stop, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        serve(listener, state, async move {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });
    Running {
        base_url: format!("http://{}", addr),
        addr,
        stop,
        handle,
    }
}

fn money_args(evidence: Value) -> Value {
    json!({
        "amount": 500,
        "__pic": {
            "protocol": "PIC/1.0",
            "intent": "Pay invoice 123",
            "impact": "money",
            "provenance": [{"id": "invoice_123", "trust": "untrusted"}],
            "claims": [{"text": "Invoice 123 is due", "evidence": ["invoice_123"]}],
            "action": {"tool": "payments_send", "args": {"amount": 500}},
            "evidence": evidence
        }
    })
}

#[tokio::test]
async fn client_round_trip_over_loopback() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("invoice.txt"), INVOICE).unwrap();
    let server = start(dir.path(), BridgeConfig::default()).await;
    let client = BridgeClient::new(server.base_url.clone(), Duration::from_secs(5)).unwrap();

    assert!(client.health().await.unwrap());

    let blocked = client.verify("payments_send", &money_args(json!([]))).await;
    assert!(!blocked.allowed);
    assert_eq!(blocked.code(), Some(ErrorCode::EvidenceRequired));

    let evidence = json!([{
        "id": "invoice_123",
        "type": "hash",
        "uri": "file://invoice.txt",
        "sha256": hash_bytes(INVOICE)
    }]);
    let allowed = client.verify("payments_send", &money_args(evidence)).await;
    assert!(allowed.allowed, "unexpected block: {:?}", allowed.error);

    let _ = server.stop.send(());
    server.handle.await.unwrap();
}

#[tokio::test]
async fn stopped_server_fails_closed_for_clients() {
    let dir = TempDir::new().unwrap();
    let server = start(dir.path(), BridgeConfig::default()).await;
    let client = BridgeClient::new(server.base_url.clone(), Duration::from_millis(500)).unwrap();

    let _ = server.stop.send(());
    server.handle.await.unwrap();

    let d = client.verify("weather", &json!({})).await;
    assert!(!d.allowed);
    assert_eq!(d.code(), Some(ErrorCode::BridgeUnreachable));
}

#[tokio::test]
async fn slow_body_is_cut_off() {
    let dir = TempDir::new().unwrap();
    let server = start(
        dir.path(),
        BridgeConfig {
            read_timeout_ms: 100,
            ..Default::default()
        },
    )
    .await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let head = "POST /verify HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 200\r\nConnection: close\r\n\r\n{\"tool_name\":";
    stream.write_all(head.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server should answer before the client gives up")
        .unwrap();
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.1 400"), "got: {}", text);
    assert!(text.contains("PIC_INVALID_REQUEST"));
    assert!(text.contains("timed out"));

    let _ = server.stop.send(());
    server.handle.await.unwrap();
}
