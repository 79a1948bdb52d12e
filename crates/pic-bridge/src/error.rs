// error.rs — Error types for starting and talking to the bridge.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The bridge only ever listens on a loopback interface.
    #[error("refusing to bind non-loopback address '{host}' (the bridge is localhost-only)")]
    NonLoopbackHost { host: String },

    #[error("invalid bridge address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("failed to bind bridge on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("bridge server error: {0}")]
    Serve(#[from] std::io::Error),

    /// Building the HTTP client or a health probe failed.
    #[error("bridge client error: {0}")]
    Client(String),
}
