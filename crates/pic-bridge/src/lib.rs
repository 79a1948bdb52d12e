//! # pic-bridge
//!
//! A loopback-only HTTP bridge exposing the PIC evaluation pipeline to
//! non-native agent frameworks, plus a client that fails closed.
//!
//! - [`router`] / [`serve`]: `GET /health` and `POST /verify`.
//! - [`BridgeClient`]: turns any transport or shape failure into a blocked
//!   Decision with `PIC_BRIDGE_UNREACHABLE`.
//!
//! ## Key invariants
//!
//! - The server refuses to bind anything but a loopback address.
//! - `Content-Length` is validated before a single body byte is read, and the
//!   body read is bounded in both size and time.
//! - A well-formed request always gets HTTP 200; the verdict is `allowed`.
//! - The client never reports `allowed: true` unless the response said so
//!   unambiguously with HTTP 200.

pub mod client;
pub mod config;
pub mod error;
pub mod server;

pub use client::{interpret_response, BridgeClient, DEFAULT_CLIENT_TIMEOUT_MS};
pub use config::{
    BridgeConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_READ_TIMEOUT_MS, MAX_REQUEST_BYTES,
};
pub use error::BridgeError;
pub use server::{bind, router, serve, BridgeState};
