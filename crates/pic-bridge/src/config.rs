// config.rs — Bridge server configuration.
//
// Defaults match a local sidecar: 127.0.0.1:7580, 1 MiB request cap, 5 s
// body read timeout. The host must resolve to a loopback address; network
// authentication and TLS are out of the bridge's hands.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7580;

/// Fixed cap on request bodies (1 MiB).
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted `Content-Length`. Never above [`MAX_REQUEST_BYTES`].
    pub max_request_bytes: usize,
    /// How long a handler waits for the declared body to arrive.
    pub read_timeout_ms: u64,
    /// Attach diagnostic details to transport-level rejections.
    pub debug: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_request_bytes: MAX_REQUEST_BYTES,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            debug: false,
        }
    }
}

impl BridgeConfig {
    /// The effective body cap: the configured value, clamped to 1 MiB.
    pub fn body_limit(&self) -> usize {
        self.max_request_bytes.min(MAX_REQUEST_BYTES)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Resolve the listen address, refusing anything but loopback.
    pub fn socket_addr(&self) -> Result<SocketAddr, BridgeError> {
        let host = self.host.trim();
        let ip = if host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            host.trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .map_err(|e| BridgeError::InvalidAddress {
                    addr: host.to_string(),
                    reason: e.to_string(),
                })?
        };
        if !ip.is_loopback() {
            return Err(BridgeError::NonLoopbackHost {
                host: host.to_string(),
            });
        }
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:7580");
        assert_eq!(config.body_limit(), 1024 * 1024);
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn loopback_variants_are_accepted() {
        for host in ["localhost", "127.0.0.1", "::1", "[::1]", "127.0.0.2"] {
            let config = BridgeConfig {
                host: host.into(),
                ..Default::default()
            };
            assert!(config.socket_addr().is_ok(), "{} should be accepted", host);
        }
    }

    #[test]
    fn public_interfaces_are_refused() {
        for host in ["0.0.0.0", "192.168.1.10", "::"] {
            let config = BridgeConfig {
                host: host.into(),
                ..Default::default()
            };
            match config.socket_addr() {
                Err(BridgeError::NonLoopbackHost { .. }) => {}
                other => panic!("expected NonLoopbackHost for {}, got {:?}", host, other),
            }
        }
    }

    #[test]
    fn body_limit_is_clamped() {
        let config = BridgeConfig {
            max_request_bytes: 10 * 1024 * 1024,
            ..Default::default()
        };
        assert_eq!(config.body_limit(), MAX_REQUEST_BYTES);
    }
}
