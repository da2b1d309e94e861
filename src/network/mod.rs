//! Network module - Manages the game server connection
//!
//! Provides:
//! - Connection lifecycle and the single-writer send path
//! - Inbound frame dispatch to per-type handlers

mod connection;
mod dispatch;

pub use connection::*;
pub use dispatch::*;

use std::time::Duration;

use crate::protocol::{DEFAULT_ENDPOINT, DEFAULT_SUBPROTOCOL};
use crate::transport::WsConnector;

/// Configuration for a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Endpoint URL, e.g. `ws://localhost:8080/ws`
    pub endpoint: String,
    /// Sub-protocol negotiated at handshake
    pub subprotocol: String,
    /// Transport connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            subprotocol: DEFAULT_SUBPROTOCOL.to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

impl NetworkConfig {
    pub fn new(endpoint: impl Into<String>, subprotocol: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            subprotocol: subprotocol.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// WebSocket connector honouring this config's timeout
    pub fn ws_connector(&self) -> WsConnector {
        WsConnector::new(Duration::from_millis(self.connect_timeout_ms))
    }
}
