//! Transport seam
//!
//! The connection manager never touches a socket directly. A [`Connector`]
//! requests a session for an endpoint and sub-protocol; the resulting
//! [`Transport`] moves whole binary frames in and out.

mod websocket;
pub mod memory;

pub use websocket::*;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Sub-protocol rejected: requested {requested:?}, server chose {negotiated:?}")]
    SubprotocolRejected {
        requested: String,
        negotiated: Option<String>,
    },

    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Transport closed")]
    Closed,
}

pub type TransportResult<T> = Result<T, TransportError>;

/// An established session carrying binary frames
#[async_trait]
pub trait Transport: Send + 'static {
    /// Write one frame as a single transport write
    async fn send(&mut self, frame: Bytes) -> TransportResult<()>;

    /// Wait for the next binary frame
    ///
    /// Returns `None` once the peer has closed the session. Must be
    /// cancel-safe: dropping the future loses no frame.
    async fn recv(&mut self) -> Option<TransportResult<Bytes>>;

    /// Close the session gracefully
    async fn close(&mut self) -> TransportResult<()>;
}

/// Opens a [`Transport`] to an endpoint
#[async_trait]
pub trait Connector: Send + 'static {
    type Transport: Transport;

    /// Perform the transport handshake, negotiating `subprotocol`
    async fn connect(self, endpoint: &str, subprotocol: &str) -> TransportResult<Self::Transport>;
}
