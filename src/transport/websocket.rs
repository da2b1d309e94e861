//! WebSocket transport
//!
//! One protocol frame per binary WebSocket message. Ping/pong is answered
//! by tungstenite itself; text messages are not part of the protocol and
//! are skipped.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Connector, Transport, TransportError, TransportResult};

/// Opens WebSocket sessions
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000))
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(self, endpoint: &str, subprotocol: &str) -> TransportResult<WsTransport> {
        let mut request = endpoint.into_client_request()?;
        let protocol = HeaderValue::from_str(subprotocol)
            .map_err(|e| TransportError::InvalidRequest(format!("sub-protocol {:?}: {}", subprotocol, e)))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);

        tracing::debug!("WebSocket handshake with {} ({})", endpoint, subprotocol);

        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::Timeout)??;

        let negotiated = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if negotiated.as_deref() != Some(subprotocol) {
            return Err(TransportError::SubprotocolRejected {
                requested: subprotocol.to_string(),
                negotiated,
            });
        }

        Ok(WsTransport { stream })
    }
}

/// An open WebSocket session
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: Bytes) -> TransportResult<()> {
        self.stream.send(WsMessage::Binary(frame.to_vec())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportResult<Bytes>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(WsMessage::Binary(data)) => return Some(Ok(Bytes::from(data))),
                Ok(WsMessage::Text(text)) => {
                    tracing::debug!("Ignoring text message ({} bytes)", text.len());
                }
                Ok(WsMessage::Close(frame)) => {
                    tracing::debug!("Peer sent close: {:?}", frame);
                    return None;
                }
                Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) | Ok(WsMessage::Frame(_)) => {}
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    async fn close(&mut self) -> TransportResult<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
