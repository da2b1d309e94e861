//! In-memory transport
//!
//! A connector/peer pair joined by channels. The peer plays the remote
//! side: it decides whether the connect succeeds, sees every frame the
//! transport writes, and can push frames back or hang up.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use super::{Connector, Transport, TransportError, TransportResult};

/// Endpoint and sub-protocol a connector was asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub endpoint: String,
    pub subprotocol: String,
}

/// Create a connected connector/peer pair
pub fn pair() -> (MemoryConnector, MemoryPeer) {
    let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();
    let (from_peer_tx, from_peer_rx) = mpsc::unbounded_channel();
    let (accept_tx, accept_rx) = oneshot::channel();
    let request = Arc::new(Mutex::new(None));

    let connector = MemoryConnector {
        accept: accept_rx,
        request: request.clone(),
        transport: MemoryTransport {
            outbound: to_peer_tx,
            inbound: from_peer_rx,
        },
    };

    let peer = MemoryPeer {
        accept: Some(accept_tx),
        request,
        inbound: to_peer_rx,
        outbound: Some(from_peer_tx),
    };

    (connector, peer)
}

/// Connector half of [`pair`]
pub struct MemoryConnector {
    accept: oneshot::Receiver<Result<(), String>>,
    request: Arc<Mutex<Option<ConnectRequest>>>,
    transport: MemoryTransport,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn connect(self, endpoint: &str, subprotocol: &str) -> TransportResult<MemoryTransport> {
        if let Ok(mut request) = self.request.lock() {
            *request = Some(ConnectRequest {
                endpoint: endpoint.to_string(),
                subprotocol: subprotocol.to_string(),
            });
        }

        match self.accept.await {
            Ok(Ok(())) => Ok(self.transport),
            Ok(Err(reason)) => Err(TransportError::Refused(reason)),
            Err(_) => Err(TransportError::Refused("peer went away".to_string())),
        }
    }
}

/// Transport half of [`pair`]
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<Bytes>,
    inbound: mpsc::UnboundedReceiver<Bytes>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: Bytes) -> TransportResult<()> {
        self.outbound.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<TransportResult<Bytes>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.inbound.close();
        Ok(())
    }
}

/// Remote side of [`pair`]
pub struct MemoryPeer {
    accept: Option<oneshot::Sender<Result<(), String>>>,
    request: Arc<Mutex<Option<ConnectRequest>>>,
    inbound: mpsc::UnboundedReceiver<Bytes>,
    outbound: Option<mpsc::UnboundedSender<Bytes>>,
}

impl MemoryPeer {
    /// Let the pending connect succeed
    pub fn accept(&mut self) {
        if let Some(tx) = self.accept.take() {
            let _ = tx.send(Ok(()));
        }
    }

    /// Fail the pending connect
    pub fn refuse(&mut self, reason: &str) {
        if let Some(tx) = self.accept.take() {
            let _ = tx.send(Err(reason.to_string()));
        }
    }

    /// What the connector was asked to connect to, once it has been asked
    pub fn request(&self) -> Option<ConnectRequest> {
        self.request.lock().ok().and_then(|r| r.clone())
    }

    /// Deliver a frame to the transport
    pub fn send(&self, frame: impl Into<Bytes>) -> bool {
        match &self.outbound {
            Some(tx) => tx.send(frame.into()).is_ok(),
            None => false,
        }
    }

    /// Next frame written by the transport, `None` once it is gone
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.inbound.recv().await
    }

    /// Frame already written by the transport, without waiting
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.inbound.try_recv().ok()
    }

    /// Hang up: the transport sees end of stream
    pub fn close(&mut self) {
        self.outbound = None;
    }
}
