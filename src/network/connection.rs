//! Connection handling for the game client
//!
//! A [`Connection`] owns one transport session. A background task holds the
//! transport and is its only writer: every `send` encodes on the caller's
//! side and queues the frame, so frames reach the transport in call order
//! no matter how many [`ConnectionHandle`]s are producing. The same task
//! reads inbound frames and hands them to the [`Dispatcher`].
//!
//! Frames still queued when the connection closes are discarded. A
//! successful `send` means the frame was handed to the local queue, not
//! that the server received it.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::{ConnectionEvent, Dispatcher, NetworkConfig};
use crate::protocol::{self, CodecError, Message};
use crate::transport::{Connector, Transport};

/// Send errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Not connected (state: {0:?})")]
    NotConnected(ConnectionState),

    #[error("Encode error: {0}")]
    Encode(#[from] CodecError),
}

pub type SendResult<T> = Result<T, SendError>;

/// State of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport requested, handshake in progress
    Connecting,
    /// Ready for communication
    Open,
    /// Closing gracefully
    Closing,
    /// Terminal
    Closed,
}

impl ConnectionState {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Open) | (Connecting, Closed) | (Open, Closing) | (Open, Closed) | (Closing, Closed)
        )
    }
}

fn transition(state: &watch::Sender<ConnectionState>, next: ConnectionState) -> bool {
    state.send_if_modified(|current| {
        if current.can_transition_to(next) {
            tracing::debug!("Connection state {:?} -> {:?}", current, next);
            *current = next;
            true
        } else {
            false
        }
    })
}

/// A handle for sending messages through a connection
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<Bytes>,
}

impl ConnectionHandle {
    /// Encode a message and queue it for the transport
    ///
    /// Fails with [`SendError::NotConnected`] unless the connection is
    /// `Open`; nothing is queued in that case.
    pub fn send(&self, message: &Message) -> SendResult<()> {
        let state = *self.state.borrow();
        if state != ConnectionState::Open {
            return Err(SendError::NotConnected(state));
        }

        let frame = protocol::encode(message)?;
        self.outbound
            .send(frame)
            .map_err(|_| SendError::NotConnected(ConnectionState::Closed))
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

}

/// A connection to the game server
pub struct Connection {
    config: NetworkConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    handle: ConnectionHandle,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Start connecting to `config.endpoint`
    ///
    /// Returns at once in `Connecting`; the handshake runs on a spawned
    /// task, so this must be called from within a Tokio runtime. Dropping
    /// the `Connection` closes it.
    pub fn open<C: Connector>(config: NetworkConfig, connector: C, dispatcher: Dispatcher) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let state = Arc::new(state_tx);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tracing::info!("Connecting to {} ({})", config.endpoint, config.subprotocol);

        let task = tokio::spawn(run(
            connector,
            config.clone(),
            state.clone(),
            outbound_rx,
            shutdown_rx,
            dispatcher,
        ));

        Self {
            config,
            state,
            handle: ConnectionHandle {
                state: state_rx,
                outbound: outbound_tx,
            },
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Get the endpoint this connection targets
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Get the sub-protocol requested at handshake
    pub fn subprotocol(&self) -> &str {
        &self.config.subprotocol
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Get a cloneable handle for other producers
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Encode a message and queue it for the transport
    pub fn send(&self, message: &Message) -> SendResult<()> {
        self.handle.send(message)
    }

    /// Wait until the connection reaches `target`, or `Closed`
    pub async fn wait_for_state(&self, target: ConnectionState) -> ConnectionState {
        let mut rx = self.state.subscribe();
        let result = rx
            .wait_for(|state| *state == target || *state == ConnectionState::Closed)
            .await
            .map(|state| *state);
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Close the connection and wait for the transport to shut down
    ///
    /// Queued frames that have not reached the transport yet are discarded.
    pub async fn close(&mut self) {
        transition(&self.state, ConnectionState::Closing);
        let _ = self.shutdown_tx.try_send(());

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Connection task failed: {}", e);
            }
        }
    }
}

async fn run<C: Connector>(
    connector: C,
    config: NetworkConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
    mut shutdown: mpsc::Receiver<()>,
    mut dispatcher: Dispatcher,
) {
    let connected = tokio::select! {
        result = connector.connect(&config.endpoint, &config.subprotocol) => Some(result),
        _ = shutdown.recv() => None,
    };

    let mut transport = match connected {
        Some(Ok(transport)) => transport,
        Some(Err(e)) => {
            tracing::warn!("Failed to connect to {}: {}", config.endpoint, e);
            finish(&state, &mut outbound, &dispatcher, format!("Connect failed: {}", e));
            return;
        }
        None => {
            finish(&state, &mut outbound, &dispatcher, "Closed before open".to_string());
            return;
        }
    };

    transition(&state, ConnectionState::Open);
    tracing::info!("Connected to {} ({})", config.endpoint, config.subprotocol);
    dispatcher.report(ConnectionEvent::Opened {
        endpoint: config.endpoint.clone(),
        subprotocol: config.subprotocol.clone(),
    });

    let (reason, graceful) = loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                break ("Closed by client".to_string(), true);
            }

            Some(frame) = outbound.recv() => {
                let len = frame.len();
                if let Err(e) = transport.send(frame).await {
                    break (format!("Send error: {}", e), false);
                }
                tracing::debug!("Sent frame ({} bytes)", len);
            }

            result = transport.recv() => {
                match result {
                    Some(Ok(frame)) => {
                        dispatcher.dispatch(&frame);
                    }
                    Some(Err(e)) => {
                        break (format!("Transport error: {}", e), false);
                    }
                    None => {
                        break ("Closed by peer".to_string(), true);
                    }
                }
            }
        }
    };

    if graceful {
        transition(&state, ConnectionState::Closing);
        if let Err(e) = transport.close().await {
            tracing::warn!("Error closing transport: {}", e);
        }
    }

    finish(&state, &mut outbound, &dispatcher, reason);
}

fn finish(
    state: &watch::Sender<ConnectionState>,
    outbound: &mut mpsc::UnboundedReceiver<Bytes>,
    dispatcher: &Dispatcher,
    reason: String,
) {
    transition(state, ConnectionState::Closed);

    outbound.close();
    let mut discarded = 0usize;
    while outbound.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        tracing::warn!("Discarded {} queued frame(s) on close", discarded);
    }

    tracing::info!("Connection closed: {}", reason);
    dispatcher.report(ConnectionEvent::Closed { reason });
}
