//! Inbound frame dispatch
//!
//! Decodes frames coming off the transport and routes each message to the
//! handler registered for its type. Nothing that happens here is fatal to
//! the connection: bad frames and unhandled messages become events.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::protocol::{self, CodecError, Message, MessageType};

/// Events emitted by a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Transport session established
    Opened {
        endpoint: String,
        subprotocol: String,
    },
    /// A frame could not be decoded and was dropped
    DecodeFailed {
        error: CodecError,
        frame_len: usize,
    },
    /// A message arrived with no handler registered for its type
    Unhandled {
        message: Message,
    },
    /// Connection reached `Closed`
    Closed {
        reason: String,
    },
}

/// What happened to one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered(MessageType),
    Unhandled(MessageType),
    Rejected(CodecError),
}

/// Handler invoked on the connection task; must not block
pub type MessageHandler = Box<dyn FnMut(Message) + Send + 'static>;

/// Per-type handler registry plus the event sink
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<MessageType, MessageHandler>,
    events: Option<mpsc::UnboundedSender<ConnectionEvent>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a message type, replacing any previous one
    pub fn on<F>(&mut self, message_type: MessageType, handler: F) -> &mut Self
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.handlers.insert(message_type, Box::new(handler));
        self
    }

    /// Create the event stream (can only be taken once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>> {
        if self.events.is_some() {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        Some(rx)
    }

    /// Decode a frame and deliver the message
    pub fn dispatch(&mut self, frame: &[u8]) -> DispatchOutcome {
        let message = match protocol::decode(frame) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!("Dropping frame ({} bytes): {}", frame.len(), error);
                self.report(ConnectionEvent::DecodeFailed {
                    error: error.clone(),
                    frame_len: frame.len(),
                });
                return DispatchOutcome::Rejected(error);
            }
        };

        let message_type = message.message_type();
        match self.handlers.get_mut(&message_type) {
            Some(handler) => {
                tracing::debug!("Delivering {:?}", message);
                handler(message);
                DispatchOutcome::Delivered(message_type)
            }
            None => {
                tracing::debug!("No handler for {}", message_type);
                self.report(ConnectionEvent::Unhandled { message });
                DispatchOutcome::Unhandled(message_type)
            }
        }
    }

    /// Push an event to the sink, if anyone is listening
    pub fn report(&self, event: ConnectionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_delivers_to_registered_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut dispatcher = Dispatcher::new();
        dispatcher.on(MessageType::ReadyStatusChanged, move |msg| {
            sink.lock().unwrap().push(msg);
        });

        let outcome = dispatcher.dispatch(&[0x00, 0x01, 0x01]);
        assert_eq!(outcome, DispatchOutcome::Delivered(MessageType::ReadyStatusChanged));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Message::ReadyStatusChanged { ready: true }]
        );
    }

    #[test]
    fn test_unhandled_is_reported() {
        let mut dispatcher = Dispatcher::new();
        let mut events = dispatcher.take_event_receiver().unwrap();

        let outcome = dispatcher.dispatch(&[0x03, 0x00]);
        assert_eq!(outcome, DispatchOutcome::Unhandled(MessageType::PlayerTurnStart));
        assert_eq!(
            events.try_recv().unwrap(),
            ConnectionEvent::Unhandled {
                message: Message::PlayerTurnStart
            }
        );
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let mut dispatcher = Dispatcher::new();
        let mut events = dispatcher.take_event_receiver().unwrap();

        let outcome = dispatcher.dispatch(&[0xFF, 0x00]);
        assert_eq!(
            outcome,
            DispatchOutcome::Rejected(CodecError::UnknownMessageType(0xFF))
        );
        assert_eq!(
            events.try_recv().unwrap(),
            ConnectionEvent::DecodeFailed {
                error: CodecError::UnknownMessageType(0xFF),
                frame_len: 2,
            }
        );
    }

    #[test]
    fn test_event_receiver_taken_once() {
        let mut dispatcher = Dispatcher::new();
        assert!(dispatcher.take_event_receiver().is_some());
        assert!(dispatcher.take_event_receiver().is_none());
    }

    #[test]
    fn test_register_replaces_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = seen.clone();
        let second = seen.clone();

        let mut dispatcher = Dispatcher::new();
        dispatcher
            .on(MessageType::GameInit, move |_| first.lock().unwrap().push("first"))
            .on(MessageType::GameInit, move |_| second.lock().unwrap().push("second"));

        dispatcher.dispatch(&[0x01, 0x00]);
        assert_eq!(*seen.lock().unwrap(), vec!["second"]);
    }
}
