//! Protocol module - Defines the wire protocol for Axioms game messages
//!
//! Every message travels as one binary frame:
//! - 1 byte message type
//! - 1 byte payload length
//! - Variable length payload (exactly the declared length)
//!
//! Multi-byte fields, should any variant gain one, are big-endian.

mod message;
mod codec;

pub use message::*;
pub use codec::*;

/// Header size: type(1) + length(1) = 2 bytes
pub const HEADER_SIZE: usize = 2;

/// Largest payload the 1-byte length field can describe
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Sub-protocol the game server negotiates at WebSocket handshake
pub const DEFAULT_SUBPROTOCOL: &str = "axioms";

/// Endpoint the game server listens on by default
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws";
