//! Axiomwire - Wire protocol and connection layer for the Axioms game client
//!
//! - [`protocol`]: typed messages and the frame codec
//! - [`network`]: the connection manager and inbound dispatch
//! - [`transport`]: WebSocket and in-memory transports
//! - [`config`]: configuration file handling

pub mod config;
pub mod network;
pub mod protocol;
pub mod transport;
