//! Transport layer for Roomcast.
//!
//! Provides the [`Transport`] and [`Connection`] traits that hide the
//! network protocol from the relay, plus the WebSocket implementation the
//! relay server runs on.
//!
//! The transport owns connection identity: every accepted connection gets
//! a fresh [`ConnectionId`] from a process-wide counter, and that id is
//! what the rest of the stack uses to address the connection.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a connection, unique for the life of the process.
///
/// Serializes as a plain number, which is how clients see it in
/// `INIT { connectionId }` and `PLAYER_REMOVED { connectionId }`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How outbound payloads are framed on the wire.
///
/// Browser clients of a JSON protocol expect text frames; binary codecs
/// want binary frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameKind {
    /// UTF-8 text frames. Sending non-UTF-8 bytes fails with
    /// [`TransportError::InvalidText`].
    #[default]
    Text,
    /// Binary frames.
    Binary,
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive payloads.
///
/// `send` and `recv` take `&self` and may be called concurrently from
/// different tasks: a reader loop and a writer loop share one connection.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one payload to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next payload from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ConnectionId::new(12)).unwrap();
        assert_eq!(json, "12");

        let id: ConnectionId = serde_json::from_str("12").unwrap();
        assert_eq!(id, ConnectionId::new(12));
    }

    #[test]
    fn test_connection_id_orders_by_value() {
        let mut ids = vec![
            ConnectionId::new(3),
            ConnectionId::new(1),
            ConnectionId::new(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ConnectionId::new(1),
                ConnectionId::new(2),
                ConnectionId::new(3)
            ]
        );
    }

    #[test]
    fn test_frame_kind_defaults_to_text() {
        assert_eq!(FrameKind::default(), FrameKind::Text);
    }
}
