//! Error types for the session layer.

use roomcast_protocol::ConnectionId;

/// Errors raised by the [`ConnectionRegistry`](crate::ConnectionRegistry).
///
/// None of these are fatal: a missing connection usually means the
/// transport already tore it down.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No connection is registered under this id.
    #[error("connection {0} is not registered")]
    NotFound(ConnectionId),
}
