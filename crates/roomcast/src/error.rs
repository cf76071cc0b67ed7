//! Unified error type for the relay server.

use roomcast_protocol::ProtocolError;
use roomcast_room::RoomError;
use roomcast_session::SessionError;
use roomcast_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum RoomcastError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    /// The relay actor has stopped and no longer accepts commands.
    #[error("relay is not running")]
    RelayUnavailable,
}
