//! Error types for the room layer.

use roomcast_protocol::{ConnectionId, ErrorCode, RoomCode};

/// Errors returned by [`RoomRegistry`](crate::RoomRegistry) operations.
///
/// All of them are local to the connection that caused them and leave the
/// registry unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// The connection is not a member of any room.
    #[error("connection {0} is not in a room")]
    NotInRoom(ConnectionId),

    /// No room code could be handed out under the configured policy.
    #[error("no room codes available")]
    AllocationExhausted,
}

impl RoomError {
    /// The wire error code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::NotInRoom(_) => ErrorCode::NotInRoom,
            Self::AllocationExhausted => ErrorCode::AllocationExhausted,
        }
    }
}
