//! Error types for the protocol layer.

/// Errors raised while turning messages into bytes and back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Inbound bytes were not a well-formed message: malformed JSON, a
    /// non-object frame, or a known `type` whose fields have the wrong
    /// shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame parsed but a value in it is unusable, e.g. a room code
    /// that is not a non-negative 32-bit integer.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
