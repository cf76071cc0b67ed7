//! Codec trait and the JSON implementation.
//!
//! The relay only ever talks JSON to its browser clients, but handlers are
//! written against [`Codec`] so the encoding can be swapped in tests or for
//! a binary client later.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts between typed messages and raw frame payloads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Parses a frame payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or do
    /// not match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. Produces compact UTF-8 JSON, which
/// is what text-frame WebSocket clients expect.
///
/// ```rust
/// use roomcast_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let msg: ClientMessage = JsonCodec.decode(br#"{"type":"REACHED_GOAL"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::ReachedGoal);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, RoomCode, ServerMessage};

    #[test]
    fn test_json_codec_encodes_compact_text() {
        let bytes = JsonCodec
            .encode(&ServerMessage::RoomCreated {
                room_id: RoomCode::new(1234),
            })
            .unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"type":"ROOM_CREATED","roomId":1234}"#
        );
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let err = JsonCodec.decode::<ClientMessage>(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_json_codec_decode_non_object_is_decode_error() {
        let err = JsonCodec.decode::<ClientMessage>(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
