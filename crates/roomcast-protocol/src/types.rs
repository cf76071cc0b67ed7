//! Message types exchanged between the relay and its clients.
//!
//! Every frame is a JSON object discriminated by a `type` field in
//! SCREAMING_SNAKE_CASE. Field names use camelCase (`roomId`,
//! `connectionId`, `playerList`) because the clients are browser games.

use std::fmt;
use std::str::FromStr;

use roomcast_transport::ConnectionId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Numeric code identifying a live room.
///
/// Four digits under normal load. Serializes as a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(u32);

impl RoomCode {
    pub fn new(code: u32) -> Self {
        Self(code)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Reads a room code out of an arbitrary JSON value.
    ///
    /// Accepts a non-negative integer that fits in `u32`, or a string
    /// holding one (surrounding whitespace allowed).
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).map(Self),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| ProtocolError::InvalidMessage(format!("bad room code {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// Opaque per-player payload. The relay never looks inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerState(Map<String, Value>);

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites fields present in `partial`; every other field stays.
    pub fn merge(&mut self, partial: PlayerState) {
        for (key, value) in partial.0 {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for PlayerState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for PlayerState {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable reason carried by [`ServerMessage::Error`].
///
/// Serialized as its [`as_str`](Self::as_str) name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ErrorCode {
    /// `JOIN_ROOM` named a code with no live room.
    RoomNotFound,
    /// The sender is not in a room.
    NotInRoom,
    /// No room code could be allocated.
    AllocationExhausted,
    /// A recognised message was missing a required field.
    InvalidMessage,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 4] = [
        Self::RoomNotFound,
        Self::NotInRoom,
        Self::AllocationExhausted,
        Self::InvalidMessage,
    ];

    /// The wire name, e.g. `ROOM_NOT_FOUND`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::AllocationExhausted => "ALLOCATION_EXHAUSTED",
            Self::InvalidMessage => "INVALID_MESSAGE",
        }
    }
}

impl From<ErrorCode> for &'static str {
    fn from(code: ErrorCode) -> Self {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == name)
            .ok_or_else(|| format!("unknown error code `{name}`"))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ClientMessage
// ---------------------------------------------------------------------------

/// A message sent by a client.
///
/// Unrecognised `type` values decode to [`ClientMessage::Unknown`] so that
/// newer clients can talk to an older relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    CreateRoom {
        #[serde(default, deserialize_with = "null_as_empty")]
        player: PlayerState,
    },
    JoinRoom {
        /// `None` when the field is missing or not a usable code.
        #[serde(
            rename = "roomId",
            default,
            deserialize_with = "lenient_room_code",
            skip_serializing_if = "Option::is_none"
        )]
        room_id: Option<RoomCode>,
        #[serde(default, deserialize_with = "null_as_empty")]
        player: PlayerState,
    },
    UpdatePlayer {
        #[serde(default, deserialize_with = "null_as_empty")]
        player: PlayerState,
    },
    UpdateScene {
        #[serde(default)]
        scene: Value,
    },
    ReachedGoal,
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// The wire name of this message's type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "CREATE_ROOM",
            Self::JoinRoom { .. } => "JOIN_ROOM",
            Self::UpdatePlayer { .. } => "UPDATE_PLAYER",
            Self::UpdateScene { .. } => "UPDATE_SCENE",
            Self::ReachedGoal => "REACHED_GOAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<PlayerState, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<PlayerState>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn lenient_room_code<'de, D>(deserializer: D) -> Result<Option<RoomCode>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(RoomCode::from_json(&value))
}

// ---------------------------------------------------------------------------
// ServerMessage
// ---------------------------------------------------------------------------

/// A message sent by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First frame on every connection.
    Init { connection_id: ConnectionId },
    RoomCreated { room_id: RoomCode },
    JoinRoomSuccess { room_id: RoomCode },
    Error { code: ErrorCode, message: String },
    PlayerRemoved { connection_id: ConnectionId },
    SceneUpdated { scene: Value },
    ReachedGoal,
    /// Snapshot of every player in the room, sent each tick.
    UpdatePlayerList { player_list: Vec<PlayerState> },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(json: &str) -> ClientMessage {
        serde_json::from_str(json).unwrap()
    }

    fn state(value: Value) -> PlayerState {
        serde_json::from_value(value).unwrap()
    }

    // =====================================================================
    // RoomCode
    // =====================================================================

    #[test]
    fn test_room_code_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&RoomCode::new(4821)).unwrap(), "4821");
        assert_eq!(RoomCode::new(4821).to_string(), "4821");
    }

    #[test]
    fn test_room_code_from_json_accepts_number_and_string() {
        assert_eq!(RoomCode::from_json(&json!(1234)), Some(RoomCode::new(1234)));
        assert_eq!(RoomCode::from_json(&json!(" 1234 ")), Some(RoomCode::new(1234)));
    }

    #[test]
    fn test_room_code_from_json_rejects_unusable_values() {
        assert_eq!(RoomCode::from_json(&json!(-1)), None);
        assert_eq!(RoomCode::from_json(&json!(12.5)), None);
        assert_eq!(RoomCode::from_json(&json!(u64::MAX)), None);
        assert_eq!(RoomCode::from_json(&json!("abcd")), None);
        assert_eq!(RoomCode::from_json(&json!(null)), None);
        assert_eq!(RoomCode::from_json(&json!({"code": 1})), None);
    }

    #[test]
    fn test_room_code_from_str_error_is_invalid_message() {
        let err = "12a".parse::<RoomCode>().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    // =====================================================================
    // PlayerState
    // =====================================================================

    #[test]
    fn test_player_state_merge_last_write_wins_per_field() {
        let mut s = state(json!({"x": 1, "name": "ada"}));
        s.merge(state(json!({"x": 5})));
        s.merge(state(json!({"y": 10})));
        assert_eq!(s, state(json!({"x": 5, "y": 10, "name": "ada"})));
    }

    #[test]
    fn test_player_state_merge_same_field_twice_keeps_second() {
        let mut s = PlayerState::new();
        s.merge(state(json!({"x": 1})));
        s.merge(state(json!({"x": 2})));
        assert_eq!(s.get("x"), Some(&json!(2)));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_player_state_merge_replaces_nested_values_wholesale() {
        let mut s = state(json!({"pos": {"x": 1, "y": 2}}));
        s.merge(state(json!({"pos": {"x": 3}})));
        assert_eq!(s.get("pos"), Some(&json!({"x": 3})));
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_client_create_room_decodes_player() {
        let msg = decode(r#"{"type":"CREATE_ROOM","player":{"name":"ada"}}"#);
        assert_eq!(
            msg,
            ClientMessage::CreateRoom {
                player: state(json!({"name": "ada"}))
            }
        );
    }

    #[test]
    fn test_client_missing_or_null_player_is_empty() {
        let missing = decode(r#"{"type":"CREATE_ROOM"}"#);
        let null = decode(r#"{"type":"UPDATE_PLAYER","player":null}"#);
        assert_eq!(
            missing,
            ClientMessage::CreateRoom {
                player: PlayerState::new()
            }
        );
        assert_eq!(
            null,
            ClientMessage::UpdatePlayer {
                player: PlayerState::new()
            }
        );
    }

    #[test]
    fn test_client_join_room_accepts_numeric_and_string_room_id() {
        let numeric = decode(r#"{"type":"JOIN_ROOM","roomId":4821}"#);
        let string = decode(r#"{"type":"JOIN_ROOM","roomId":"4821"}"#);
        let expected = ClientMessage::JoinRoom {
            room_id: Some(RoomCode::new(4821)),
            player: PlayerState::new(),
        };
        assert_eq!(numeric, expected);
        assert_eq!(string, expected);
    }

    #[test]
    fn test_client_join_room_bad_room_id_decodes_as_none() {
        for raw in [
            r#"{"type":"JOIN_ROOM"}"#,
            r#"{"type":"JOIN_ROOM","roomId":"lobby"}"#,
            r#"{"type":"JOIN_ROOM","roomId":null}"#,
            r#"{"type":"JOIN_ROOM","roomId":-3}"#,
        ] {
            match decode(raw) {
                ClientMessage::JoinRoom { room_id, .. } => assert_eq!(room_id, None, "{raw}"),
                other => panic!("expected JoinRoom for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_client_update_scene_keeps_payload_opaque() {
        let msg = decode(r#"{"type":"UPDATE_SCENE","scene":[1,{"a":true}]}"#);
        assert_eq!(
            msg,
            ClientMessage::UpdateScene {
                scene: json!([1, {"a": true}])
            }
        );
    }

    #[test]
    fn test_client_reached_goal_ignores_extra_fields() {
        assert_eq!(
            decode(r#"{"type":"REACHED_GOAL","time":12}"#),
            ClientMessage::ReachedGoal
        );
    }

    #[test]
    fn test_client_unknown_type_decodes_as_unknown() {
        assert_eq!(
            decode(r#"{"type":"ADD_PLAYER","player":{}}"#),
            ClientMessage::Unknown
        );
        assert_eq!(decode(r#"{"type":"FLY_TO_MOON"}"#), ClientMessage::Unknown);
    }

    #[test]
    fn test_client_missing_type_is_error() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"roomId":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_wrongly_shaped_player_is_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"UPDATE_PLAYER","player":[1,2]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_kind_names_match_wire_tags() {
        let msg = ClientMessage::UpdateScene { scene: Value::Null };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], msg.kind());
    }

    // =====================================================================
    // ServerMessage: one test per variant to pin the JSON shape
    // =====================================================================

    fn encode(msg: &ServerMessage) -> Value {
        serde_json::to_value(msg).unwrap()
    }

    #[test]
    fn test_server_init_json_format() {
        let msg = ServerMessage::Init {
            connection_id: ConnectionId::new(9),
        };
        assert_eq!(encode(&msg), json!({"type": "INIT", "connectionId": 9}));
    }

    #[test]
    fn test_server_room_created_and_join_success_json_format() {
        let created = ServerMessage::RoomCreated {
            room_id: RoomCode::new(1000),
        };
        let joined = ServerMessage::JoinRoomSuccess {
            room_id: RoomCode::new(1000),
        };
        assert_eq!(encode(&created), json!({"type": "ROOM_CREATED", "roomId": 1000}));
        assert_eq!(
            encode(&joined),
            json!({"type": "JOIN_ROOM_SUCCESS", "roomId": 1000})
        );
    }

    #[test]
    fn test_server_error_json_format() {
        let msg = ServerMessage::error(ErrorCode::RoomNotFound, "room 4242 not found");
        assert_eq!(
            encode(&msg),
            json!({"type": "ERROR", "code": "ROOM_NOT_FOUND", "message": "room 4242 not found"})
        );
    }

    #[test]
    fn test_server_player_removed_json_format() {
        let msg = ServerMessage::PlayerRemoved {
            connection_id: ConnectionId::new(3),
        };
        assert_eq!(
            encode(&msg),
            json!({"type": "PLAYER_REMOVED", "connectionId": 3})
        );
    }

    #[test]
    fn test_server_scene_and_goal_json_format() {
        let scene = ServerMessage::SceneUpdated {
            scene: json!({"level": 2}),
        };
        assert_eq!(
            encode(&scene),
            json!({"type": "SCENE_UPDATED", "scene": {"level": 2}})
        );
        assert_eq!(
            encode(&ServerMessage::ReachedGoal),
            json!({"type": "REACHED_GOAL"})
        );
    }

    #[test]
    fn test_server_update_player_list_json_format() {
        let msg = ServerMessage::UpdatePlayerList {
            player_list: vec![state(json!({"x": 1})), state(json!({"x": 2}))],
        };
        assert_eq!(
            encode(&msg),
            json!({"type": "UPDATE_PLAYER_LIST", "playerList": [{"x": 1}, {"x": 2}]})
        );
    }

    #[test]
    fn test_error_code_serializes_as_wire_name() {
        assert_eq!(
            serde_json::to_value(ErrorCode::AllocationExhausted).unwrap(),
            json!("ALLOCATION_EXHAUSTED")
        );
        for code in ErrorCode::ALL {
            assert_eq!(serde_json::to_value(code).unwrap(), json!(code.to_string()));
            let back: ErrorCode = serde_json::from_value(json!(code.as_str())).unwrap();
            assert_eq!(back, code);
        }
    }

    #[test]
    fn test_error_code_rejects_unknown_name() {
        let err = serde_json::from_value::<ErrorCode>(json!("ROOM_ON_FIRE")).unwrap_err();
        assert!(err.to_string().contains("ROOM_ON_FIRE"));
    }
}
