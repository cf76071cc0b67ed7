//! Message router: one handler per client message type.
//!
//! | Type            | Needs a room | Effect                                   |
//! |-----------------|--------------|------------------------------------------|
//! | `CREATE_ROOM`   | no           | new room, reply `ROOM_CREATED`           |
//! | `JOIN_ROOM`     | no           | join, reply `JOIN_ROOM_SUCCESS`          |
//! | `UPDATE_PLAYER` | yes          | merge state (sent out on the next tick)  |
//! | `UPDATE_SCENE`  | yes          | `SCENE_UPDATED` to the whole room        |
//! | `REACHED_GOAL`  | yes          | `REACHED_GOAL` to the whole room         |
//!
//! A failed handler answers the sender with `ERROR` and touches nobody
//! else. `REACHED_GOAL` outside a room and unknown types are dropped.

use roomcast_protocol::{
    ClientMessage, ConnectionId, ErrorCode, PlayerState, RoomCode, ServerMessage,
};
use roomcast_room::RoomError;
use serde_json::Value;

use crate::relay::Relay;

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The message took effect.
    Applied,
    /// The sender was sent an `ERROR` with this code.
    Rejected(ErrorCode),
    /// Nothing happened and nobody was told.
    Ignored,
}

/// Why a handler refused a message.
struct Rejection {
    code: ErrorCode,
    message: String,
}

impl From<RoomError> for Rejection {
    fn from(err: RoomError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

type HandlerResult = Result<Outcome, Rejection>;

/// Dispatches `message` from `sender` to its handler.
pub(crate) fn dispatch(relay: &mut Relay, sender: ConnectionId, message: ClientMessage) -> Outcome {
    if !relay.connections.contains(sender) {
        tracing::debug!(conn_id = %sender, kind = message.kind(), "message from unregistered connection");
        return Outcome::Ignored;
    }

    let kind = message.kind();
    let result = match message {
        ClientMessage::CreateRoom { player } => create_room(relay, sender, player),
        ClientMessage::JoinRoom { room_id, player } => join_room(relay, sender, room_id, player),
        ClientMessage::UpdatePlayer { player } => update_player(relay, sender, player),
        ClientMessage::UpdateScene { scene } => update_scene(relay, sender, scene),
        ClientMessage::ReachedGoal => reached_goal(relay, sender),
        ClientMessage::Unknown => {
            tracing::debug!(conn_id = %sender, "ignoring unknown message type");
            Ok(Outcome::Ignored)
        }
    };

    match result {
        Ok(outcome) => outcome,
        Err(Rejection { code, message }) => {
            tracing::debug!(conn_id = %sender, kind, %code, %message, "message rejected");
            relay.reply(sender, ServerMessage::error(code, message));
            Outcome::Rejected(code)
        }
    }
}

fn create_room(relay: &mut Relay, sender: ConnectionId, player: PlayerState) -> HandlerResult {
    let placed = relay.rooms.create_room(sender, player)?;
    relay.announce_departure(sender, placed.left);
    relay.reply(sender, ServerMessage::RoomCreated { room_id: placed.room });
    Ok(Outcome::Applied)
}

fn join_room(
    relay: &mut Relay,
    sender: ConnectionId,
    room_id: Option<RoomCode>,
    player: PlayerState,
) -> HandlerResult {
    let room_id = room_id.ok_or_else(|| Rejection {
        code: ErrorCode::InvalidMessage,
        message: "JOIN_ROOM requires a numeric roomId".to_string(),
    })?;
    let placed = relay.rooms.join_room(sender, room_id, player)?;
    relay.announce_departure(sender, placed.left);
    relay.reply(sender, ServerMessage::JoinRoomSuccess { room_id: placed.room });
    Ok(Outcome::Applied)
}

fn update_player(relay: &mut Relay, sender: ConnectionId, player: PlayerState) -> HandlerResult {
    relay.rooms.update_player(sender, player)?;
    Ok(Outcome::Applied)
}

fn update_scene(relay: &mut Relay, sender: ConnectionId, scene: Value) -> HandlerResult {
    let room = relay
        .rooms
        .room_of(sender)
        .ok_or(RoomError::NotInRoom(sender))?;
    let members = relay.members(room);
    relay.broadcast(&members, ServerMessage::SceneUpdated { scene });
    Ok(Outcome::Applied)
}

fn reached_goal(relay: &mut Relay, sender: ConnectionId) -> HandlerResult {
    let Some(room) = relay.rooms.room_of(sender) else {
        return Ok(Outcome::Ignored);
    };
    let members = relay.members(room);
    tracing::debug!(%room, conn_id = %sender, "goal reached");
    relay.broadcast(&members, ServerMessage::ReachedGoal);
    Ok(Outcome::Applied)
}
