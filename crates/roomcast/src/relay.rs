//! The relay core: all three registries behind one owner.
//!
//! [`Relay`] is plain synchronous state. The actor in [`crate::actor`] owns
//! exactly one and feeds it connects, messages, disconnects and ticks one at
//! a time, which is what keeps the connection registry, the rooms and the
//! membership index in step with each other.

use std::sync::Arc;

use rand::rngs::StdRng;
use roomcast_protocol::{ClientMessage, ConnectionId, RoomCode, ServerMessage};
use roomcast_room::{Departure, RoomCodeConfig, RoomRegistry};
use roomcast_session::{ConnectionRegistry, ConnectionSender, Delivery, Outbound};

use crate::router::{self, Outcome};

/// Connection registry, room registry and membership index.
pub struct Relay {
    pub(crate) connections: ConnectionRegistry,
    pub(crate) rooms: RoomRegistry,
    /// Connections whose writer went away mid fan-out. Cleaned up by
    /// [`Relay::reap_stale`] once the current operation is done.
    stale: Vec<ConnectionId>,
}

impl Relay {
    pub fn new(room_codes: RoomCodeConfig) -> Self {
        Self::from_rooms(RoomRegistry::new(room_codes))
    }

    /// A relay whose room codes come from a seeded generator.
    pub fn with_rng(room_codes: RoomCodeConfig, rng: StdRng) -> Self {
        Self::from_rooms(RoomRegistry::with_rng(room_codes, rng))
    }

    fn from_rooms(rooms: RoomRegistry) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            rooms,
            stale: Vec::new(),
        }
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Registers a new connection and greets it with `INIT`.
    ///
    /// The queue is fresh, so `INIT` is always the first thing the client
    /// receives.
    pub fn connect(&mut self, conn_id: ConnectionId, sender: ConnectionSender) {
        self.connections.register(conn_id, sender);
        self.send_to(
            conn_id,
            Arc::new(ServerMessage::Init {
                connection_id: conn_id,
            }),
        );
        tracing::info!(%conn_id, connections = self.connections.len(), "connection opened");
    }

    /// Routes one inbound message. See [`router::dispatch`].
    pub fn handle(&mut self, sender: ConnectionId, message: ClientMessage) -> Outcome {
        router::dispatch(self, sender, message)
    }

    /// Tears a connection down.
    ///
    /// The rest of its room hears `PLAYER_REMOVED` first. Then the
    /// connection leaves the room (and the index), and finally the
    /// connection registry. Unknown ids are a no-op.
    pub fn disconnect(&mut self, conn_id: ConnectionId) {
        if let Some(room) = self.rooms.room_of(conn_id) {
            let others: Vec<_> = self
                .rooms
                .members_of(room)
                .unwrap_or_default()
                .into_iter()
                .filter(|&member| member != conn_id)
                .collect();
            self.broadcast(
                &others,
                ServerMessage::PlayerRemoved {
                    connection_id: conn_id,
                },
            );
        }

        self.rooms.remove_member(conn_id);
        if self.connections.unregister(conn_id).is_ok() {
            tracing::info!(%conn_id, connections = self.connections.len(), "connection closed");
        }
    }

    /// Sends every room its current player list.
    ///
    /// The list is built once per room and shared by all of its members.
    /// Runs to completion without yielding, so each room's snapshot is
    /// taken from a single consistent state.
    pub fn broadcast_player_lists(&mut self) {
        for room in self.rooms.rooms() {
            let list = Arc::new(ServerMessage::UpdatePlayerList {
                player_list: room.player_list(),
            });
            for member in room.members() {
                deliver(&self.connections, &mut self.stale, member, Arc::clone(&list));
            }
        }
    }

    /// Disconnects every connection found closed during fan-out.
    ///
    /// Loops because disconnecting one connection notifies its room, which
    /// may reveal more closed connections.
    pub fn reap_stale(&mut self) {
        while let Some(conn_id) = self.stale.pop() {
            if self.connections.contains(conn_id) {
                tracing::debug!(%conn_id, "outbound queue closed, cleaning up");
                self.disconnect(conn_id);
            }
        }
    }

    pub(crate) fn send_to(&mut self, conn_id: ConnectionId, message: Outbound) {
        deliver(&self.connections, &mut self.stale, conn_id, message);
    }

    pub(crate) fn reply(&mut self, conn_id: ConnectionId, message: ServerMessage) {
        self.send_to(conn_id, Arc::new(message));
    }

    /// Sends one shared copy of `message` to each of `members`.
    pub(crate) fn broadcast(&mut self, members: &[ConnectionId], message: ServerMessage) {
        let message = Arc::new(message);
        for &member in members {
            self.send_to(member, Arc::clone(&message));
        }
    }

    /// Tells whoever is left in a room that `conn_id` moved out of it.
    pub(crate) fn announce_departure(&mut self, conn_id: ConnectionId, departure: Option<Departure>) {
        if let Some(departure) = departure {
            self.broadcast(
                &departure.remaining,
                ServerMessage::PlayerRemoved {
                    connection_id: conn_id,
                },
            );
        }
    }

    /// Members of `room`, or an empty list if it is gone.
    pub(crate) fn members(&self, room: RoomCode) -> Vec<ConnectionId> {
        self.rooms.members_of(room).unwrap_or_default()
    }
}

fn deliver(
    connections: &ConnectionRegistry,
    stale: &mut Vec<ConnectionId>,
    conn_id: ConnectionId,
    message: Outbound,
) {
    match connections.send(conn_id, message) {
        Delivery::Delivered | Delivery::Dropped => {}
        Delivery::Closed => stale.push(conn_id),
        Delivery::Unknown => {
            tracing::debug!(%conn_id, "send to unregistered connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use roomcast_protocol::PlayerState;
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn relay() -> Relay {
        Relay::with_rng(RoomCodeConfig::default(), StdRng::seed_from_u64(3))
    }

    fn connect(relay: &mut Relay, id: u64) -> mpsc::Receiver<Outbound> {
        let (tx, mut rx) = mpsc::channel(16);
        relay.connect(cid(id), tx);
        // Swallow INIT.
        assert!(matches!(*rx.try_recv().unwrap(), ServerMessage::Init { .. }));
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push((*msg).clone());
        }
        out
    }

    fn state(value: serde_json::Value) -> PlayerState {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_connect_sends_init_first() {
        let mut relay = relay();
        let (tx, mut rx) = mpsc::channel(4);

        relay.connect(cid(7), tx);

        assert_eq!(
            *rx.try_recv().unwrap(),
            ServerMessage::Init {
                connection_id: cid(7)
            }
        );
        assert!(relay.connections().contains(cid(7)));
    }

    #[test]
    fn test_broadcast_player_lists_sends_room_snapshot_to_each_member() {
        let mut relay = relay();
        let mut a = connect(&mut relay, 1);
        let mut b = connect(&mut relay, 2);
        let mut lonely = connect(&mut relay, 3);
        let room = relay.rooms.create_room(cid(1), state(json!({"n": "a"}))).unwrap().room;
        relay.rooms.join_room(cid(2), room, state(json!({"n": "b"}))).unwrap();

        relay.broadcast_player_lists();

        let expected = ServerMessage::UpdatePlayerList {
            player_list: vec![state(json!({"n": "a"})), state(json!({"n": "b"}))],
        };
        assert_eq!(drain(&mut a), vec![expected.clone()]);
        assert_eq!(drain(&mut b), vec![expected]);
        assert!(drain(&mut lonely).is_empty());
    }

    #[test]
    fn test_broadcast_player_lists_shares_one_allocation_per_room() {
        let mut relay = relay();
        let mut a = connect(&mut relay, 1);
        let mut b = connect(&mut relay, 2);
        let room = relay.rooms.create_room(cid(1), PlayerState::new()).unwrap().room;
        relay.rooms.join_room(cid(2), room, PlayerState::new()).unwrap();

        relay.broadcast_player_lists();

        let from_a = a.try_recv().unwrap();
        let from_b = b.try_recv().unwrap();
        assert!(Arc::ptr_eq(&from_a, &from_b));
    }

    #[test]
    fn test_disconnect_notifies_others_and_clears_every_registry() {
        let mut relay = relay();
        let mut a = connect(&mut relay, 1);
        let mut b = connect(&mut relay, 2);
        let room = relay.rooms.create_room(cid(1), PlayerState::new()).unwrap().room;
        relay.rooms.join_room(cid(2), room, PlayerState::new()).unwrap();

        relay.disconnect(cid(1));

        assert_eq!(
            drain(&mut b),
            vec![ServerMessage::PlayerRemoved {
                connection_id: cid(1)
            }]
        );
        // The departing connection is not told it left.
        assert!(drain(&mut a).is_empty());
        assert_eq!(relay.rooms.members_of(room), Some(vec![cid(2)]));
        assert_eq!(relay.rooms.room_of(cid(1)), None);
        assert!(!relay.connections.contains(cid(1)));
    }

    #[test]
    fn test_disconnect_unknown_is_noop() {
        let mut relay = relay();
        relay.disconnect(cid(99));
        assert!(relay.connections().is_empty());
    }

    #[test]
    fn test_closed_queue_is_reaped_after_fan_out() {
        let mut relay = relay();
        let mut a = connect(&mut relay, 1);
        let b = connect(&mut relay, 2);
        let room = relay.rooms.create_room(cid(1), PlayerState::new()).unwrap().room;
        relay.rooms.join_room(cid(2), room, PlayerState::new()).unwrap();
        drop(b);

        relay.broadcast_player_lists();
        // A still got its snapshot even though B's queue was closed.
        assert_eq!(drain(&mut a).len(), 1);
        assert!(relay.connections.contains(cid(2)));

        relay.reap_stale();

        assert!(!relay.connections.contains(cid(2)));
        assert_eq!(relay.rooms.members_of(room), Some(vec![cid(1)]));
        assert_eq!(
            drain(&mut a),
            vec![ServerMessage::PlayerRemoved {
                connection_id: cid(2)
            }]
        );
    }

    #[test]
    fn test_reap_stale_cascades_through_room() {
        let mut relay = relay();
        let a = connect(&mut relay, 1);
        let b = connect(&mut relay, 2);
        let room = relay.rooms.create_room(cid(1), PlayerState::new()).unwrap().room;
        relay.rooms.join_room(cid(2), room, PlayerState::new()).unwrap();
        drop(a);
        drop(b);

        relay.broadcast_player_lists();
        relay.reap_stale();

        assert!(relay.connections().is_empty());
        assert_eq!(relay.rooms().room_count(), 0);
    }
}
