//! The room registry and its membership index.
//!
//! Rooms and the connection → room index live in the same struct and are
//! only ever changed together inside one `&mut self` call, so a caller can
//! never observe them disagreeing.

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use roomcast_protocol::{ConnectionId, PlayerState, RoomCode};

use crate::codes::CodeAllocator;
use crate::{RoomCodeConfig, RoomError};

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A live room: its members and their latest player state.
///
/// Members are ordered by connection id so that two snapshots of an
/// unchanged room are identical.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    code: RoomCode,
    members: BTreeMap<ConnectionId, PlayerState>,
}

impl Room {
    pub fn code(&self) -> RoomCode {
        self.code
    }

    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.keys().copied()
    }

    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.members.contains_key(&conn_id)
    }

    /// Every member's state, in member order.
    pub fn player_list(&self) -> Vec<PlayerState> {
        self.members.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a room obtained from the registry.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A connection leaving a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: RoomCode,
    /// Members still in the room, in id order. Empty when `destroyed`.
    pub remaining: Vec<ConnectionId>,
    /// The room had no members left and is gone.
    pub destroyed: bool,
}

/// Where a connection ended up after creating or joining a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub room: RoomCode,
    /// The room the connection was in before, if it had to leave one.
    pub left: Option<Departure>,
}

// ---------------------------------------------------------------------------
// RoomRegistry
// ---------------------------------------------------------------------------

/// Owns every live room and the index from connection to room.
///
/// ## Invariants
///
/// - `index[c] == r` iff `c` is a member of room `r`.
/// - A connection is in at most one room.
/// - No room is empty; the last member leaving destroys it.
/// - Live room codes are unique.
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    index: HashMap<ConnectionId, RoomCode>,
    codes: CodeAllocator,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomCodeConfig::default())
    }
}

impl RoomRegistry {
    /// Creates an empty registry seeded from the OS random source.
    pub fn new(config: RoomCodeConfig) -> Self {
        Self::from_allocator(CodeAllocator::from_os_rng(config))
    }

    /// Creates an empty registry that draws room codes from `rng`.
    ///
    /// With a seeded `StdRng` the sequence of codes is reproducible.
    pub fn with_rng(config: RoomCodeConfig, rng: StdRng) -> Self {
        Self::from_allocator(CodeAllocator::new(config, rng))
    }

    fn from_allocator(codes: CodeAllocator) -> Self {
        Self {
            rooms: HashMap::new(),
            index: HashMap::new(),
            codes,
        }
    }

    pub fn code_config(&self) -> &RoomCodeConfig {
        self.codes.config()
    }

    /// Creates a room with `creator` as its only member.
    ///
    /// A creator already in another room leaves it first; the returned
    /// [`Placement`] says which room that was. If the creator is alone in
    /// a room with a primary code, that room is destroyed before the new
    /// code is picked, so its code counts as free. It is only handed back
    /// when no other primary code is.
    ///
    /// # Errors
    /// [`RoomError::AllocationExhausted`] if no code is available. The
    /// creator's current membership is untouched in that case.
    pub fn create_room(
        &mut self,
        creator: ConnectionId,
        initial: PlayerState,
    ) -> Result<Placement, RoomError> {
        let (code, left) = match self.vacated_primary(creator) {
            Some(old) => {
                // Releasing a primary code leaves room for the allocation.
                let left = self.remove_member(creator);
                let code = self
                    .codes
                    .allocate_avoiding(old, |c| self.rooms.contains_key(&c))?;
                (code, left)
            }
            None => {
                let code = self.codes.allocate(|c| self.rooms.contains_key(&c))?;
                (code, self.remove_member(creator))
            }
        };

        let mut members = BTreeMap::new();
        members.insert(creator, initial);
        self.rooms.insert(code, Room { code, members });
        self.index.insert(creator, code);

        tracing::info!(room = %code, conn_id = %creator, rooms = self.rooms.len(), "room created");
        Ok(Placement { room: code, left })
    }

    /// Adds `conn_id` to the room `code` with `initial` as its state.
    ///
    /// Joining the room the connection is already in replaces its state.
    /// Joining a different room moves it.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`] if `code` is not live. Nothing changes,
    /// including the connection's current membership.
    pub fn join_room(
        &mut self,
        conn_id: ConnectionId,
        code: RoomCode,
        initial: PlayerState,
    ) -> Result<Placement, RoomError> {
        if !self.rooms.contains_key(&code) {
            return Err(RoomError::RoomNotFound(code));
        }

        let left = match self.index.get(&conn_id).copied() {
            Some(current) if current == code => None,
            Some(_) => self.remove_member(conn_id),
            None => None,
        };

        // Still live: a departure can only destroy the *other* room.
        let Some(room) = self.rooms.get_mut(&code) else {
            return Err(RoomError::RoomNotFound(code));
        };
        let rejoin = room.members.insert(conn_id, initial).is_some();
        self.index.insert(conn_id, code);

        if rejoin {
            tracing::debug!(room = %code, %conn_id, "member re-joined, state replaced");
        } else {
            tracing::info!(room = %code, %conn_id, players = room.len(), "member joined");
        }
        Ok(Placement { room: code, left })
    }

    /// Merges `partial` into the state of `conn_id`.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if the connection is in no room.
    pub fn update_player(
        &mut self,
        conn_id: ConnectionId,
        partial: PlayerState,
    ) -> Result<RoomCode, RoomError> {
        let code = *self
            .index
            .get(&conn_id)
            .ok_or(RoomError::NotInRoom(conn_id))?;

        let state = self
            .rooms
            .get_mut(&code)
            .and_then(|room| room.members.get_mut(&conn_id));
        let Some(state) = state else {
            debug_assert!(false, "index maps {conn_id} to {code} but it is not a member");
            tracing::error!(%conn_id, room = %code, "membership index diverged from room");
            return Err(RoomError::NotInRoom(conn_id));
        };

        state.merge(partial);
        Ok(code)
    }

    /// Takes `conn_id` out of its room, destroying the room if it is left
    /// empty. Returns `None` if the connection was in no room.
    pub fn remove_member(&mut self, conn_id: ConnectionId) -> Option<Departure> {
        let code = self.index.remove(&conn_id)?;
        let Some(room) = self.rooms.get_mut(&code) else {
            debug_assert!(false, "index maps {conn_id} to missing room {code}");
            tracing::error!(%conn_id, room = %code, "membership index points at a dead room");
            return None;
        };

        room.members.remove(&conn_id);
        tracing::info!(room = %code, %conn_id, players = room.len(), "member left");

        if !room.is_empty() {
            return Some(Departure {
                room: code,
                remaining: room.members().collect(),
                destroyed: false,
            });
        }

        self.rooms.remove(&code);
        self.codes.release(code);
        tracing::info!(room = %code, rooms = self.rooms.len(), "room destroyed");
        Some(Departure {
            room: code,
            remaining: Vec::new(),
            destroyed: true,
        })
    }

    /// The primary-range room `conn_id` would empty by leaving, if any.
    fn vacated_primary(&self, conn_id: ConnectionId) -> Option<RoomCode> {
        let code = *self.index.get(&conn_id)?;
        let room = self.rooms.get(&code)?;
        (room.len() == 1 && self.codes.config().in_primary(code.get())).then_some(code)
    }

    /// Members of `code`, in id order.
    pub fn members_of(&self, code: RoomCode) -> Option<Vec<ConnectionId>> {
        self.rooms.get(&code).map(|room| room.members().collect())
    }

    /// Read-only view of every member's state in `code`.
    pub fn state_of(&self, code: RoomCode) -> Option<&BTreeMap<ConnectionId, PlayerState>> {
        self.rooms.get(&code).map(|room| &room.members)
    }

    pub fn player_list(&self, code: RoomCode) -> Option<Vec<PlayerState>> {
        self.rooms.get(&code).map(Room::player_list)
    }

    pub fn player_state(&self, conn_id: ConnectionId) -> Option<&PlayerState> {
        let code = self.index.get(&conn_id)?;
        self.rooms.get(code)?.members.get(&conn_id)
    }

    pub fn room_of(&self, conn_id: ConnectionId) -> Option<RoomCode> {
        self.index.get(&conn_id).copied()
    }

    pub fn room(&self, code: RoomCode) -> Option<&Room> {
        self.rooms.get(&code)
    }

    pub fn contains_room(&self, code: RoomCode) -> bool {
        self.rooms.contains_key(&code)
    }

    /// Live rooms, in no particular order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Connections currently in some room.
    pub fn member_count(&self) -> usize {
        self.index.len()
    }
}
