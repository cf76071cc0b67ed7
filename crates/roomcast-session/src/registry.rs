//! The connection registry: who is connected and how to reach them.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is a plain `HashMap` with no locking. It is owned
//! by the relay actor, which is the only task that ever touches it.

use std::collections::HashMap;
use std::sync::Arc;

use roomcast_protocol::{ConnectionId, ServerMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::SessionError;

/// A message queued for one connection.
///
/// Shared behind an `Arc` so a room-wide broadcast allocates the message
/// once and every member's queue holds a pointer to it.
pub type Outbound = Arc<ServerMessage>;

/// Send handle for a connection's bounded outbound queue.
pub type ConnectionSender = mpsc::Sender<Outbound>;

/// Result of a fire-and-forget send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the connection's writer.
    Delivered,
    /// The queue was full; this message was discarded for this connection.
    Dropped,
    /// The writer has gone away. The connection should be cleaned up.
    Closed,
    /// No connection with that id is registered.
    Unknown,
}

/// Maps connection ids to their outbound queues.
///
/// ## Lifecycle
///
/// ```text
/// transport accept ──→ register() ──→ send()* ──→ unregister()
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the send handle for `id`.
    ///
    /// Registering an id twice replaces the old handle. Ids come from a
    /// process-wide counter, so this only happens on a bug upstream.
    pub fn register(&mut self, id: ConnectionId, sender: ConnectionSender) {
        if self.connections.insert(id, sender).is_some() {
            tracing::warn!(conn_id = %id, "connection re-registered, replacing handle");
        } else {
            tracing::debug!(conn_id = %id, total = self.connections.len(), "connection registered");
        }
    }

    pub fn lookup(&self, id: ConnectionId) -> Option<&ConnectionSender> {
        self.connections.get(&id)
    }

    /// Forgets `id`, returning its handle.
    ///
    /// Dropping the returned handle lets the writer task drain and exit
    /// once every other clone is gone.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if `id` was never registered or
    /// has already been removed.
    pub fn unregister(&mut self, id: ConnectionId) -> Result<ConnectionSender, SessionError> {
        let sender = self
            .connections
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        tracing::debug!(conn_id = %id, total = self.connections.len(), "connection unregistered");
        Ok(sender)
    }

    /// Queues `message` for `id` without waiting.
    ///
    /// A slow client only ever loses its own messages; the caller keeps
    /// going regardless of the outcome.
    pub fn send(&self, id: ConnectionId, message: Outbound) -> Delivery {
        let Some(sender) = self.connections.get(&id) else {
            return Delivery::Unknown;
        };
        match sender.try_send(message) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(conn_id = %id, "outbound queue full, dropping message");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Ids of every registered connection, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
