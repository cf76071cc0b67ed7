//! Relay actor: the one Tokio task that owns the [`Relay`].
//!
//! Connection handlers never touch the registries. They hold a
//! [`RelayHandle`] and push [`RelayCommand`]s through a bounded channel;
//! the actor applies them one at a time, interleaved with broadcast ticks.

use roomcast_protocol::{ClientMessage, ConnectionId};
use roomcast_session::Outbound;
use roomcast_tick::TickScheduler;
use tokio::sync::mpsc;

use crate::RoomcastError;
use crate::config::RelayConfig;
use crate::relay::Relay;

/// Work for the relay actor.
#[derive(Debug)]
pub(crate) enum RelayCommand {
    /// A connection finished its WebSocket handshake.
    Connect {
        conn_id: ConnectionId,
        sender: mpsc::Sender<Outbound>,
    },

    /// A decoded client message.
    Inbound {
        conn_id: ConnectionId,
        message: ClientMessage,
    },

    /// The connection's reader ended.
    Disconnect { conn_id: ConnectionId },
}

/// Cheap, cloneable way in to the relay actor.
///
/// Every method fails with [`RoomcastError::RelayUnavailable`] once the
/// actor is gone.
#[derive(Clone)]
pub struct RelayHandle {
    commands: mpsc::Sender<RelayCommand>,
    outbound_capacity: usize,
}

impl RelayHandle {
    /// Registers `conn_id` and returns the queue its writer drains.
    ///
    /// The first message on the queue is always `INIT`.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
    ) -> Result<mpsc::Receiver<Outbound>, RoomcastError> {
        let (sender, receiver) = mpsc::channel(self.outbound_capacity);
        self.send(RelayCommand::Connect { conn_id, sender }).await?;
        Ok(receiver)
    }

    /// Hands a client message to the router.
    pub async fn inbound(
        &self,
        conn_id: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), RoomcastError> {
        self.send(RelayCommand::Inbound { conn_id, message }).await
    }

    /// Tears down `conn_id`. Unknown ids are ignored by the actor.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), RoomcastError> {
        self.send(RelayCommand::Disconnect { conn_id }).await
    }

    async fn send(&self, command: RelayCommand) -> Result<(), RoomcastError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RoomcastError::RelayUnavailable)
    }
}

/// Starts a relay actor with fresh registries.
///
/// The actor stops once every [`RelayHandle`] has been dropped.
pub fn spawn_relay(config: &RelayConfig) -> RelayHandle {
    spawn_with(Relay::new(config.room_codes), config)
}

/// Starts a relay actor around an existing [`Relay`].
pub(crate) fn spawn_with(relay: Relay, config: &RelayConfig) -> RelayHandle {
    let (commands, receiver) = mpsc::channel(config.command_queue_capacity.max(1));
    let actor = RelayActor {
        relay,
        ticks: TickScheduler::new(config.tick_config()),
        commands: receiver,
    };
    tokio::spawn(actor.run());

    RelayHandle {
        commands,
        outbound_capacity: config.outbound_queue_capacity.max(1),
    }
}

struct RelayActor {
    relay: Relay,
    ticks: TickScheduler,
    commands: mpsc::Receiver<RelayCommand>,
}

impl RelayActor {
    async fn run(mut self) {
        tracing::info!(tick_rate_hz = self.ticks.tick_rate_hz(), "relay actor started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
                _ = self.ticks.wait_for_tick() => {
                    self.relay.broadcast_player_lists();
                    self.ticks.record_tick_end();
                }
            }
            self.relay.reap_stale();
        }

        tracing::info!(
            ticks = self.ticks.tick_count(),
            connections = self.relay.connections().len(),
            "relay actor stopped"
        );
    }

    fn apply(&mut self, command: RelayCommand) {
        match command {
            RelayCommand::Connect { conn_id, sender } => self.relay.connect(conn_id, sender),
            RelayCommand::Inbound { conn_id, message } => {
                let kind = message.kind();
                let outcome = self.relay.handle(conn_id, message);
                tracing::trace!(%conn_id, kind, ?outcome, "message handled");
            }
            RelayCommand::Disconnect { conn_id } => self.relay.disconnect(conn_id),
        }
    }
}
