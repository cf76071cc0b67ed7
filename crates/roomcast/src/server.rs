//! `RoomcastServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: transport → handler → relay actor.

use std::net::SocketAddr;

use roomcast_protocol::JsonCodec;
use roomcast_room::RoomCodeConfig;
use roomcast_transport::{Transport, WebSocketTransport};

use crate::RoomcastError;
use crate::actor::{RelayHandle, spawn_relay};
use crate::config::RelayConfig;
use crate::handler::handle_connection;

/// Address used when [`RoomcastServerBuilder::bind`] is never called.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use roomcast::RoomcastServer;
///
/// # async fn run() -> Result<(), roomcast::RoomcastError> {
/// let server = RoomcastServer::builder()
///     .bind("0.0.0.0:443")
///     .tick_rate_hz(60)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RoomcastServerBuilder {
    bind_addr: String,
    config: RelayConfig,
}

impl RoomcastServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            config: RelayConfig::default(),
        }
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Player-list broadcasts per second. `0` means the default.
    pub fn tick_rate_hz(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_queue_capacity = capacity;
        self
    }

    pub fn command_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.command_queue_capacity = capacity;
        self
    }

    /// Sets the room-code range and what happens when it runs out.
    pub fn room_codes(mut self, room_codes: RoomCodeConfig) -> Self {
        self.config.room_codes = room_codes.validated();
        self
    }

    /// Replaces the whole relay configuration at once.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and starts the relay actor.
    ///
    /// # Errors
    /// Returns [`RoomcastError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<RoomcastServer, RoomcastError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let relay = spawn_relay(&self.config);
        Ok(RoomcastServer { transport, relay })
    }
}

impl Default for RoomcastServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RoomcastServer {
    transport: WebSocketTransport,
    relay: RelayHandle,
}

impl RoomcastServer {
    pub fn builder() -> RoomcastServerBuilder {
        RoomcastServerBuilder::new()
    }

    /// The address the listener is bound to. Useful after binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to this server's relay actor.
    pub fn relay(&self) -> RelayHandle {
        self.relay.clone()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// A failed accept (including a failed WebSocket upgrade) is logged and
    /// only affects that one connection.
    pub async fn run(mut self) -> Result<(), RoomcastError> {
        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, "roomcast server running"),
            Err(_) => tracing::info!("roomcast server running"),
        }

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let relay = self.relay.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, relay, JsonCodec).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
