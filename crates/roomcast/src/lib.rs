//! # Roomcast
//!
//! Real-time room relay for browser games.
//!
//! Clients connect over WebSocket, create or join a room by its numeric
//! code, and push partial player state. Every tick the relay sends each
//! room the full list of its players' states. Scene changes and goal
//! events are relayed to the room as they arrive.
//!
//! All registries live in one [`Relay`] owned by a single actor task, so
//! no two operations ever interleave. Connection handlers only talk to it
//! through a [`RelayHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomcast::prelude::*;
//!
//! # async fn run() -> Result<(), RoomcastError> {
//! let server = RoomcastServer::builder()
//!     .bind("0.0.0.0:443")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod actor;
mod config;
mod error;
mod handler;
mod relay;
mod router;
mod server;

pub use actor::{RelayHandle, spawn_relay};
pub use config::{DEFAULT_COMMAND_QUEUE, DEFAULT_OUTBOUND_QUEUE, RelayConfig};
pub use error::RoomcastError;
pub use relay::Relay;
pub use router::Outcome;
pub use server::{DEFAULT_BIND_ADDR, RoomcastServer, RoomcastServerBuilder};

/// Everything needed to run a relay and speak its protocol.
pub mod prelude {
    pub use crate::{RelayConfig, RoomcastError, RoomcastServer, RoomcastServerBuilder};
    pub use roomcast_protocol::{
        ClientMessage, Codec, ConnectionId, ErrorCode, JsonCodec, PlayerState, RoomCode,
        ServerMessage,
    };
    pub use roomcast_room::{OverflowPolicy, RoomCodeConfig};
}
