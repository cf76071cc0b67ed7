//! Wire protocol for Roomcast.
//!
//! - **Types**: [`ClientMessage`] and [`ServerMessage`], the JSON frames
//!   exchanged with clients, plus the [`RoomCode`] and [`PlayerState`]
//!   values they carry.
//! - **Codec**: the [`Codec`] trait and [`JsonCodec`].
//! - **Errors**: [`ProtocolError`].
//!
//! This crate knows nothing about rooms or connections beyond their ids;
//! it only turns frames into typed messages and back.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Relay
//! Relay → Protocol (ServerMessage) → Transport (bytes)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, ErrorCode, PlayerState, RoomCode, ServerMessage};

pub use roomcast_transport::ConnectionId;
