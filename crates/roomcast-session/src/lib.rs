//! Connection tracking for Roomcast.
//!
//! The [`ConnectionRegistry`] maps each live [`ConnectionId`] to the
//! sending half of that connection's outbound queue. It is the only place
//! the relay goes to address an individual client.
//!
//! # How it fits in the stack
//!
//! ```text
//! Relay actor (above)  ← owns the registry, fans messages out through it
//!     ↕
//! Session layer (this crate)  ← connection id → outbound queue
//!     ↕
//! Connection writer tasks (below)  ← drain the queue onto the socket
//! ```

mod error;
mod registry;

pub use error::SessionError;
pub use registry::{ConnectionRegistry, ConnectionSender, Delivery, Outbound};

pub use roomcast_protocol::ConnectionId;
