//! Room bookkeeping for Roomcast.
//!
//! A room is a short-lived group of connections identified by a numeric
//! code. The [`RoomRegistry`] owns every live room together with the
//! reverse index from connection to room, and allocates room codes.
//!
//! This crate is synchronous and owns no tasks. The relay actor holds the
//! registry and is the only thing that calls into it.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: rooms, membership index, code allocation
//! - [`Room`]: read-only view of one room's members and their state
//! - [`Departure`] / [`Placement`]: what a membership change did
//! - [`RoomCodeConfig`] / [`OverflowPolicy`]: code range and exhaustion policy

mod codes;
mod config;
mod error;
mod registry;

pub use config::{DEFAULT_MAX_CODE, DEFAULT_MIN_CODE, OverflowPolicy, RoomCodeConfig};
pub use error::RoomError;
pub use registry::{Departure, Placement, Room, RoomRegistry};
