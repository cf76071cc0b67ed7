//! Relay settings.

use roomcast_room::RoomCodeConfig;
use roomcast_tick::{DEFAULT_TICK_RATE_HZ, TickConfig};

/// Default size of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

/// Default size of the channel feeding the relay actor.
pub const DEFAULT_COMMAND_QUEUE: usize = 1024;

/// Everything the relay actor needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Snapshot broadcasts per second.
    pub tick_rate_hz: u32,
    /// Messages buffered per connection before new ones are dropped.
    pub outbound_queue_capacity: usize,
    /// Commands buffered before connection readers have to wait.
    pub command_queue_capacity: usize,
    pub room_codes: RoomCodeConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE,
            room_codes: RoomCodeConfig::default(),
        }
    }
}

impl RelayConfig {
    pub(crate) fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.tick_rate_hz)
    }
}
