//! Room-code allocator.
//!
//! Primary codes are drawn at random so they are hard to guess. Random
//! draws stop after a fixed number of collisions and a linear scan takes
//! over, so allocation terminates even when the range is nearly full.
//! Once the primary range is completely live, [`OverflowPolicy`] decides.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roomcast_protocol::RoomCode;

use crate::{OverflowPolicy, RoomCodeConfig, RoomError};

/// Random draws attempted before falling back to a scan.
const RANDOM_ATTEMPTS: usize = 32;

pub(crate) struct CodeAllocator {
    config: RoomCodeConfig,
    rng: StdRng,
    /// Live codes inside the primary range.
    primary_live: u64,
    /// Next overflow code. A `u64` so that running past `u32::MAX` is
    /// observable instead of wrapping.
    next_overflow: u64,
}

impl CodeAllocator {
    pub(crate) fn new(config: RoomCodeConfig, rng: StdRng) -> Self {
        let config = config.validated();
        Self {
            config,
            rng,
            primary_live: 0,
            next_overflow: u64::from(config.max) + 1,
        }
    }

    pub(crate) fn from_os_rng(config: RoomCodeConfig) -> Self {
        Self::new(config, StdRng::from_os_rng())
    }

    pub(crate) fn config(&self) -> &RoomCodeConfig {
        &self.config
    }

    /// Picks a code for which `is_live` is false and marks it taken.
    pub(crate) fn allocate(
        &mut self,
        is_live: impl Fn(RoomCode) -> bool,
    ) -> Result<RoomCode, RoomError> {
        if self.primary_live < self.config.span() {
            if let Some(code) = self.allocate_primary(&is_live) {
                self.primary_live += 1;
                return Ok(code);
            }
            debug_assert!(false, "primary range reported free space but scan found none");
            tracing::error!(
                live = self.primary_live,
                "room code accounting out of sync with live rooms"
            );
        }

        match self.config.overflow {
            OverflowPolicy::Reject => Err(RoomError::AllocationExhausted),
            OverflowPolicy::Extend => self.allocate_overflow(&is_live),
        }
    }

    /// Like [`allocate`](Self::allocate), but skips the free primary code
    /// `avoid` unless it is the only one left.
    pub(crate) fn allocate_avoiding(
        &mut self,
        avoid: RoomCode,
        is_live: impl Fn(RoomCode) -> bool,
    ) -> Result<RoomCode, RoomError> {
        if self.config.span().saturating_sub(self.primary_live) > 1 {
            self.allocate(|c| c == avoid || is_live(c))
        } else {
            self.allocate(is_live)
        }
    }

    /// Returns `code` to the pool. Only primary codes are reused.
    pub(crate) fn release(&mut self, code: RoomCode) {
        if self.config.in_primary(code.get()) {
            self.primary_live = self.primary_live.saturating_sub(1);
        }
    }

    fn allocate_primary(&mut self, is_live: &impl Fn(RoomCode) -> bool) -> Option<RoomCode> {
        let (min, max) = (self.config.min, self.config.max);

        for _ in 0..RANDOM_ATTEMPTS {
            let code = RoomCode::new(self.rng.random_range(min..=max));
            if !is_live(code) {
                return Some(code);
            }
        }

        let span = self.config.span();
        let offset = self.rng.random_range(0..span);
        (0..span)
            .map(|i| {
                // Fits in u32: the result lies in [min, max].
                RoomCode::new((u64::from(min) + (offset + i) % span) as u32)
            })
            .find(|&code| !is_live(code))
    }

    fn allocate_overflow(
        &mut self,
        is_live: &impl Fn(RoomCode) -> bool,
    ) -> Result<RoomCode, RoomError> {
        while let Ok(raw) = u32::try_from(self.next_overflow) {
            self.next_overflow += 1;
            let code = RoomCode::new(raw);
            if !is_live(code) {
                tracing::warn!(%code, "primary room codes exhausted, using overflow code");
                return Ok(code);
            }
        }
        Err(RoomError::AllocationExhausted)
    }
}
