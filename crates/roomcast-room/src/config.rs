//! Room-code allocation settings.

use serde::{Deserialize, Serialize};

/// Lowest code handed out under normal load.
pub const DEFAULT_MIN_CODE: u32 = 1000;

/// Highest code handed out under normal load.
pub const DEFAULT_MAX_CODE: u32 = 9999;

// ---------------------------------------------------------------------------
// OverflowPolicy
// ---------------------------------------------------------------------------

/// What `create_room` does once every code in the primary range is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Hand out codes above the primary range from a counter that only
    /// moves forward, starting at `max + 1`.
    #[default]
    Extend,
    /// Fail with [`RoomError::AllocationExhausted`](crate::RoomError::AllocationExhausted).
    Reject,
}

// ---------------------------------------------------------------------------
// RoomCodeConfig
// ---------------------------------------------------------------------------

/// The primary code range and the policy for when it fills up.
///
/// ```text
/// [min ........ max] (random, reused after rooms close)
///                    [max+1, max+2, ...] (Extend only, never reused)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCodeConfig {
    pub min: u32,
    pub max: u32,
    pub overflow: OverflowPolicy,
}

impl Default for RoomCodeConfig {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_CODE,
            max: DEFAULT_MAX_CODE,
            overflow: OverflowPolicy::default(),
        }
    }
}

impl RoomCodeConfig {
    /// Returns a copy with `min <= max`, swapping the bounds if needed.
    pub fn validated(self) -> Self {
        if self.min <= self.max {
            return self;
        }
        tracing::warn!(
            min = self.min,
            max = self.max,
            "room code range is inverted, swapping bounds"
        );
        Self {
            min: self.max,
            max: self.min,
            ..self
        }
    }

    /// Number of codes in the primary range.
    pub fn span(&self) -> u64 {
        u64::from(self.max) - u64::from(self.min) + 1
    }

    pub fn in_primary(&self, code: u32) -> bool {
        (self.min..=self.max).contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_config_default_is_four_digits() {
        let config = RoomCodeConfig::default();
        assert_eq!(config.min, 1000);
        assert_eq!(config.max, 9999);
        assert_eq!(config.span(), 9000);
        assert_eq!(config.overflow, OverflowPolicy::Extend);
    }

    #[test]
    fn test_validated_swaps_inverted_range() {
        let config = RoomCodeConfig {
            min: 50,
            max: 10,
            overflow: OverflowPolicy::Reject,
        }
        .validated();
        assert_eq!((config.min, config.max), (10, 50));
        assert_eq!(config.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn test_validated_keeps_single_code_range() {
        let config = RoomCodeConfig {
            min: 7,
            max: 7,
            overflow: OverflowPolicy::Extend,
        }
        .validated();
        assert_eq!(config.span(), 1);
        assert!(config.in_primary(7));
        assert!(!config.in_primary(8));
    }

    #[test]
    fn test_span_covers_full_u32_range() {
        let config = RoomCodeConfig {
            min: 0,
            max: u32::MAX,
            overflow: OverflowPolicy::Extend,
        };
        assert_eq!(config.span(), 1 << 32);
    }

    #[test]
    fn test_room_code_config_serde_shape() {
        let json = serde_json::to_value(RoomCodeConfig::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"min": 1000, "max": 9999, "overflow": "Extend"})
        );
    }
}
