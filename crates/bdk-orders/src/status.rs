//! Order status codes.
//!
//! The status catalog (`order_statuses`) is configuration: operators may add
//! intermediate steps with their own `next_status` pointers. A handful of
//! codes carry fixed business meaning and are modeled as a closed enum so
//! the terminal rule cannot be bypassed by a stray integer.

use serde::{Deserialize, Serialize};

/// Freshly created order, not yet picked up.
pub const STATUS_NEW: i32 = 1;
/// Successfully delivered. Terminal.
pub const STATUS_DELIVERED: i32 = 5;
/// Rejected by an operator. Terminal.
pub const STATUS_REJECTED: i32 = 6;
/// Parked with a problem; resumable only via an explicit jump.
pub const STATUS_ON_HOLD: i32 = 7;

/// Lifecycle position of an order, derived from its catalog status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    /// Any configured in-progress step (codes 2–4 in the default catalog,
    /// plus whatever operators add later).
    Intermediate(i32),
    Delivered,
    Rejected,
    OnHold,
}

impl OrderStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            STATUS_NEW => Self::New,
            STATUS_DELIVERED => Self::Delivered,
            STATUS_REJECTED => Self::Rejected,
            STATUS_ON_HOLD => Self::OnHold,
            other => Self::Intermediate(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::New => STATUS_NEW,
            Self::Intermediate(code) => *code,
            Self::Delivered => STATUS_DELIVERED,
            Self::Rejected => STATUS_REJECTED,
            Self::OnHold => STATUS_ON_HOLD,
        }
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_codes_round_trip() {
        for code in [STATUS_NEW, STATUS_DELIVERED, STATUS_REJECTED, STATUS_ON_HOLD] {
            assert_eq!(OrderStatus::from_code(code).code(), code);
        }
    }

    #[test]
    fn unknown_codes_map_to_intermediate() {
        assert_eq!(OrderStatus::from_code(3), OrderStatus::Intermediate(3));
        assert_eq!(OrderStatus::from_code(42).code(), 42);
    }

    #[test]
    fn only_delivered_and_rejected_are_terminal() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::OnHold.is_terminal());
        assert!(!OrderStatus::Intermediate(3).is_terminal());
    }
}
