//! Order lifecycle state machine.
//!
//! ```text
//!             Cancel
//!   PENDING ──────────► CANCELED (terminal)
//!      │
//!      │ Match
//!      ▼
//!   MATCHED (terminal)
//! ```
//!
//! Every status change goes through [`OrderStatus::apply`]. Anything not in
//! the diagram is a [`TransitionError`]; the order is left untouched.

use std::fmt;

use crate::types::OrderStatus;

/// Events that move an order out of PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    Cancel,
    Match,
}

/// Returned when an event cannot legally be applied in the current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: OrderStatus,
    pub event: OrderEvent,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "illegal order transition: {} + {:?}",
            self.from.as_str(),
            self.event
        )
    }
}

impl std::error::Error for TransitionError {}

impl OrderStatus {
    /// `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Matched | OrderStatus::Canceled)
    }

    /// Next status after `event`, or the reason it is refused.
    pub fn apply(self, event: OrderEvent) -> Result<OrderStatus, TransitionError> {
        match (self, event) {
            (OrderStatus::Pending, OrderEvent::Cancel) => Ok(OrderStatus::Canceled),
            (OrderStatus::Pending, OrderEvent::Match) => Ok(OrderStatus::Matched),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}
