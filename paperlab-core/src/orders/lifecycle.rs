//! Order lifecycle: a validated state machine keyed by order id.
//!
//! Orders are never deleted, only transitioned. A rejected transition is a
//! logic error to investigate, never a retryable condition; it leaves the
//! order untouched and returns a typed error.

use crate::domain::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Canonical order states shared by every broker gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Acked,
    Partial,
    Filled,
    Canceling,
    Canceled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected
        )
    }

    /// The transition table. `Partial → Partial` is legal: each partial
    /// fill report re-enters the same state with an updated quantity.
    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (New, Acked)
                | (New, Rejected)
                | (New, Filled)
                | (Acked, Partial)
                | (Acked, Filled)
                | (Acked, Canceling)
                | (Acked, Rejected)
                | (Partial, Partial)
                | (Partial, Filled)
                | (Partial, Canceling)
                | (Partial, Rejected)
                | (Canceling, Canceled)
                | (Canceling, Filled)
                | (Canceling, Rejected)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::New => "NEW",
            OrderStatus::Acked => "ACKED",
            OrderStatus::Partial => "PARTIAL",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceling => "CANCELING",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
}

/// Why a transition was refused. The order is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("order {order_id} not found")]
    OrderNotFound { order_id: String },

    #[error("order {order_id} is in terminal state {status}")]
    TerminalState {
        order_id: String,
        status: OrderStatus,
    },

    #[error("invalid transition {from} -> {to} for order {order_id}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// One tracked order. A single instance exists per id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub price: f64,
    pub size: f64,
    pub filled: f64,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub message: String,
}

/// All orders of a run, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: BTreeMap<String, Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new order in `NEW` with zero filled quantity.
    pub fn create(
        &mut self,
        order_id: &str,
        symbol: &str,
        direction: Direction,
        price: f64,
        size: f64,
        order_type: OrderType,
        now: NaiveDateTime,
    ) -> &Order {
        let order = Order {
            order_id: order_id.to_string(),
            symbol: symbol.to_string(),
            direction,
            price,
            size,
            filled: 0.0,
            status: OrderStatus::New,
            order_type,
            created_at: now,
            updated_at: now,
            message: String::new(),
        };
        self.orders.insert(order_id.to_string(), order);
        &self.orders[order_id]
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.orders.contains_key(order_id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Apply a validated transition.
    ///
    /// On success the status, `updated_at`, optional filled quantity, and
    /// optional message are updated together. On failure nothing changes.
    pub fn transition(
        &mut self,
        order_id: &str,
        to: OrderStatus,
        filled: Option<f64>,
        message: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<&Order, TransitionError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| TransitionError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if order.status.is_terminal() {
            return Err(TransitionError::TerminalState {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }
        if !order.status.can_transition_to(to) {
            return Err(TransitionError::InvalidTransition {
                order_id: order_id.to_string(),
                from: order.status,
                to,
            });
        }

        if let Some(filled) = filled {
            order.filled = filled;
        }
        order.status = to;
        order.updated_at = now;
        if let Some(message) = message {
            order.message = message.to_string();
        }
        Ok(order)
    }

    /// Adopt a broker-reported state during reconciliation.
    ///
    /// Remote truth may skip intermediate states (a broker-initiated cancel
    /// arrives as `CANCELED` with no local `CANCELING`), so this bypasses
    /// the transition table. Terminal local records still win: their
    /// history is richer than any remote snapshot.
    pub fn adopt_remote(
        &mut self,
        order_id: &str,
        status: OrderStatus,
        filled: f64,
        message: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<&Order, TransitionError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| TransitionError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        if order.status.is_terminal() {
            return Err(TransitionError::TerminalState {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }
        order.status = status;
        order.filled = filled;
        order.updated_at = now;
        if let Some(message) = message {
            order.message = message.to_string();
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 31, 0)
            .unwrap()
    }

    fn book_with_order() -> OrderBook {
        let mut book = OrderBook::new();
        book.create("OID1", "M2609", Direction::Long, 3000.0, 2.0, OrderType::Limit, now());
        book
    }

    #[test]
    fn ack_then_fill() {
        let mut book = book_with_order();
        book.transition("OID1", OrderStatus::Acked, None, None, now()).unwrap();
        let order = book
            .transition("OID1", OrderStatus::Filled, Some(2.0), None, now())
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled, 2.0);
    }

    #[test]
    fn cancel_flow_then_terminal() {
        let mut book = book_with_order();
        book.transition("OID1", OrderStatus::Acked, None, None, now()).unwrap();
        book.transition("OID1", OrderStatus::Canceling, None, None, now()).unwrap();
        book.transition("OID1", OrderStatus::Canceled, None, None, now()).unwrap();

        let err = book
            .transition("OID1", OrderStatus::Filled, Some(2.0), None, now())
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::TerminalState {
                order_id: "OID1".into(),
                status: OrderStatus::Canceled,
            }
        );
    }

    #[test]
    fn invalid_transition_leaves_order_unchanged() {
        let mut book = book_with_order();
        let before = book.get("OID1").unwrap().clone();
        let err = book
            .transition("OID1", OrderStatus::Canceled, Some(1.0), Some("oops"), now())
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(book.get("OID1").unwrap(), &before);
    }

    #[test]
    fn partial_can_repeat_with_growing_fill() {
        let mut book = book_with_order();
        book.transition("OID1", OrderStatus::Acked, None, None, now()).unwrap();
        book.transition("OID1", OrderStatus::Partial, Some(0.5), None, now()).unwrap();
        let order = book
            .transition("OID1", OrderStatus::Partial, Some(1.5), None, now())
            .unwrap();
        assert_eq!(order.filled, 1.5);
        book.transition("OID1", OrderStatus::Filled, Some(2.0), None, now()).unwrap();
    }

    #[test]
    fn unknown_order_is_reported() {
        let mut book = OrderBook::new();
        let err = book
            .transition("NOPE", OrderStatus::Acked, None, None, now())
            .unwrap_err();
        assert_eq!(err, TransitionError::OrderNotFound { order_id: "NOPE".into() });
    }

    #[test]
    fn direct_fill_from_new_is_allowed() {
        // Market orders on fast venues report an immediate AllTraded.
        let mut book = book_with_order();
        book.transition("OID1", OrderStatus::Filled, Some(2.0), None, now()).unwrap();
    }

    #[test]
    fn adopt_remote_skips_intermediate_states_but_not_terminal() {
        let mut book = book_with_order();
        book.transition("OID1", OrderStatus::Acked, None, None, now()).unwrap();
        // Broker-initiated cancel: no local CANCELING ever existed.
        let order = book
            .adopt_remote("OID1", OrderStatus::Canceled, 0.0, None, now())
            .unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);

        let err = book
            .adopt_remote("OID1", OrderStatus::Filled, 2.0, None, now())
            .unwrap_err();
        assert!(matches!(err, TransitionError::TerminalState { .. }));
    }

    #[test]
    fn message_is_recorded() {
        let mut book = book_with_order();
        let order = book
            .transition("OID1", OrderStatus::Rejected, None, Some("insufficient margin"), now())
            .unwrap();
        assert_eq!(order.message, "insufficient margin");
    }
}
