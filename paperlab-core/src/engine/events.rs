//! Structured runtime events emitted by the execution loop.
//!
//! Gate blocks are data, not failures: every bar may be blocked for a named
//! reason, and the reason set is a closed enum so tests can assert exactly
//! why no trade happened on a given bar.

use crate::domain::Direction;
use crate::risk::HaltReason;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the loop took no action on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateReason {
    ScheduleClosed,
    BeforeTradeStart,
    AfterTradeEnd,
    MaxTradesPerDay,
    RiskNotAllowed,
    MinAtr,
    NoSignal,
    PositionSizeZero,
    RiskOrderLimit,
    OrderRejected,
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateReason::ScheduleClosed => "SCHEDULE_CLOSED",
            GateReason::BeforeTradeStart => "BEFORE_TRADE_START",
            GateReason::AfterTradeEnd => "AFTER_TRADE_END",
            GateReason::MaxTradesPerDay => "MAX_TRADES_PER_DAY",
            GateReason::RiskNotAllowed => "RISK_NOT_ALLOWED",
            GateReason::MinAtr => "MIN_ATR",
            GateReason::NoSignal => "NO_SIGNAL",
            GateReason::PositionSizeZero => "POSITION_SIZE_ZERO",
            GateReason::RiskOrderLimit => "RISK_ORDER_LIMIT",
            GateReason::OrderRejected => "ORDER_REJECTED",
        };
        f.write_str(name)
    }
}

/// Side-channel event stream of a run. The host decides how to persist or
/// broadcast these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RuntimeEvent {
    NewDay {
        date: NaiveDate,
    },
    GateBlocked {
        step: usize,
        reason: GateReason,
    },
    Halted {
        step: usize,
        reason: HaltReason,
    },
    TradeOpen {
        step: usize,
        symbol: String,
        direction: Direction,
        fill_price: f64,
        filled_size: f64,
    },
    TradeClose {
        step: usize,
        pnl: f64,
        capital: f64,
    },
    ForceClose {
        step: usize,
        pnl: f64,
        reason: Option<HaltReason>,
    },
    Finished {
        bars: usize,
        capital: f64,
    },
}

/// Receiver for the loop's event stream.
pub trait EventSink {
    fn emit(&mut self, event: RuntimeEvent);
}

/// Collects events into a vector; the default sink for backtests and tests.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<RuntimeEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RuntimeEvent] {
        &self.events
    }

    pub fn gate_reasons(&self) -> Vec<GateReason> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RuntimeEvent::GateBlocked { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: RuntimeEvent) {
        self.events.push(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: RuntimeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let event = RuntimeEvent::GateBlocked {
            step: 7,
            reason: GateReason::MinAtr,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "gate_blocked");
        assert_eq!(json["reason"], "MIN_ATR");
    }

    #[test]
    fn gate_reason_names_are_stable() {
        assert_eq!(GateReason::ScheduleClosed.to_string(), "SCHEDULE_CLOSED");
        assert_eq!(GateReason::RiskOrderLimit.to_string(), "RISK_ORDER_LIMIT");
    }
}
