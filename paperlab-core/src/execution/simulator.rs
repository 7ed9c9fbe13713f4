//! Fill simulator: one open position, an append-only trade log.

use crate::domain::{Direction, Position, Trade};
use crate::execution::cost_model::CostModelConfig;
use crate::execution::fill::evaluate_fill;
use crate::risk::RiskManager;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Static contract terms, independent of the time-of-day cost profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub contract_multiplier: f64,
    pub commission_per_contract: f64,
    pub commission_min: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            contract_multiplier: 1.0,
            commission_per_contract: 0.0,
            commission_min: 0.0,
        }
    }
}

/// Result of an order attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Opened {
        fill_price: f64,
        filled_size: f64,
        fill_ratio: f64,
    },
    /// The deterministic venue draw rejected the order.
    RejectedByVenue,
    /// A position already exists; one at a time per run.
    AlreadyInPosition,
}

impl SendOutcome {
    pub fn opened(&self) -> bool {
        matches!(self, SendOutcome::Opened { .. })
    }
}

/// Turns accepted signals into simulated fills under the cost model.
///
/// Owns the single optional `Position` and the trade log. Stop and target
/// prices are computed once at entry and frozen; exits only compare against
/// them.
#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    config: SimulatorConfig,
    cost_model: CostModelConfig,
    position: Option<Position>,
    trades: Vec<Trade>,
}

impl ExecutionSimulator {
    pub fn new(config: SimulatorConfig, cost_model: CostModelConfig) -> Self {
        Self {
            config,
            cost_model,
            position: None,
            trades: Vec::new(),
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn last_trade(&self) -> Option<&Trade> {
        self.trades.last()
    }

    /// Attempt to open a position at `price`.
    ///
    /// Resolves the cost profile for the bar's time of day, runs the
    /// deterministic reject/fill draws, applies slippage against the trader,
    /// and freezes stop/target via the risk manager.
    pub fn send_order(
        &mut self,
        symbol: &str,
        direction: Direction,
        price: f64,
        size: f64,
        atr: Option<f64>,
        risk: &RiskManager,
        timestamp: NaiveDateTime,
    ) -> SendOutcome {
        if self.position.is_some() {
            return SendOutcome::AlreadyInPosition;
        }

        let profile = self.cost_model.resolve(timestamp.time()).clone();
        let draw = evaluate_fill(symbol, direction, size, timestamp, &profile);
        if draw.rejected {
            return SendOutcome::RejectedByVenue;
        }

        let filled_size = size * draw.fill_ratio;
        // Slippage always moves the price against the trader.
        let fill_price = price + direction.sign() * profile.slippage;
        let stop_price = Some(risk.stop_price(fill_price, direction, atr));
        let take_profit = risk.take_profit_price(fill_price, direction, atr);

        self.position = Some(Position {
            symbol: symbol.to_string(),
            direction,
            entry_price: fill_price,
            requested_size: size,
            filled_size,
            contract_multiplier: self.config.contract_multiplier,
            stop_price,
            take_profit,
            entry_time: timestamp,
            cost_profile: profile.name,
        });

        SendOutcome::Opened {
            fill_price,
            filled_size,
            fill_ratio: draw.fill_ratio,
        }
    }

    /// One commission leg for `size` contracts under the entry profile.
    fn commission_leg(&self, size: f64) -> f64 {
        (self.config.commission_per_contract * size).max(self.config.commission_min)
    }

    fn round_trip_commission(&self, size: f64, profile_name: &str) -> f64 {
        let multiplier = self.cost_model.by_name(profile_name).commission_multiplier;
        2.0 * self.commission_leg(size) * multiplier
    }

    /// Check the frozen stop/target against `price`; close when touched.
    ///
    /// Long positions exit at `price <= stop` or `price >= target`, shorts
    /// mirrored. When both trigger on the same bar, the target price wins.
    /// Returns the realized pnl of the closed trade.
    pub fn check_exit(&mut self, price: f64, timestamp: NaiveDateTime) -> Option<f64> {
        let position = self.position.as_ref()?;

        let mut exit_price = None;
        if let Some(stop) = position.stop_price {
            let stopped = match position.direction {
                Direction::Long => price <= stop,
                Direction::Short => price >= stop,
            };
            if stopped {
                exit_price = Some(stop);
            }
        }
        if let Some(target) = position.take_profit {
            let reached = match position.direction {
                Direction::Long => price >= target,
                Direction::Short => price <= target,
            };
            if reached {
                exit_price = Some(target);
            }
        }

        let exit_price = exit_price?;
        let position = self.position.take()?;
        Some(self.close_position(position, exit_price, timestamp))
    }

    /// Unconditional close at `price` (sequence end or fatal halt).
    /// Returns 0.0 when flat.
    pub fn force_close(&mut self, price: f64, timestamp: NaiveDateTime) -> f64 {
        match self.position.take() {
            Some(position) => self.close_position(position, price, timestamp),
            None => 0.0,
        }
    }

    fn close_position(
        &mut self,
        position: Position,
        exit_price: f64,
        timestamp: NaiveDateTime,
    ) -> f64 {
        let gross_pnl = position.direction.sign()
            * (exit_price - position.entry_price)
            * position.filled_size
            * position.contract_multiplier;
        let commission = self.round_trip_commission(position.filled_size, &position.cost_profile);
        let pnl = gross_pnl - commission;
        let fill_ratio = if position.requested_size > 0.0 {
            position.filled_size / position.requested_size
        } else {
            0.0
        };
        self.trades.push(Trade {
            symbol: position.symbol,
            direction: position.direction,
            entry_price: position.entry_price,
            exit_price,
            filled_size: position.filled_size,
            contract_multiplier: position.contract_multiplier,
            gross_pnl,
            commission,
            pnl,
            entry_time: position.entry_time,
            exit_time: timestamp,
            cost_profile: position.cost_profile,
            fill_ratio,
        });
        pnl
    }
}
