//! The bar-stepping execution loop.
//!
//! One pass per bar through a fixed gating order; the first gate that
//! fires short-circuits the bar to "no action". Identical stepping serves
//! batch backtests (`run`) and the incremental live/paper path
//! (`process_bar` on newly available bars only).

use crate::calendar::{self, Schedule};
use crate::domain::{Bar, EquityCurve, EquityPoint, Trade};
use crate::engine::events::{EventSink, GateReason, RuntimeEvent};
use crate::engine::KillSwitch;
use crate::execution::{ExecutionSimulator, SendOutcome};
use crate::risk::{HaltReason, RiskManager};
use crate::strategy::Strategy;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Run-level parameters consumed by the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub symbol: String,
    pub initial_capital: f64,
    pub max_trades_per_day: u32,
    /// No entries before this time of day.
    pub trade_start: Option<NaiveTime>,
    /// No entries after this time of day.
    pub trade_end: Option<NaiveTime>,
    /// Entries blocked while ATR sits below this floor.
    pub min_atr: f64,
    /// Outer safety net, independent of the risk manager's own daily limit.
    pub safety_max_daily_loss: Option<f64>,
}

impl RunParams {
    pub fn new(symbol: &str, initial_capital: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            initial_capital,
            max_trades_per_day: u32::MAX,
            trade_start: None,
            trade_end: None,
            min_atr: 0.0,
            safety_max_daily_loss: None,
        }
    }
}

/// Drives one symbol through time: gates, signals, fills, accounting.
pub struct ExecutionLoop<S> {
    params: RunParams,
    schedule: Schedule,
    strategy: S,
    risk: RiskManager,
    execution: ExecutionSimulator,
    kill_switch: Option<Box<dyn KillSwitch>>,
    capital: f64,
    equity: EquityCurve,
    daily_trade_count: u32,
    current_date: Option<NaiveDate>,
    last_gate_reason: Option<GateReason>,
}

impl<S: Strategy> ExecutionLoop<S> {
    pub fn new(
        params: RunParams,
        schedule: Schedule,
        strategy: S,
        risk: RiskManager,
        execution: ExecutionSimulator,
    ) -> Self {
        let capital = params.initial_capital;
        Self {
            params,
            schedule,
            strategy,
            risk,
            execution,
            kill_switch: None,
            capital,
            equity: EquityCurve::new(),
            daily_trade_count: 0,
            current_date: None,
            last_gate_reason: None,
        }
    }

    pub fn with_kill_switch(mut self, kill_switch: Box<dyn KillSwitch>) -> Self {
        self.kill_switch = Some(kill_switch);
        self
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        self.equity.points()
    }

    pub fn max_drawdown(&self) -> f64 {
        self.equity.max_drawdown()
    }

    pub fn trades(&self) -> &[Trade] {
        self.execution.trades()
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn execution(&self) -> &ExecutionSimulator {
        &self.execution
    }

    pub fn last_gate_reason(&self) -> Option<GateReason> {
        self.last_gate_reason
    }

    fn gate(
        &mut self,
        step: usize,
        bar: &Bar,
        reason: GateReason,
        events: &mut dyn EventSink,
    ) {
        self.last_gate_reason = Some(reason);
        events.emit(RuntimeEvent::GateBlocked { step, reason });
        self.append_equity(step, bar);
    }

    fn append_equity(&mut self, step: usize, bar: &Bar) {
        self.equity.append(step, bar.timestamp, self.capital);
    }

    /// Process `bars[step]`. Earlier bars must already have been processed;
    /// `bars[..=step]` is the history the strategy and ATR see.
    pub fn process_bar(&mut self, bars: &[Bar], step: usize, events: &mut dyn EventSink) {
        let bar = bars[step].clone();
        let price = bar.close;
        let bar_date = bar.timestamp.date();

        // 1. Date rollover: reset daily state, fire the day hooks.
        if self.current_date != Some(bar_date) {
            self.current_date = Some(bar_date);
            self.daily_trade_count = 0;
            self.risk.on_new_day();
            self.strategy.on_new_day();
            events.emit(RuntimeEvent::NewDay { date: bar_date });
        }

        // 2. External kill switch.
        if let Some(kill_switch) = &self.kill_switch {
            if kill_switch.engaged() && self.risk.halt_reason() != Some(HaltReason::KillSwitch) {
                self.risk.trigger_halt(HaltReason::KillSwitch);
                events.emit(RuntimeEvent::Halted {
                    step,
                    reason: HaltReason::KillSwitch,
                });
            }
        }

        // 3. Outer daily-loss safety net.
        if let Some(limit) = self.params.safety_max_daily_loss {
            if self.risk.daily_pnl() <= -limit
                && self.risk.halt_reason() != Some(HaltReason::SafetyDailyLoss)
            {
                self.risk.trigger_halt(HaltReason::SafetyDailyLoss);
                events.emit(RuntimeEvent::Halted {
                    step,
                    reason: HaltReason::SafetyDailyLoss,
                });
            }
        }

        // 4. Fatal halt with an open position: flatten and stop for the bar.
        if self.execution.position().is_some() && self.risk.should_force_close() {
            let pnl = self.execution.force_close(price, bar.timestamp);
            self.capital += pnl;
            self.risk.update_after_trade(pnl, self.capital);
            self.risk.mark_force_closed();
            events.emit(RuntimeEvent::ForceClose {
                step,
                pnl,
                reason: self.risk.halt_reason(),
            });
            self.append_equity(step, &bar);
            return;
        }

        // 5. Session and trade-window gates.
        if !calendar::is_open(bar.timestamp, &self.schedule) {
            return self.gate(step, &bar, GateReason::ScheduleClosed, events);
        }
        let time_of_day = bar.timestamp.time();
        if self.params.trade_start.is_some_and(|start| time_of_day < start) {
            return self.gate(step, &bar, GateReason::BeforeTradeStart, events);
        }
        if self.params.trade_end.is_some_and(|end| time_of_day > end) {
            return self.gate(step, &bar, GateReason::AfterTradeEnd, events);
        }

        // 6. ATR recompute feeds the volatility pause. This runs after the
        // force-close branch and before any exit/entry logic; reordering
        // changes which bar a halt first takes effect on.
        let atr = self.risk.update_atr(&bars[..=step]);
        let reason_before = self.risk.halt_reason();
        self.risk.update_volatility_pause(atr);
        if self.risk.halt_reason() == Some(HaltReason::VolatilityPause)
            && reason_before != Some(HaltReason::VolatilityPause)
        {
            events.emit(RuntimeEvent::Halted {
                step,
                reason: HaltReason::VolatilityPause,
            });
        }

        // 7. Holding: only the exit check runs.
        if self.execution.position().is_some() {
            if let Some(pnl) = self.execution.check_exit(price, bar.timestamp) {
                self.capital += pnl;
                self.risk.update_after_trade(pnl, self.capital);
                self.strategy.on_trade_close(pnl, step);
                events.emit(RuntimeEvent::TradeClose {
                    step,
                    pnl,
                    capital: self.capital,
                });
            }
            self.append_equity(step, &bar);
            return;
        }

        // 8. Flat: entry gates in fixed order.
        if self.daily_trade_count >= self.params.max_trades_per_day {
            return self.gate(step, &bar, GateReason::MaxTradesPerDay, events);
        }
        if !self.risk.allow_trade() {
            return self.gate(step, &bar, GateReason::RiskNotAllowed, events);
        }
        if atr.is_some_and(|a| a < self.params.min_atr) {
            return self.gate(step, &bar, GateReason::MinAtr, events);
        }

        let closes: Vec<f64> = bars[..=step].iter().map(|b| b.close).collect();
        let signal = self.strategy.signal(&closes, step);
        let Some(direction) = signal.direction() else {
            return self.gate(step, &bar, GateReason::NoSignal, events);
        };

        let size = self.risk.calc_position_size(self.capital, price, atr);
        if size <= 0.0 {
            return self.gate(step, &bar, GateReason::PositionSizeZero, events);
        }
        if !self.risk.can_open_order(size) {
            return self.gate(step, &bar, GateReason::RiskOrderLimit, events);
        }

        let outcome = self.execution.send_order(
            &self.params.symbol,
            direction,
            price,
            size,
            atr,
            &self.risk,
            bar.timestamp,
        );
        match outcome {
            SendOutcome::Opened {
                fill_price,
                filled_size,
                ..
            } => {
                self.daily_trade_count += 1;
                self.risk.record_order();
                self.last_gate_reason = None;
                events.emit(RuntimeEvent::TradeOpen {
                    step,
                    symbol: self.params.symbol.clone(),
                    direction,
                    fill_price,
                    filled_size,
                });
            }
            SendOutcome::RejectedByVenue => {
                return self.gate(step, &bar, GateReason::OrderRejected, events);
            }
            SendOutcome::AlreadyInPosition => {}
        }
        self.append_equity(step, &bar);
    }

    /// Flatten any open position at the close of the last processed bar.
    pub fn close_out(&mut self, bars: &[Bar], events: &mut dyn EventSink) {
        let Some(last) = bars.last() else { return };
        if self.execution.position().is_none() {
            return;
        }
        let pnl = self.execution.force_close(last.close, last.timestamp);
        self.capital += pnl;
        self.risk.update_after_trade(pnl, self.capital);
        events.emit(RuntimeEvent::ForceClose {
            step: bars.len() - 1,
            pnl,
            reason: None,
        });
    }

    /// Batch backtest: every bar in one synchronous pass, then close out.
    /// Returns the final capital.
    pub fn run(&mut self, bars: &[Bar], events: &mut dyn EventSink) -> f64 {
        for step in 0..bars.len() {
            self.process_bar(bars, step, events);
        }
        self.close_out(bars, events);
        events.emit(RuntimeEvent::Finished {
            bars: bars.len(),
            capital: self.capital,
        });
        self.capital
    }
}
