//! Per-run risk guard: drawdown, loss, and volatility halts plus sizing.
//!
//! The risk manager owns all `RiskState`: daily pnl, loss streak, peak
//! equity, the halt flag and reason, the rolling ATR window, and the
//! orders-placed-today counter. Day-scoped halts clear on the next trading
//! day; the fatal reasons persist until the host intervenes.

pub mod atr;

pub use atr::AtrWindow;

use crate::domain::{Bar, Direction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why trading is halted. Closed set; day-rollover only clears the
/// day-scoped members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HaltReason {
    DailyLoss,
    SafetyDailyLoss,
    MaxDrawdown,
    MaxDrawdownPct,
    MaxConsecutiveLosses,
    KillSwitch,
    VolatilityPause,
    Disconnected,
}

impl HaltReason {
    /// Reasons cleared automatically by `on_new_day`.
    pub fn is_day_scoped(self) -> bool {
        matches!(self, HaltReason::DailyLoss | HaltReason::SafetyDailyLoss)
    }

    /// Reasons that trigger an immediate force-close of any open position.
    pub fn forces_close(self) -> bool {
        matches!(
            self,
            HaltReason::MaxDrawdown
                | HaltReason::DailyLoss
                | HaltReason::SafetyDailyLoss
                | HaltReason::KillSwitch
                | HaltReason::Disconnected
        )
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HaltReason::DailyLoss => "DAILY_LOSS",
            HaltReason::SafetyDailyLoss => "SAFETY_DAILY_LOSS",
            HaltReason::MaxDrawdown => "MAX_DRAWDOWN",
            HaltReason::MaxDrawdownPct => "MAX_DRAWDOWN_PCT",
            HaltReason::MaxConsecutiveLosses => "MAX_CONSECUTIVE_LOSSES",
            HaltReason::KillSwitch => "KILL_SWITCH",
            HaltReason::VolatilityPause => "VOLATILITY_PAUSE",
            HaltReason::Disconnected => "DISCONNECTED",
        };
        f.write_str(name)
    }
}

/// Immutable risk thresholds, constructed once and handed to the manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Percentage stop used when no ATR is available.
    pub stop_loss_pct: f64,
    pub daily_loss_limit: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
    pub max_consecutive_losses: Option<u32>,
    /// Fraction of capital risked per trade.
    pub risk_per_trade: f64,
    pub atr_period: usize,
    /// Stop distance in ATR multiples.
    pub atr_multiplier: f64,
    /// Take-profit distance in ATR multiples; `None` disables targets.
    pub take_profit_multiplier: Option<f64>,
    pub max_position_size: Option<f64>,
    pub max_orders_per_day: Option<u32>,
    /// Per-loss size reduction; 0.0 disables the throttle.
    pub loss_streak_reduce_ratio: f64,
    /// Floor for the throttle multiplier.
    pub loss_streak_min_multiplier: f64,
    pub volatility_halt_atr: Option<f64>,
    /// Must sit below the halt threshold; hysteresis against flapping.
    pub volatility_resume_atr: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.02,
            daily_loss_limit: None,
            max_drawdown: None,
            max_drawdown_pct: None,
            max_consecutive_losses: None,
            risk_per_trade: 0.01,
            atr_period: 14,
            atr_multiplier: 2.0,
            take_profit_multiplier: None,
            max_position_size: None,
            max_orders_per_day: None,
            loss_streak_reduce_ratio: 0.0,
            loss_streak_min_multiplier: 0.2,
            volatility_halt_atr: None,
            volatility_resume_atr: None,
        }
    }
}

/// Stateful risk guard for one run.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    daily_pnl: f64,
    consecutive_losses: u32,
    peak_equity: Option<f64>,
    halted: bool,
    halt_reason: Option<HaltReason>,
    atr: AtrWindow,
    orders_today: u32,
    force_close_triggered: bool,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        let atr = AtrWindow::new(config.atr_period.max(1));
        Self {
            config,
            daily_pnl: 0.0,
            consecutive_losses: 0,
            peak_equity: None,
            halted: false,
            halt_reason: None,
            atr,
            orders_today: 0,
            force_close_triggered: false,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Reset daily accumulators. Day-scoped halts auto-clear; the fatal
    /// reasons survive the rollover.
    pub fn on_new_day(&mut self) {
        self.daily_pnl = 0.0;
        self.orders_today = 0;
        if self.halt_reason.is_some_and(HaltReason::is_day_scoped) {
            self.halted = false;
            self.halt_reason = None;
        }
        self.force_close_triggered = false;
    }

    pub fn trigger_halt(&mut self, reason: HaltReason) {
        self.halted = true;
        self.halt_reason = Some(reason);
    }

    /// External intervention: clear any halt, including the persistent ones.
    pub fn clear_halt(&mut self) {
        self.halted = false;
        self.halt_reason = None;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt_reason
    }

    pub fn allow_trade(&self) -> bool {
        !self.halted
    }

    /// True when halted for a force-close reason and the open position has
    /// not yet been flattened this halt episode.
    pub fn should_force_close(&self) -> bool {
        if !self.halted || self.force_close_triggered {
            return false;
        }
        self.halt_reason.is_some_and(HaltReason::forces_close)
    }

    pub fn mark_force_closed(&mut self) {
        self.force_close_triggered = true;
    }

    pub fn daily_pnl(&self) -> f64 {
        self.daily_pnl
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    /// Feed the latest bar into the rolling ATR window.
    pub fn update_atr(&mut self, bars: &[Bar]) -> Option<f64> {
        self.atr.update(bars)
    }

    pub fn atr(&self) -> Option<f64> {
        self.atr.current()
    }

    /// ATR-risk position sizing with a capital-fraction fallback.
    ///
    /// With ATR: `size = (capital * risk_per_trade) / (atr * atr_multiplier)`.
    /// Without: a tenth of capital at the current price. The loss-streak
    /// throttle scales the result down to its configured floor.
    pub fn calc_position_size(&self, capital: f64, price: f64, atr: Option<f64>) -> f64 {
        let base = match atr {
            Some(a) if a > 0.0 => {
                let risk_amount = capital * self.config.risk_per_trade;
                let stop_distance = a * self.config.atr_multiplier;
                risk_amount / stop_distance
            }
            _ => capital / price * 0.1,
        };
        let throttled = base * self.loss_streak_multiplier();
        throttled.max(0.0)
    }

    fn loss_streak_multiplier(&self) -> f64 {
        if self.config.loss_streak_reduce_ratio <= 0.0 || self.consecutive_losses == 0 {
            return 1.0;
        }
        let reduced = 1.0 - self.consecutive_losses as f64 * self.config.loss_streak_reduce_ratio;
        reduced.max(self.config.loss_streak_min_multiplier)
    }

    /// Stop placed at entry: ATR distance when available, percentage otherwise.
    pub fn stop_price(&self, entry_price: f64, direction: Direction, atr: Option<f64>) -> f64 {
        match atr {
            Some(a) if a > 0.0 => {
                entry_price - direction.sign() * a * self.config.atr_multiplier
            }
            _ => match direction {
                Direction::Long => entry_price * (1.0 - self.config.stop_loss_pct),
                Direction::Short => entry_price * (1.0 + self.config.stop_loss_pct),
            },
        }
    }

    /// Target placed at entry; requires both a configured multiplier and ATR.
    pub fn take_profit_price(
        &self,
        entry_price: f64,
        direction: Direction,
        atr: Option<f64>,
    ) -> Option<f64> {
        let multiplier = self.config.take_profit_multiplier?;
        match atr {
            Some(a) if a > 0.0 => Some(entry_price + direction.sign() * a * multiplier),
            _ => None,
        }
    }

    /// Track peak equity and fire the drawdown halts. Returns the drawdown.
    pub fn update_equity(&mut self, equity: f64) -> f64 {
        let peak = match self.peak_equity {
            Some(p) if p >= equity => p,
            _ => equity,
        };
        self.peak_equity = Some(peak);
        let drawdown = peak - equity;
        let drawdown_pct = if peak > 0.0 { drawdown / peak } else { 0.0 };
        if self.config.max_drawdown.is_some_and(|limit| drawdown >= limit) {
            self.trigger_halt(HaltReason::MaxDrawdown);
        }
        if self
            .config
            .max_drawdown_pct
            .is_some_and(|limit| drawdown_pct >= limit)
        {
            self.trigger_halt(HaltReason::MaxDrawdownPct);
        }
        drawdown
    }

    /// Fold a realized trade into daily pnl, the loss streak, and the
    /// equity/drawdown guards, in that order.
    pub fn update_after_trade(&mut self, pnl: f64, equity: f64) {
        self.daily_pnl += pnl;
        if pnl < 0.0 {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
        if self
            .config
            .max_consecutive_losses
            .is_some_and(|limit| self.consecutive_losses >= limit)
        {
            self.trigger_halt(HaltReason::MaxConsecutiveLosses);
        }
        if self
            .config
            .daily_loss_limit
            .is_some_and(|limit| self.daily_pnl <= -limit)
        {
            self.trigger_halt(HaltReason::DailyLoss);
        }
        self.update_equity(equity);
    }

    /// Volatility circuit breaker with hysteresis: halt above the halt
    /// threshold, resume only below the (lower) resume threshold.
    pub fn update_volatility_pause(&mut self, atr: Option<f64>) {
        let Some(halt_at) = self.config.volatility_halt_atr else {
            return;
        };
        let Some(atr) = atr else {
            return;
        };
        if self.halted {
            if self.halt_reason == Some(HaltReason::VolatilityPause) {
                let resume_at = self.config.volatility_resume_atr.unwrap_or(halt_at);
                if atr < resume_at {
                    self.clear_halt();
                }
            }
        } else if atr > halt_at {
            self.trigger_halt(HaltReason::VolatilityPause);
        }
    }

    /// Position-size cap and orders-per-day cap.
    pub fn can_open_order(&self, size: f64) -> bool {
        if self.config.max_position_size.is_some_and(|max| size > max) {
            return false;
        }
        if self
            .config
            .max_orders_per_day
            .is_some_and(|max| self.orders_today >= max)
        {
            return false;
        }
        true
    }

    pub fn record_order(&mut self) {
        self.orders_today += 1;
    }

    pub fn orders_today(&self) -> u32 {
        self.orders_today
    }
}
