//! Incremental paper session over the core execution loop.

use paperlab_core::domain::{Bar, EquityPoint, Position, Trade};
use paperlab_core::engine::{EventSink, ExecutionLoop};
use paperlab_core::risk::HaltReason;
use paperlab_core::strategy::Strategy;
use serde::{Deserialize, Serialize};

/// Summary written out after every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_trades: usize,
    /// Winning trades as a percentage of all trades.
    pub win_rate: f64,
    pub total_pnl: f64,
    pub max_drawdown: f64,
}

/// Wraps an [`ExecutionLoop`] for cycle-by-cycle advancement.
///
/// Each cycle hands in the full merged bar series; only bars past the last
/// processed index are stepped. The underlying loop state (position, risk,
/// equity) carries across cycles, so the incremental path and a batch
/// backtest over the same series are bit-identical.
pub struct PaperSession<S> {
    engine: ExecutionLoop<S>,
    initial_capital: f64,
    processed: usize,
}

impl<S: Strategy> PaperSession<S> {
    pub fn new(engine: ExecutionLoop<S>) -> Self {
        let initial_capital = engine.capital();
        Self {
            engine,
            initial_capital,
            processed: 0,
        }
    }

    /// Advance over bars not yet processed. Returns how many were stepped.
    pub fn process_new_bars(&mut self, bars: &[Bar], events: &mut dyn EventSink) -> usize {
        let start = self.processed;
        for step in start..bars.len() {
            self.engine.process_bar(bars, step, events);
        }
        self.processed = bars.len().max(self.processed);
        self.processed - start
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn capital(&self) -> f64 {
        self.engine.capital()
    }

    pub fn position(&self) -> Option<&Position> {
        self.engine.execution().position()
    }

    pub fn trades(&self) -> &[Trade] {
        self.engine.trades()
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        self.engine.equity_curve()
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.engine.risk().halt_reason()
    }

    pub fn performance(&self) -> PerformanceSummary {
        let trades = self.engine.trades();
        let total_trades = trades.len();
        let wins = trades.iter().filter(|t| t.is_winner()).count();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        PerformanceSummary {
            initial_capital: self.initial_capital,
            final_capital: self.engine.capital(),
            total_trades,
            win_rate: if total_trades > 0 {
                wins as f64 / total_trades as f64 * 100.0
            } else {
                0.0
            },
            total_pnl,
            max_drawdown: self.engine.max_drawdown(),
        }
    }
}
