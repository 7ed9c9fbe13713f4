//! Per-bar equity curve rows and the running-peak drawdown tracker.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One equity-curve row, appended every bar regardless of the branch the
/// loop takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub step: usize,
    pub timestamp: NaiveDateTime,
    pub equity: f64,
    /// `peak(equity[0..=step]) - equity[step]`, never negative.
    pub drawdown: f64,
}

/// Equity curve with a monotonic high-water mark.
///
/// Drawdown is computed against the running peak at append time, so every
/// row is final when written.
#[derive(Debug, Clone, Default)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
    peak: Option<f64>,
}

impl EquityCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, step: usize, timestamp: NaiveDateTime, equity: f64) {
        let peak = match self.peak {
            Some(p) if p >= equity => p,
            _ => equity,
        };
        self.peak = Some(peak);
        self.points.push(EquityPoint {
            step,
            timestamp,
            equity,
            drawdown: peak - equity,
        });
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn max_drawdown(&self) -> f64 {
        self.points.iter().map(|p| p.drawdown).fold(0.0, f64::max)
    }

    pub fn last_equity(&self) -> Option<f64> {
        self.points.last().map(|p| p.equity)
    }
}
