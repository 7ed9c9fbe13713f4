//! Rolling true-range window backing the risk manager's ATR.

use crate::domain::Bar;
use std::collections::VecDeque;

/// Fixed-size window of true-range values averaged into an ATR.
///
/// Returns `None` until the window has filled; sizing falls back to the
/// capital-fraction rule until then.
#[derive(Debug, Clone)]
pub struct AtrWindow {
    period: usize,
    values: VecDeque<f64>,
}

impl AtrWindow {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            values: VecDeque::with_capacity(period),
        }
    }

    /// Push the true range of the latest bar (needs its predecessor for the
    /// gap terms) and return the current ATR, if the window is full.
    pub fn update(&mut self, bars: &[Bar]) -> Option<f64> {
        if bars.len() < 2 {
            return None;
        }
        let current = &bars[bars.len() - 1];
        let prev_close = bars[bars.len() - 2].close;
        self.values.push_back(current.true_range(prev_close));
        if self.values.len() > self.period {
            self.values.pop_front();
        }
        self.current()
    }

    pub fn current(&self) -> Option<f64> {
        if self.values.len() < self.period {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }
}
