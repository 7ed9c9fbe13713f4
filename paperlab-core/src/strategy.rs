//! Strategy capability interface.
//!
//! Strategies are external to the core: the loop only needs a signal per
//! bar plus two lifecycle hooks, both no-ops by default. The interface is
//! resolved at construction, with no per-call capability probing.

use crate::domain::Signal;

pub trait Strategy {
    /// Decide on a bar given the close-price history up to and including it.
    fn signal(&mut self, closes: &[f64], step: usize) -> Signal;

    /// Called after a trade closes with its realized pnl.
    fn on_trade_close(&mut self, _pnl: f64, _step: usize) {}

    /// Called on the first bar of each trading day.
    fn on_new_day(&mut self) {}
}
