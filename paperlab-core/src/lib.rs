//! paperlab core — the deterministic trading core.
//!
//! - Domain types (bars, positions, trades, equity rows)
//! - Market calendar with overnight sessions and per-date overrides
//! - Risk manager: drawdown/loss/volatility halts and ATR sizing
//! - Execution simulator with time-of-day cost profiles and deterministic
//!   partial fills
//! - Order lifecycle state machine and broker gateways with reconciliation
//! - The bar-stepping execution loop shared by backtests and the live path
//!
//! Backtests are single-threaded and synchronous: same inputs, byte-identical
//! outputs. All pseudo-randomness (fill ratios, rejections) is a pure
//! function of its inputs.

pub mod calendar;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod gateway;
pub mod orders;
pub mod reconcile;
pub mod risk;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types shared with a host worker thread are
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::EquityPoint>();
        require_sync::<domain::EquityPoint>();

        require_send::<calendar::Schedule>();
        require_sync::<calendar::Schedule>();

        require_send::<risk::RiskConfig>();
        require_sync::<risk::RiskConfig>();
        require_send::<risk::RiskManager>();
        require_sync::<risk::RiskManager>();
        require_send::<risk::HaltReason>();
        require_sync::<risk::HaltReason>();

        require_send::<execution::CostModelConfig>();
        require_sync::<execution::CostModelConfig>();
        require_send::<execution::ExecutionSimulator>();
        require_sync::<execution::ExecutionSimulator>();

        require_send::<orders::Order>();
        require_sync::<orders::Order>();
        require_send::<orders::OrderBook>();
        require_sync::<orders::OrderBook>();

        require_send::<engine::RuntimeEvent>();
        require_sync::<engine::RuntimeEvent>();
        require_send::<engine::RunParams>();
        require_sync::<engine::RunParams>();
    }
}
