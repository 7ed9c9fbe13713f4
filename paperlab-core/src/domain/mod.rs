//! Domain types: bars, positions, trades, equity rows.

pub mod bar;
pub mod equity;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use equity::{EquityCurve, EquityPoint};
pub use position::{Direction, Position, Signal};
pub use trade::Trade;
