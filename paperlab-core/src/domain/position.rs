//! Direction, strategy signal, and the single open position.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of an open position or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Sign applied to price moves when computing pnl: +1 long, -1 short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Discrete strategy output for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Short,
    Flat,
    Long,
}

impl Signal {
    pub fn from_i8(value: i8) -> Self {
        match value {
            v if v > 0 => Signal::Long,
            v if v < 0 => Signal::Short,
            _ => Signal::Flat,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }

    /// Direction this signal opens, `None` for flat.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Signal::Long => Some(Direction::Long),
            Signal::Short => Some(Direction::Short),
            Signal::Flat => None,
        }
    }
}

/// The one open position a run may hold.
///
/// Created by a successful order, destroyed by an exit or force-close.
/// Owned exclusively by the execution simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    /// Size the sizing logic asked for.
    pub requested_size: f64,
    /// Size actually executed (requested × fill ratio).
    pub filled_size: f64,
    pub contract_multiplier: f64,
    pub stop_price: Option<f64>,
    pub take_profit: Option<f64>,
    pub entry_time: NaiveDateTime,
    /// Cost profile active at entry; frozen for the life of the position.
    pub cost_profile: String,
}

impl Position {
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) * self.filled_size * self.contract_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_position(direction: Direction) -> Position {
        Position {
            symbol: "M2609".into(),
            direction,
            entry_price: 3000.0,
            requested_size: 2.0,
            filled_size: 2.0,
            contract_multiplier: 10.0,
            stop_price: Some(2980.0),
            take_profit: None,
            entry_time: NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(9, 31, 0)
                .unwrap(),
            cost_profile: "default".into(),
        }
    }

    #[test]
    fn signal_maps_to_direction() {
        assert_eq!(Signal::from_i8(1).direction(), Some(Direction::Long));
        assert_eq!(Signal::from_i8(-3).direction(), Some(Direction::Short));
        assert_eq!(Signal::from_i8(0).direction(), None);
    }

    #[test]
    fn unrealized_pnl_respects_direction() {
        let long = sample_position(Direction::Long);
        assert_eq!(long.unrealized_pnl(3001.0), 20.0);

        let short = sample_position(Direction::Short);
        assert_eq!(short.unrealized_pnl(3001.0), -20.0);
    }
}
