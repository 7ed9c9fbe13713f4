//! Trade — a completed round trip, immutable once written.

use super::position::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A closed round-trip trade.
///
/// Appended to the simulator's trade log on every exit or force-close;
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub filled_size: f64,
    pub contract_multiplier: f64,
    pub gross_pnl: f64,
    /// Round-trip commission: entry leg + exit leg.
    pub commission: f64,
    pub pnl: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub cost_profile: String,
    pub fill_ratio: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn trade_serialization_roundtrip() {
        let t0 = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 31, 0)
            .unwrap();
        let trade = Trade {
            symbol: "M2609".into(),
            direction: Direction::Long,
            entry_price: 3000.0,
            exit_price: 3010.0,
            filled_size: 2.0,
            contract_multiplier: 10.0,
            gross_pnl: 200.0,
            commission: 4.0,
            pnl: 196.0,
            entry_time: t0,
            exit_time: t0 + chrono::Duration::minutes(30),
            cost_profile: "default".into(),
            fill_ratio: 1.0,
        };
        let json = serde_json::to_string(&trade).unwrap();
        let deser: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
        assert!(trade.is_winner());
    }
}
