//! Time-of-day cost profiles: slippage, commission scaling, fill behavior.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Execution-cost assumptions for one slice of the trading day.
///
/// The window is half-open `[start, end)` and may wrap midnight
/// (`start > end`). A profile without a window matches any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostProfile {
    pub name: String,
    pub window: Option<(NaiveTime, NaiveTime)>,
    /// Absolute price shift applied against the trader.
    pub slippage: f64,
    pub commission_multiplier: f64,
    pub fill_ratio_min: f64,
    pub fill_ratio_max: f64,
    pub reject_probability: f64,
}

impl CostProfile {
    /// An always-matching profile with full fills and no rejection.
    pub fn flat(name: &str, slippage: f64) -> Self {
        Self {
            name: name.to_string(),
            window: None,
            slippage,
            commission_multiplier: 1.0,
            fill_ratio_min: 1.0,
            fill_ratio_max: 1.0,
            reject_probability: 0.0,
        }
    }

    pub fn applies_at(&self, t: NaiveTime) -> bool {
        match self.window {
            None => true,
            Some((start, end)) if start <= end => t >= start && t < end,
            Some((start, end)) => t >= start || t < end,
        }
    }
}

/// Ordered profile list plus the fallback; first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModelConfig {
    pub profiles: Vec<CostProfile>,
    pub default: CostProfile,
}

impl CostModelConfig {
    pub fn frictionless() -> Self {
        Self {
            profiles: Vec::new(),
            default: CostProfile::flat("default", 0.0),
        }
    }

    pub fn with_default(default: CostProfile) -> Self {
        Self {
            profiles: Vec::new(),
            default,
        }
    }

    /// Profile in effect at `t`: first window containing it, else the default.
    pub fn resolve(&self, t: NaiveTime) -> &CostProfile {
        self.profiles
            .iter()
            .find(|p| p.applies_at(t))
            .unwrap_or(&self.default)
    }

    /// Look up a profile by the name recorded on a position at entry.
    pub fn by_name(&self, name: &str) -> &CostProfile {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .unwrap_or(&self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn model() -> CostModelConfig {
        CostModelConfig {
            profiles: vec![
                CostProfile {
                    name: "open_auction".into(),
                    window: Some((t(9, 0), t(9, 30))),
                    slippage: 2.0,
                    commission_multiplier: 1.5,
                    fill_ratio_min: 0.6,
                    fill_ratio_max: 0.9,
                    reject_probability: 0.05,
                },
                CostProfile {
                    name: "night".into(),
                    window: Some((t(21, 0), t(2, 30))),
                    slippage: 1.5,
                    commission_multiplier: 1.2,
                    fill_ratio_min: 0.8,
                    fill_ratio_max: 1.0,
                    reject_probability: 0.02,
                },
            ],
            default: CostProfile::flat("default", 1.0),
        }
    }

    #[test]
    fn first_match_wins_and_default_falls_back() {
        let m = model();
        assert_eq!(m.resolve(t(9, 15)).name, "open_auction");
        assert_eq!(m.resolve(t(10, 0)).name, "default");
    }

    #[test]
    fn window_end_is_exclusive() {
        let m = model();
        assert_eq!(m.resolve(t(9, 30)).name, "default");
        assert_eq!(m.resolve(t(9, 0)).name, "open_auction");
    }

    #[test]
    fn wrapping_window_covers_both_sides_of_midnight() {
        let m = model();
        assert_eq!(m.resolve(t(23, 0)).name, "night");
        assert_eq!(m.resolve(t(1, 0)).name, "night");
        assert_eq!(m.resolve(t(2, 30)).name, "default");
    }

    #[test]
    fn by_name_resolves_entry_profile() {
        let m = model();
        assert_eq!(m.by_name("night").commission_multiplier, 1.2);
        assert_eq!(m.by_name("missing").name, "default");
    }
}
