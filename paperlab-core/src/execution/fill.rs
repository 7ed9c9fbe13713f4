//! Deterministic fill-ratio and rejection draws.
//!
//! Backtests must be byte-identical across runs, but partial fills and
//! random rejection still need to look random. Each draw is a pure function
//! of `(symbol, direction, size, timestamp, profile, label)`: the tuple is
//! hashed with BLAKE3 into a seed, the seed drives a `StdRng`, and the first
//! sample is the draw. Same inputs, same outcome, independent of call order.

use crate::domain::Direction;
use crate::execution::cost_model::CostProfile;
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Outcome of the venue simulation for one order attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillDraw {
    pub rejected: bool,
    pub fill_ratio: f64,
}

fn draw_seed(
    symbol: &str,
    direction: Direction,
    size: f64,
    timestamp: NaiveDateTime,
    profile: &str,
    label: &str,
) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&[match direction {
        Direction::Long => b'L',
        Direction::Short => b'S',
    }]);
    hasher.update(&size.to_le_bytes());
    hasher.update(&timestamp.and_utc().timestamp().to_le_bytes());
    hasher.update(profile.as_bytes());
    hasher.update(label.as_bytes());
    let hash = hasher.finalize();
    u64::from_le_bytes(hash.as_bytes()[..8].try_into().unwrap())
}

/// One uniform sample in `[0, 1)` for a labelled draw.
fn uniform(
    symbol: &str,
    direction: Direction,
    size: f64,
    timestamp: NaiveDateTime,
    profile: &str,
    label: &str,
) -> f64 {
    let seed = draw_seed(symbol, direction, size, timestamp, profile, label);
    StdRng::seed_from_u64(seed).gen::<f64>()
}

/// Evaluate rejection and fill ratio for an order attempt under `profile`.
///
/// The two decisions use independently labelled draws so enabling or
/// disabling rejection never perturbs the fill ratios of accepted orders.
pub fn evaluate_fill(
    symbol: &str,
    direction: Direction,
    size: f64,
    timestamp: NaiveDateTime,
    profile: &CostProfile,
) -> FillDraw {
    if profile.reject_probability > 0.0 {
        let u = uniform(symbol, direction, size, timestamp, &profile.name, "reject");
        if u < profile.reject_probability {
            return FillDraw {
                rejected: true,
                fill_ratio: 0.0,
            };
        }
    }
    let fill_ratio = if profile.fill_ratio_max > profile.fill_ratio_min {
        let u = uniform(symbol, direction, size, timestamp, &profile.name, "fill");
        profile.fill_ratio_min + u * (profile.fill_ratio_max - profile.fill_ratio_min)
    } else {
        profile.fill_ratio_min
    };
    FillDraw {
        rejected: false,
        fill_ratio,
    }
}
