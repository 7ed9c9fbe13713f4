//! Reconciliation between locally tracked state and the broker's view.
//!
//! The diff functions are pure; [`Reconciler`] drives one cycle against a
//! trade gateway and flips its protection mode on any mismatch.

use crate::gateway::{AccountSnapshot, BrokerAdapter, GatewayError, PositionFragment, TradeGateway};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Net signed quantity per symbol across broker position fragments.
pub fn summarize_positions(fragments: &[PositionFragment]) -> BTreeMap<String, f64> {
    let mut summary = BTreeMap::new();
    for fragment in fragments {
        *summary.entry(fragment.symbol.clone()).or_insert(0.0) += fragment.qty;
    }
    summary
}

/// A quantity disagreement for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QtyDiff {
    pub local: f64,
    pub broker: f64,
}

/// Symbols where local and broker quantities disagree.
///
/// A symbol missing on one side counts as zero there, so a flat local book
/// matches an absent broker entry and vice versa.
pub fn diff_positions(
    local: &BTreeMap<String, f64>,
    broker: &BTreeMap<String, f64>,
) -> BTreeMap<String, QtyDiff> {
    let mut diffs = BTreeMap::new();
    for (symbol, &broker_qty) in broker {
        let local_qty = local.get(symbol).copied().unwrap_or(0.0);
        if local_qty != broker_qty {
            diffs.insert(
                symbol.clone(),
                QtyDiff {
                    local: local_qty,
                    broker: broker_qty,
                },
            );
        }
    }
    for (symbol, &local_qty) in local {
        if !broker.contains_key(symbol) && local_qty != 0.0 {
            diffs.insert(
                symbol.clone(),
                QtyDiff {
                    local: local_qty,
                    broker: 0.0,
                },
            );
        }
    }
    diffs
}

/// A field-level account disagreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDiff {
    pub local: Option<Value>,
    pub broker: Option<Value>,
}

/// Account fields where the two snapshots disagree.
///
/// Numeric fields compare within `tolerance`; everything else requires
/// exact equality. A field present on only one side always diffs.
pub fn diff_account(
    local: &AccountSnapshot,
    broker: &AccountSnapshot,
    tolerance: f64,
) -> BTreeMap<String, ValueDiff> {
    let mut diffs = BTreeMap::new();
    let keys: std::collections::BTreeSet<&String> = local.keys().chain(broker.keys()).collect();
    for key in keys {
        let lv = local.get(key);
        let bv = broker.get(key);
        let equal = match (lv, bv) {
            (Some(l), Some(b)) => match (l.as_f64(), b.as_f64()) {
                (Some(lf), Some(bf)) => (lf - bf).abs() <= tolerance,
                _ => l == b,
            },
            _ => false,
        };
        if !equal {
            diffs.insert(
                key.clone(),
                ValueDiff {
                    local: lv.cloned(),
                    broker: bv.cloned(),
                },
            );
        }
    }
    diffs
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub position_diffs: BTreeMap<String, QtyDiff>,
    pub account_diffs: BTreeMap<String, ValueDiff>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.position_diffs.is_empty() && self.account_diffs.is_empty()
    }
}

/// Compares local state against a broker snapshot each live cycle.
#[derive(Debug, Clone)]
pub struct Reconciler {
    tolerance: f64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

impl Reconciler {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Query the broker through `gateway`, diff against the local view, and
    /// flip protection mode accordingly: any mismatch blocks new orders
    /// until a later cycle comes back clean.
    pub fn run_cycle<A: BrokerAdapter>(
        &self,
        local_positions: &BTreeMap<String, f64>,
        local_account: &AccountSnapshot,
        gateway: &mut TradeGateway<A>,
    ) -> Result<ReconcileReport, GatewayError> {
        let fragments = gateway.query_positions()?;
        let broker_positions = summarize_positions(&fragments);
        let broker_account = gateway.query_account()?;

        let report = ReconcileReport {
            position_diffs: diff_positions(local_positions, &broker_positions),
            account_diffs: diff_account(local_account, &broker_account, self.tolerance),
        };

        if report.is_clean() {
            gateway.set_protection_mode(false, "");
            info!("reconciliation clean");
        } else {
            warn!(
                position_diffs = report.position_diffs.len(),
                account_diffs = report.account_diffs.len(),
                "reconciliation mismatch"
            );
            gateway.set_protection_mode(true, "RECONCILE_MISMATCH");
        }
        Ok(report)
    }
}
