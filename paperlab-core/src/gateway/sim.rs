//! In-process broker simulator.
//!
//! Implements the full adapter capability set against local state: orders
//! fill immediately with a configurable report status, positions and the
//! account snapshot are plain fields. Used by the paper mode and by tests;
//! also the reference for what a real SDK adapter must provide.

use super::adapter::{
    AccountSnapshot, AdapterError, BrokerAdapter, OrderRequest, PlacedOrder, PositionFragment,
    RemoteOrder,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SimBrokerAdapter {
    connect_failures_remaining: u32,
    connected: bool,
    next_order_seq: u64,
    orders: Vec<RemoteOrder>,
    positions: BTreeMap<String, f64>,
    account: AccountSnapshot,
    /// Raw status reported for every placed order; CTP vocabulary by default.
    report_status: Option<String>,
}

impl SimBrokerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` connect attempts with a transport error.
    pub fn with_connect_failures(n: u32) -> Self {
        Self {
            connect_failures_remaining: n,
            ..Self::default()
        }
    }

    /// Override the raw status string reported for placed orders.
    pub fn with_report_status(mut self, status: &str) -> Self {
        self.report_status = Some(status.to_string());
        self
    }

    pub fn set_account(&mut self, account: AccountSnapshot) {
        self.account = account;
    }

    pub fn set_position(&mut self, symbol: &str, qty: f64) {
        self.positions.insert(symbol.to_string(), qty);
    }

    fn require_connected(&self) -> Result<(), AdapterError> {
        if self.connected {
            Ok(())
        } else {
            Err(AdapterError::Transport("not connected".into()))
        }
    }
}

impl BrokerAdapter for SimBrokerAdapter {
    fn connect(&mut self) -> Result<(), AdapterError> {
        if self.connect_failures_remaining > 0 {
            self.connect_failures_remaining -= 1;
            return Err(AdapterError::Transport("simulated connect failure".into()));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), AdapterError> {
        self.connected = false;
        Ok(())
    }

    fn subscribe(&mut self, _symbols: &[String]) -> Result<(), AdapterError> {
        self.require_connected()
    }

    fn place_order(&mut self, request: &OrderRequest) -> Result<PlacedOrder, AdapterError> {
        self.require_connected()?;
        self.next_order_seq += 1;
        let order_id = format!("SIM{:08}", self.next_order_seq);
        let status = self
            .report_status
            .clone()
            .unwrap_or_else(|| "AllTraded".to_string());
        let filled = if status == "AllTraded" { request.size } else { 0.0 };
        self.orders.push(RemoteOrder {
            order_id: order_id.clone(),
            symbol: request.symbol.clone(),
            direction: request.direction,
            price: request.price,
            size: request.size,
            filled,
            status: status.clone(),
            message: String::new(),
        });
        if filled > 0.0 {
            let qty = self.positions.entry(request.symbol.clone()).or_insert(0.0);
            *qty += request.direction.sign() * filled;
        }
        Ok(PlacedOrder {
            order_id,
            status,
            filled,
        })
    }

    fn cancel_order(&mut self, order_id: &str) -> Result<(), AdapterError> {
        self.require_connected()?;
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| AdapterError::Refused(format!("unknown order {order_id}")))?;
        if matches!(order.status.as_str(), "AllTraded" | "AllCanceled" | "InsertRejected") {
            return Err(AdapterError::Refused(format!(
                "order {order_id} already final ({})",
                order.status
            )));
        }
        order.status = "AllCanceled".to_string();
        Ok(())
    }

    fn query_positions(&mut self) -> Result<Vec<PositionFragment>, AdapterError> {
        self.require_connected()?;
        Ok(self
            .positions
            .iter()
            .map(|(symbol, qty)| PositionFragment {
                symbol: symbol.clone(),
                qty: *qty,
            })
            .collect())
    }

    fn query_orders(&mut self) -> Result<Vec<RemoteOrder>, AdapterError> {
        self.require_connected()?;
        Ok(self.orders.clone())
    }

    fn query_account(&mut self) -> Result<AccountSnapshot, AdapterError> {
        self.require_connected()?;
        Ok(self.account.clone())
    }
}
