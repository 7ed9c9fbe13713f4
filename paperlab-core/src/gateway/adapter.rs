//! The pluggable broker capability surface.
//!
//! An adapter may be a local simulator or a real exchange SDK; the core only
//! calls through this trait. Calls are blocking (bounding latency is the
//! adapter's job) and the gateway layer only distinguishes success from
//! failure.

use crate::domain::Direction;
use crate::orders::OrderType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Transport-level failure from a broker call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request refused by broker: {0}")]
    Refused(String),
}

/// One position fragment as the broker reports it. Quantity is signed;
/// a symbol may appear in several fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFragment {
    pub symbol: String,
    pub qty: f64,
}

/// Broker account snapshot: heterogeneous scalar fields.
pub type AccountSnapshot = BTreeMap<String, serde_json::Value>;

/// Order placement request sent through the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub direction: Direction,
    pub price: f64,
    pub size: f64,
    pub order_type: OrderType,
}

/// Broker acknowledgement for a placed order. `status` is the broker's raw
/// vocabulary; the trade gateway normalizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: String,
    pub status: String,
    pub filled: f64,
}

/// One order as the broker reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub order_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub price: f64,
    pub size: f64,
    pub filled: f64,
    pub status: String,
    pub message: String,
}

/// Capability set every broker integration provides.
pub trait BrokerAdapter {
    fn connect(&mut self) -> Result<(), AdapterError>;
    fn disconnect(&mut self) -> Result<(), AdapterError>;
    fn subscribe(&mut self, symbols: &[String]) -> Result<(), AdapterError>;
    fn place_order(&mut self, request: &OrderRequest) -> Result<PlacedOrder, AdapterError>;
    fn cancel_order(&mut self, order_id: &str) -> Result<(), AdapterError>;
    fn query_positions(&mut self) -> Result<Vec<PositionFragment>, AdapterError>;
    fn query_orders(&mut self) -> Result<Vec<RemoteOrder>, AdapterError>;
    fn query_account(&mut self) -> Result<AccountSnapshot, AdapterError>;
}
