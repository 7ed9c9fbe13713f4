//! Broker gateways: adapter trait, reconnect policy, market-data and trade
//! wrappers, and the in-process simulator adapter.

pub mod adapter;
pub mod market_data;
pub mod reconnect;
pub mod sim;
pub mod trade;

pub use adapter::{
    AccountSnapshot, AdapterError, BrokerAdapter, OrderRequest, PlacedOrder, PositionFragment,
    RemoteOrder,
};
pub use market_data::MarketDataGateway;
pub use reconnect::ReconnectPolicy;
pub use sim::SimBrokerAdapter;
pub use trade::TradeGateway;

use crate::orders::OrderStatus;
use thiserror::Error;

/// Gateway-level failures surfaced to the live loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("gateway not connected")]
    NotConnected,

    #[error("protection mode active: {reason}")]
    ProtectionMode { reason: String },

    #[error("order {order_id} already final ({status})")]
    OrderFinal {
        order_id: String,
        status: OrderStatus,
    },

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}
