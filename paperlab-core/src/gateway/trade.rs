//! Trade gateway: order placement, cancellation, and the local/remote merge.

use super::adapter::{
    AccountSnapshot, AdapterError, BrokerAdapter, OrderRequest, PositionFragment,
};
use super::reconnect::ReconnectPolicy;
use super::GatewayError;
use crate::orders::{normalize_remote_status, Order, OrderBook, OrderStatus};
use chrono::NaiveDateTime;
use std::time::Duration;
use tracing::{debug, warn};

/// Wraps a broker adapter's trading side.
///
/// Keeps an [`OrderBook`] of locally tracked orders and a **protection
/// mode** flag: while set, `place_order` is refused unconditionally. The
/// reconciler flips the flag whenever local and broker state disagree.
#[derive(Debug)]
pub struct TradeGateway<A> {
    adapter: A,
    connected: bool,
    last_error: Option<String>,
    protection_reason: Option<String>,
    orders: OrderBook,
}

impl<A: BrokerAdapter> TradeGateway<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            connected: false,
            last_error: None,
            protection_reason: None,
            orders: OrderBook::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_protection_mode(&mut self, on: bool, reason: &str) {
        if on {
            warn!(reason, "trade gateway entering protection mode");
            self.protection_reason = Some(reason.to_string());
        } else {
            if self.protection_reason.is_some() {
                debug!("trade gateway leaving protection mode");
            }
            self.protection_reason = None;
        }
    }

    pub fn protection_reason(&self) -> Option<&str> {
        self.protection_reason.as_deref()
    }

    pub fn local_orders(&self) -> &OrderBook {
        &self.orders
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    fn record<T>(&mut self, result: Result<T, AdapterError>) -> Result<T, GatewayError> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                Err(GatewayError::Adapter(err))
            }
        }
    }

    pub fn connect(&mut self) -> Result<(), GatewayError> {
        let result = self.adapter.connect();
        let outcome = self.record(result);
        self.connected = outcome.is_ok();
        outcome
    }

    pub fn connect_with_retry(
        &mut self,
        policy: &ReconnectPolicy,
        sleep: &mut dyn FnMut(Duration),
    ) -> Result<(), GatewayError> {
        let mut attempt = 0;
        loop {
            match self.connect() {
                Ok(()) => return Ok(()),
                Err(err) if attempt < policy.max_retries => {
                    let delay = policy.delay(attempt);
                    warn!(attempt, ?delay, %err, "trade connect failed, backing off");
                    sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn disconnect(&mut self) -> Result<(), GatewayError> {
        let result = self.adapter.disconnect();
        self.connected = false;
        self.record(result)
    }

    /// Place an order and track it locally.
    ///
    /// Refused while protection mode is active or the gateway is
    /// disconnected. The broker's raw acknowledgement status is normalized
    /// and applied to the fresh local record; an unknown status leaves it
    /// in `NEW`.
    pub fn place_order(
        &mut self,
        request: &OrderRequest,
        now: NaiveDateTime,
    ) -> Result<String, GatewayError> {
        if let Some(reason) = &self.protection_reason {
            return Err(GatewayError::ProtectionMode {
                reason: reason.clone(),
            });
        }
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        let result = self.adapter.place_order(request);
        let placed = self.record(result)?;

        self.orders.create(
            &placed.order_id,
            &request.symbol,
            request.direction,
            request.price,
            request.size,
            request.order_type,
            now,
        );
        match normalize_remote_status(&placed.status) {
            Some(status) if status != OrderStatus::New => {
                if let Err(err) =
                    self.orders
                        .adopt_remote(&placed.order_id, status, placed.filled, None, now)
                {
                    warn!(%err, "broker ack did not apply to local order");
                }
            }
            Some(_) => {}
            None => debug!(status = %placed.status, "unrecognized broker ack status"),
        }
        Ok(placed.order_id)
    }

    /// Cancel a tracked order.
    ///
    /// Orders already in a terminal state are refused locally without a
    /// broker round trip.
    pub fn cancel_order(&mut self, order_id: &str, now: NaiveDateTime) -> Result<(), GatewayError> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        if let Some(order) = self.orders.get(order_id) {
            if order.status.is_terminal() {
                return Err(GatewayError::OrderFinal {
                    order_id: order_id.to_string(),
                    status: order.status,
                });
            }
        }
        let result = self.adapter.cancel_order(order_id);
        self.record(result)?;
        if let Err(err) = self
            .orders
            .transition(order_id, OrderStatus::Canceling, None, None, now)
        {
            debug!(%err, "cancel accepted but local transition skipped");
        }
        Ok(())
    }

    pub fn query_positions(&mut self) -> Result<Vec<PositionFragment>, GatewayError> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        let result = self.adapter.query_positions();
        self.record(result)
    }

    pub fn query_account(&mut self) -> Result<AccountSnapshot, GatewayError> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        let result = self.adapter.query_account();
        self.record(result)
    }

    /// Merge the broker's order view into the local book and return it.
    ///
    /// Local terminal records win (their history is richer than a remote
    /// snapshot) while live records adopt the remote-reported fill and
    /// status. Remote orders never seen locally are adopted wholesale.
    pub fn query_orders(&mut self, now: NaiveDateTime) -> Result<Vec<Order>, GatewayError> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        let result = self.adapter.query_orders();
        let remote = self.record(result)?;

        for row in remote {
            let status = match normalize_remote_status(&row.status) {
                Some(status) => status,
                None => {
                    debug!(order_id = %row.order_id, status = %row.status, "unrecognized remote status");
                    continue;
                }
            };
            match self.orders.get(&row.order_id) {
                // Local terminal history is richer than a remote snapshot.
                Some(local) if local.status.is_terminal() => continue,
                Some(local) => {
                    if local.status == status && local.filled == row.filled {
                        continue;
                    }
                    let message = if row.message.is_empty() {
                        None
                    } else {
                        Some(row.message.as_str())
                    };
                    if let Err(err) =
                        self.orders
                            .adopt_remote(&row.order_id, status, row.filled, message, now)
                    {
                        warn!(%err, "remote status did not apply to local order");
                    }
                }
                None => {
                    self.orders.create(
                        &row.order_id,
                        &row.symbol,
                        row.direction,
                        row.price,
                        row.size,
                        crate::orders::OrderType::Limit,
                        now,
                    );
                    if status != OrderStatus::New {
                        if let Err(err) =
                            self.orders
                                .adopt_remote(&row.order_id, status, row.filled, None, now)
                        {
                            warn!(%err, "adopted remote order in inconsistent state");
                        }
                    }
                }
            }
        }
        Ok(self.orders.orders().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::gateway::sim::SimBrokerAdapter;
    use crate::orders::OrderType;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 31, 0)
            .unwrap()
    }

    fn request(size: f64) -> OrderRequest {
        OrderRequest {
            symbol: "M2609".into(),
            direction: Direction::Long,
            price: 3000.0,
            size,
            order_type: OrderType::Limit,
        }
    }

    fn connected_gateway(adapter: SimBrokerAdapter) -> TradeGateway<SimBrokerAdapter> {
        let mut gateway = TradeGateway::new(adapter);
        gateway.connect().unwrap();
        gateway
    }

    #[test]
    fn place_tracks_and_normalizes_ack() {
        let mut gateway = connected_gateway(SimBrokerAdapter::new());
        let order_id = gateway.place_order(&request(2.0), now()).unwrap();
        let order = gateway.local_orders().get(&order_id).unwrap();
        // "AllTraded" normalizes to FILLED with the full quantity.
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled, 2.0);
    }

    #[test]
    fn protection_mode_blocks_new_orders() {
        let mut gateway = connected_gateway(SimBrokerAdapter::new());
        gateway.set_protection_mode(true, "RECONCILE_MISMATCH");
        let err = gateway.place_order(&request(1.0), now()).unwrap_err();
        assert!(matches!(err, GatewayError::ProtectionMode { .. }));

        gateway.set_protection_mode(false, "");
        assert!(gateway.place_order(&request(1.0), now()).is_ok());
    }

    #[test]
    fn place_requires_connection() {
        let mut gateway = TradeGateway::new(SimBrokerAdapter::new());
        let err = gateway.place_order(&request(1.0), now()).unwrap_err();
        assert!(matches!(err, GatewayError::NotConnected));
    }

    #[test]
    fn cancel_of_terminal_order_is_refused_locally() {
        let mut gateway = connected_gateway(SimBrokerAdapter::new());
        let order_id = gateway.place_order(&request(1.0), now()).unwrap();
        let err = gateway.cancel_order(&order_id, now()).unwrap_err();
        assert!(matches!(err, GatewayError::OrderFinal { .. }));
    }

    #[test]
    fn cancel_of_live_order_goes_canceling() {
        let adapter = SimBrokerAdapter::new().with_report_status("NoTradeQueueing");
        let mut gateway = connected_gateway(adapter);
        let order_id = gateway.place_order(&request(1.0), now()).unwrap();
        assert_eq!(
            gateway.local_orders().get(&order_id).unwrap().status,
            OrderStatus::Acked
        );
        gateway.cancel_order(&order_id, now()).unwrap();
        assert_eq!(
            gateway.local_orders().get(&order_id).unwrap().status,
            OrderStatus::Canceling
        );
    }

    #[test]
    fn query_orders_merges_remote_into_local() {
        let adapter = SimBrokerAdapter::new().with_report_status("NoTradeQueueing");
        let mut gateway = connected_gateway(adapter);
        let order_id = gateway.place_order(&request(2.0), now()).unwrap();

        // Remote side cancels the order out from under us.
        gateway.adapter_mut().cancel_order(&order_id).unwrap();
        let merged = gateway.query_orders(now()).unwrap();
        let order = merged.iter().find(|o| o.order_id == order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
    }

    #[test]
    fn query_orders_adopts_unseen_remote_orders() {
        let mut adapter = SimBrokerAdapter::new();
        adapter.connect().unwrap();
        adapter.place_order(&request(1.0)).unwrap();
        adapter.disconnect().unwrap();

        let mut gateway = connected_gateway(adapter);
        let merged = gateway.query_orders(now()).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, OrderStatus::Filled);
    }

    #[test]
    fn local_terminal_history_survives_remote_view() {
        let adapter = SimBrokerAdapter::new();
        let mut gateway = connected_gateway(adapter);
        let order_id = gateway.place_order(&request(1.0), now()).unwrap();
        let before = gateway.local_orders().get(&order_id).unwrap().clone();

        let merged = gateway.query_orders(now()).unwrap();
        let after = merged.iter().find(|o| o.order_id == order_id).unwrap();
        assert_eq!(after, &before);
    }
}
