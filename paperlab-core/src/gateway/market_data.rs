//! Market-data gateway: connect, subscribe, reconnect.

use super::adapter::{AdapterError, BrokerAdapter};
use super::reconnect::ReconnectPolicy;
use super::GatewayError;
use std::time::Duration;
use tracing::warn;

/// Wraps a broker adapter's market-data side.
///
/// Tracks connection state and the last transport error; never places
/// orders.
#[derive(Debug)]
pub struct MarketDataGateway<A> {
    adapter: A,
    connected: bool,
    last_error: Option<String>,
}

impl<A: BrokerAdapter> MarketDataGateway<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            connected: false,
            last_error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
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

    /// Connect with the bounded backoff schedule. `sleep` is injected so
    /// tests (and hosts with their own timers) control the waiting.
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
                    warn!(attempt, ?delay, %err, "market-data connect failed, backing off");
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

    pub fn subscribe(&mut self, symbols: &[String]) -> Result<(), GatewayError> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        let result = self.adapter.subscribe(symbols);
        self.record(result)
    }
}
