//! Bounded-retry backoff for broker reconnection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry schedule: `delay(attempt) = min(base * (attempt + 1), max)`,
/// with a hard retry ceiling. Exhausting the ceiling is a cycle-level
/// failure for the caller, not a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        (self.base_delay * (attempt + 1)).min(self.max_delay)
    }
}
