use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings for the quoting engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotingConfig {
    /// Lifetime of a reference-data cache entry.
    pub cache_ttl_seconds: u64,
    /// Delivery attempts per error callback. `1` means no retry.
    pub error_callback_attempts: u32,
    /// Upper bound on concurrently running background tasks; unbounded if unset.
    pub max_in_flight: Option<usize>,
    pub outbound_timeout_ms: u64,
    /// Participant name used as `FSPIOP-Source` on switch-originated callbacks.
    pub switch_id: String,
}

impl Default for QuotingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 60,
            error_callback_attempts: 1,
            max_in_flight: None,
            outbound_timeout_ms: 10_000,
            switch_id: "switch".to_string(),
        }
    }
}

impl QuotingConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_millis(self.outbound_timeout_ms)
    }
}
