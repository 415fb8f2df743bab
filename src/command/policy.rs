use crate::negotiation::types::MasterJobPolicy;
use crate::router::registry::DEFAULT_CACHE_CAPACITY;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-command settings. Every field has a default so partial JSON files load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandPolicy {
    /// Channel replies to this command's requests are addressed to.
    pub response_channel_id: String,
    pub default_request_timeout_ms: u64,
    /// How often pending outgoing requests are checked for expiry.
    pub outgoing_sweep_interval_ms: u64,
    /// Enables `Command::send_blocking`.
    pub allow_blocking_send: bool,
    /// Most message headers the router remembers a resolution for.
    pub route_cache_capacity: usize,
    pub retry: RetryPolicy,
    pub master_job: MasterJobPolicy,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self {
            response_channel_id: "response".to_string(),
            default_request_timeout_ms: 30_000,
            outgoing_sweep_interval_ms: 1_000,
            allow_blocking_send: false,
            route_cache_capacity: DEFAULT_CACHE_CAPACITY,
            retry: RetryPolicy::default(),
            master_job: MasterJobPolicy::default(),
        }
    }
}

impl CommandPolicy {
    pub fn default_request_timeout(&self) -> Duration {
        Duration::from_millis(self.default_request_timeout_ms)
    }

    pub fn outgoing_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.outgoing_sweep_interval_ms.max(1))
    }
}

/// Backoff used by `Command::send_with_retry`. Only timeouts are retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            jitter_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}
