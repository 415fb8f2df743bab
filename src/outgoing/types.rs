use crate::message::types::ServiceMessage;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const STATUS_OK: u16 = 200;
pub const STATUS_ACCEPTED: u16 = 202;
pub const STATUS_TIMEOUT: u16 = 408;
/// The caller cancelled the wait before a response or timeout.
pub const STATUS_CANCELLED: u16 = 499;
pub const STATUS_FAULT: u16 = 500;

/// How a request leaves the command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingOptions {
    /// Through the dispatcher onto the transport.
    #[default]
    External,
    /// Straight back into this command's own router.
    Internal,
}

/// Per-request options for `Command::send`.
#[derive(Debug, Clone, Default)]
pub struct RequestSettings {
    /// Use this correlation id instead of the generated originator key.
    pub correlation_id_override: Option<String>,
    /// Time-to-live of the pending entry. Falls back to the command policy.
    pub wait_time: Option<Duration>,
    /// Return `202 Accepted` immediately instead of waiting for the response.
    pub process_async: bool,
    pub routing: RoutingOptions,
    pub priority: Option<u8>,
    /// Cancels the wait. The request resolves with `STATUS_CANCELLED`.
    pub cancel: Option<CancellationToken>,
}

impl RequestSettings {
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = Some(wait_time);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        self.correlation_id_override = Some(correlation_id.to_string());
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.process_async = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.routing = RoutingOptions::Internal;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// The single outcome a pending request settles with.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerOutcome {
    Response(ServiceMessage),
    TimedOut,
    Cancelled,
}

/// Result of `Command::send`: a status for every expected failure, plus the decoded
/// response on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub correlation_id: String,
    pub status_code: u16,
    pub status_message: String,
    pub response: Option<T>,
}

impl<T> CommandResponse<T> {
    pub fn new(correlation_id: &str, status_code: u16, status_message: &str) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            status_code,
            status_message: status_message.to_string(),
            response: None,
        }
    }

    pub fn with_response(mut self, response: T) -> Self {
        self.response = Some(response);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_timeout(&self) -> bool {
        self.status_code == STATUS_TIMEOUT
    }
}
