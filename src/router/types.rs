use crate::error::CommandError;
use crate::message::codec::PayloadCodec;
use crate::message::types::{RoutingKey, ServiceId, ServiceMessage, now_ms};

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Type alias for a thread-safe, asynchronous command handler.
///
/// The handler receives the inbound request and returns the messages it wants
/// dispatched (usually zero or one reply).
pub type HandlerFn = Arc<
    dyn Fn(CommandRequest) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceMessage>>> + Send>>
        + Send
        + Sync,
>;

/// Invoked with the failing request after the main handler returned an error or panicked.
pub type ErrorHandlerFn = Arc<dyn Fn(&ServiceMessage, &anyhow::Error) + Send + Sync>;

/// Wraps a closure returning a future into a type-erased `HandlerFn`.
pub fn handler_fn<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(CommandRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<ServiceMessage>>> + Send + 'static,
{
    Arc::new(move |request: CommandRequest| {
        Box::pin(handler(request)) as Pin<Box<dyn Future<Output = Result<Vec<ServiceMessage>>> + Send>>
    })
}

/// The context handed to a handler: the inbound message plus what it needs to reply.
#[derive(Clone)]
pub struct CommandRequest {
    pub message: ServiceMessage,
    pub service_id: ServiceId,
    pub codec: PayloadCodec,
}

impl CommandRequest {
    pub fn new(message: ServiceMessage, service_id: ServiceId, codec: PayloadCodec) -> Self {
        Self {
            message,
            service_id,
            codec,
        }
    }

    /// Decodes the request blob.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        self.codec.deserialize(&self.message.blob)
    }

    /// Builds a reply carrying `body`. `None` when the sender did not ask for a reply.
    pub fn reply<T: Serialize>(
        &self,
        status: u16,
        description: &str,
        body: &T,
    ) -> Result<Option<ServiceMessage>, CommandError> {
        let blob = self.codec.serialize(body)?;
        Ok(self
            .message
            .reply(&self.service_id, status, description)
            .map(|reply| reply.with_blob(blob)))
    }

    /// Builds a reply without a body.
    pub fn reply_status(&self, status: u16, description: &str) -> Option<ServiceMessage> {
        self.message.reply(&self.service_id, status, description)
    }
}

/// Usage counters, updated concurrently by dispatching tasks.
#[derive(Debug, Default)]
pub struct HandlerCounters {
    invocations: AtomicU64,
    failures: AtomicU64,
    last_invoked_ms: AtomicU64,
}

impl HandlerCounters {
    pub fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.last_invoked_ms.store(now_ms(), Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// A registered handler and its routing metadata.
pub struct HandlerEntry {
    pub key: RoutingKey,
    pub handler: HandlerFn,
    pub error_handler: Option<ErrorHandlerFn>,
    pub reference_id: Option<String>,
    pub is_master_job: bool,
    pub counters: HandlerCounters,
}

impl HandlerEntry {
    pub fn statistics(&self) -> HandlerStatistics {
        HandlerStatistics {
            key: self.key.to_string(),
            reference_id: self.reference_id.clone(),
            is_master_job: self.is_master_job,
            invocations: self.counters.invocations(),
            failures: self.counters.failures(),
            last_invoked_ms: match self.counters.last_invoked_ms.load(Ordering::Relaxed) {
                0 => None,
                ms => Some(ms),
            },
        }
    }
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("key", &self.key)
            .field("reference_id", &self.reference_id)
            .field("is_master_job", &self.is_master_job)
            .finish_non_exhaustive()
    }
}

/// A handler kept aside until it is registered, e.g. master-only commands that are
/// only routed while this instance holds mastership.
#[derive(Clone)]
pub struct CommandDefinition {
    pub key: RoutingKey,
    pub handler: HandlerFn,
    pub error_handler: Option<ErrorHandlerFn>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandlerStatistics {
    pub key: String,
    pub reference_id: Option<String>,
    pub is_master_job: bool,
    pub invocations: u64,
    pub failures: u64,
    pub last_invoked_ms: Option<u64>,
}
