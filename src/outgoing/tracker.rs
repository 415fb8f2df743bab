//! Pending Request Table
//!
//! A `DashMap` keyed by uppercased correlation id. Every settle operation goes through
//! `DashMap::remove`, which is the single arbiter between racing paths.

use super::types::TrackerOutcome;
use crate::error::CommandError;
use crate::message::types::ServiceMessage;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// One in-flight request.
#[derive(Debug)]
pub struct PendingRequest {
    pub correlation_id: String,
    pub message: ServiceMessage,
    pub started: Instant,
    pub ttl: Duration,
    /// `None` for asynchronous sends: nobody is waiting.
    completion: Option<oneshot::Sender<TrackerOutcome>>,
}

impl PendingRequest {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) > self.ttl
    }

    fn settle(self, outcome: TrackerOutcome) {
        if let Some(completion) = self.completion
            && completion.send(outcome).is_err()
        {
            tracing::debug!(
                "Caller for {} stopped waiting before the outcome arrived",
                self.correlation_id
            );
        }
    }
}

pub fn normalise_correlation_id(correlation_id: &str) -> String {
    correlation_id.trim().to_uppercase()
}

#[derive(Debug, Default)]
pub struct OutgoingTracker {
    pending: DashMap<String, PendingRequest>,
}

impl OutgoingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pending entry.
    ///
    /// # Returns
    /// * `Ok(Some(receiver))` for synchronous requests.
    /// * `Ok(None)` when `process_async` is set.
    /// * `Err(DuplicateCorrelation)` if the id is already pending. The existing entry is kept.
    pub fn register(
        &self,
        correlation_id: &str,
        message: ServiceMessage,
        ttl: Duration,
        process_async: bool,
    ) -> Result<Option<oneshot::Receiver<TrackerOutcome>>, CommandError> {
        let id = normalise_correlation_id(correlation_id);

        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => {
                tracing::error!("Duplicate correlation id {}", id);
                Err(CommandError::DuplicateCorrelation(id))
            }
            Entry::Vacant(slot) => {
                let (completion, receiver) = if process_async {
                    (None, None)
                } else {
                    let (tx, rx) = oneshot::channel();
                    (Some(tx), Some(rx))
                };

                slot.insert(PendingRequest {
                    correlation_id: id.clone(),
                    message,
                    started: Instant::now(),
                    ttl,
                    completion,
                });

                tracing::trace!("Tracking request {} (ttl {:?})", id, ttl);
                Ok(receiver)
            }
        }
    }

    /// Settles a request with its response.
    ///
    /// Unknown or already-settled ids are logged and dropped.
    pub fn complete(&self, correlation_id: &str, response: ServiceMessage) -> bool {
        let id = normalise_correlation_id(correlation_id);

        match self.pending.remove(&id) {
            Some((_, request)) => {
                tracing::debug!(
                    "Response for {} after {:?}",
                    id,
                    request.started.elapsed()
                );
                request.settle(TrackerOutcome::Response(response));
                true
            }
            None => {
                tracing::warn!(
                    "Unmatched response for {}: unknown or already expired",
                    id
                );
                false
            }
        }
    }

    /// Cancels a single request on behalf of its caller.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        let id = normalise_correlation_id(correlation_id);

        match self.pending.remove(&id) {
            Some((_, request)) => {
                tracing::debug!("Request {} cancelled by caller", id);
                request.settle(TrackerOutcome::Cancelled);
                true
            }
            None => false,
        }
    }

    /// Times out every request whose TTL has elapsed.
    ///
    /// # Returns
    /// The number of requests this sweep settled. Entries a response removed in the
    /// meantime are skipped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();

        // Collect first: removing while iterating a DashMap shard deadlocks.
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut settled = 0;
        for id in expired {
            if let Some((_, request)) = self.pending.remove(&id) {
                tracing::warn!(
                    "Request {} timed out after {:?} ({}/{}/{})",
                    id,
                    request.ttl,
                    request.message.channel_id,
                    request.message.message_type,
                    request.message.action_type
                );
                request.settle(TrackerOutcome::TimedOut);
                settled += 1;
            }
        }

        settled
    }

    /// Cancels everything still pending so no caller waits forever.
    pub fn shutdown(&self) -> usize {
        let ids: Vec<String> = self
            .pending
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let cancelled = ids.iter().filter(|id| self.cancel(id)).count();

        if cancelled > 0 {
            tracing::info!("Cancelled {} pending requests on shutdown", cancelled);
        }

        cancelled
    }

    pub fn contains(&self, correlation_id: &str) -> bool {
        self.pending
            .contains_key(&normalise_correlation_id(correlation_id))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
