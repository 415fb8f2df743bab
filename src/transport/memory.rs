//! In-Process Bus
//!
//! Every endpoint connected to a `LocalBus` receives every message submitted through
//! any endpoint, its own included. Used to run several command instances inside one
//! process.

use super::Dispatcher;
use crate::message::types::{ServiceId, ServiceMessage};

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone, Default)]
pub struct LocalBus {
    endpoints: Arc<DashMap<ServiceId, mpsc::UnboundedSender<ServiceMessage>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an instance. Reconnecting an id replaces its previous inbound channel.
    pub fn connect(
        &self,
        service_id: &ServiceId,
    ) -> (Arc<LocalDispatcher>, mpsc::UnboundedReceiver<ServiceMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.endpoints.insert(service_id.clone(), tx);

        tracing::debug!(
            "Endpoint {} connected ({} on bus)",
            service_id,
            self.endpoints.len()
        );

        let dispatcher = Arc::new(LocalDispatcher {
            bus: self.clone(),
            service_id: service_id.clone(),
        });

        (dispatcher, rx)
    }

    pub fn disconnect(&self, service_id: &ServiceId) -> bool {
        self.endpoints.remove(service_id).is_some()
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    fn publish(&self, message: &ServiceMessage) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.endpoints.iter() {
            if entry.value().send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(entry.key().clone());
            }
        }

        for service_id in closed {
            tracing::debug!("Dropping closed endpoint {}", service_id);
            self.endpoints.remove(&service_id);
        }

        delivered
    }
}

/// The sending half handed to one command.
pub struct LocalDispatcher {
    bus: LocalBus,
    service_id: ServiceId,
}

impl LocalDispatcher {
    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }
}

impl Dispatcher for LocalDispatcher {
    fn submit(&self, message: ServiceMessage) -> anyhow::Result<()> {
        let delivered = self.bus.publish(&message);

        tracing::trace!(
            "{} published {}/{}/{} to {} endpoint(s)",
            self.service_id,
            message.channel_id,
            message.message_type,
            message.action_type,
            delivered
        );

        Ok(())
    }
}
