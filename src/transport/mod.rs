//! Transport Module
//!
//! Moves `ServiceMessage`s between command instances. The engine only ever talks to a
//! `Dispatcher`; inbound traffic arrives on an unbounded channel that a listener task
//! pumps into `Command::process_message`.
//!
//! ## Delivery Contract
//! - **Broadcast**: A submitted message reaches every connected instance, the sender
//!   included. Master job negotiation relies on hearing its own broadcasts.
//! - **Queued**: `submit` only enqueues. It must never call back into the sender
//!   synchronously.
//!
//! ## Submodules
//! - **`memory`**: `LocalBus`, an in-process pub/sub bus.
//! - **`udp`**: `UdpTransport`, bincode frames over UDP to a static peer list.

pub mod memory;
pub mod udp;

#[cfg(test)]
mod tests;

use crate::command::engine::Command;
use crate::message::types::ServiceMessage;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Outbound side of a transport. Fire-and-forget.
pub trait Dispatcher: Send + Sync {
    fn submit(&self, message: ServiceMessage) -> anyhow::Result<()>;
}

/// Feeds every inbound message into `command`, one task per message.
///
/// The listener stops when the transport drops its sender.
pub fn spawn_listener(
    command: Arc<Command>,
    mut inbound: mpsc::UnboundedReceiver<ServiceMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Listening for messages on behalf of '{}'", command.name());

        while let Some(message) = inbound.recv().await {
            let command = command.clone();
            tokio::spawn(async move {
                command.process_message(message).await;
            });
        }

        tracing::info!("Inbound channel of '{}' closed", command.name());
    })
}

