//! UDP Transport
//!
//! Broadcasts each `ServiceMessage` as one bincode-encoded datagram to every known peer
//! and to its own socket, so the sender hears its own traffic like everyone else.
//!
//! ## Tasks
//! - **Send loop**: Drains the outbound queue filled by `submit`.
//! - **Receive loop**: Decodes datagrams and forwards them to the inbound channel.

use super::Dispatcher;
use crate::message::types::ServiceMessage;

use anyhow::{Context, Result};
use dashmap::DashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Largest payload a single IPv4 UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_507;

pub struct UdpTransport {
    local_addr: SocketAddr,
    socket: Arc<UdpSocket>,
    peers: DashSet<SocketAddr>,
    outbound: mpsc::UnboundedSender<ServiceMessage>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<ServiceMessage>>>,
}

impl UdpTransport {
    pub async fn bind(bind_addr: SocketAddr, peers: Vec<SocketAddr>) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .with_context(|| format!("binding UDP transport to {}", bind_addr))?;
        let local_addr = socket.local_addr()?;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let transport = Arc::new(Self {
            local_addr,
            socket: Arc::new(socket),
            peers: DashSet::new(),
            outbound,
            outbound_rx: Mutex::new(Some(outbound_rx)),
        });

        for peer in peers {
            transport.add_peer(peer);
        }

        tracing::info!(
            "UDP transport bound to {} with {} peer(s)",
            local_addr,
            transport.peers.len()
        );

        Ok(transport)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn add_peer(&self, peer: SocketAddr) {
        if peer != self.local_addr && self.peers.insert(peer) {
            tracing::info!("Added peer {}", peer);
        }
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        let mut peers: Vec<SocketAddr> = self.peers.iter().map(|peer| *peer).collect();
        peers.sort();
        peers
    }

    /// Spawns the send and receive loops and returns the inbound channel.
    ///
    /// # Errors
    /// Fails if the transport was already started.
    pub fn start(self: Arc<Self>) -> Result<mpsc::UnboundedReceiver<ServiceMessage>> {
        let outbound_rx = self
            .outbound_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .context("UDP transport already started")?;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let _send_handle = {
            let transport = self.clone();
            tokio::spawn(async move {
                transport.send_loop(outbound_rx).await;
            })
        };

        let _receive_handle = {
            let transport = self.clone();
            tokio::spawn(async move {
                transport.receive_loop(inbound_tx).await;
            })
        };

        tracing::info!("UDP transport started on {}", self.local_addr);
        Ok(inbound_rx)
    }

    async fn send_loop(self: Arc<Self>, mut outbound: mpsc::UnboundedReceiver<ServiceMessage>) {
        while let Some(message) = outbound.recv().await {
            let encoded = match bincode::serialize(&message) {
                Ok(encoded) => encoded,
                Err(e) => {
                    tracing::error!("Failed to encode message {}: {}", message.originator_key, e);
                    continue;
                }
            };

            if encoded.len() > MAX_DATAGRAM {
                tracing::warn!(
                    "Message {} is {} bytes, too large for one datagram; dropped",
                    message.originator_key,
                    encoded.len()
                );
                continue;
            }

            let mut targets = self.peers();
            targets.push(self.local_addr);

            for target in targets {
                if let Err(e) = self.socket.send_to(&encoded, target).await {
                    tracing::warn!("Failed to send to {}: {}", target, e);
                }
            }
        }

        tracing::debug!("Outbound queue of {} closed", self.local_addr);
    }

    async fn receive_loop(self: Arc<Self>, inbound: mpsc::UnboundedSender<ServiceMessage>) {
        let mut buf = vec![0u8; 65_536];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, src)) => match bincode::deserialize::<ServiceMessage>(&buf[..len]) {
                    Ok(message) => {
                        if inbound.send(message).is_err() {
                            tracing::info!("Inbound consumer of {} gone, stopping", self.local_addr);
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to deserialize datagram from {}: {}", src, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to receive UDP packet: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

impl Dispatcher for UdpTransport {
    fn submit(&self, message: ServiceMessage) -> Result<()> {
        self.outbound
            .send(message)
            .map_err(|_| anyhow::anyhow!("UDP send loop on {} has stopped", self.local_addr))
    }
}
