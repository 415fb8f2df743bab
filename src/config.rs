//! Node Configuration
//!
//! Settings for the `command-node` binary. Every field has a default, so a JSON file
//! only needs the values it changes; command line arguments are applied on top.

use crate::command::policy::CommandPolicy;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Offset between the UDP bind port and the default HTTP diagnostics port.
pub const HTTP_PORT_OFFSET: u16 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// UDP address of the message transport.
    pub bind: SocketAddr,
    /// Other nodes that receive every outbound frame.
    pub peers: Vec<SocketAddr>,
    /// Diagnostics endpoint. Defaults to the bind address with the port shifted by
    /// `HTTP_PORT_OFFSET`.
    pub http_addr: Option<SocketAddr>,
    pub command_name: String,
    pub log_level: String,
    pub command: CommandPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            peers: Vec::new(),
            http_addr: None,
            command_name: "command-node".to_string(),
            log_level: "info".to_string(),
            command: CommandPolicy::default(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        tracing::debug!("Loaded node config from {}", path.display());
        Ok(config)
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr.unwrap_or_else(|| {
            SocketAddr::new(
                self.bind.ip(),
                self.bind.port().saturating_add(HTTP_PORT_OFFSET),
            )
        })
    }

    /// Unknown names fall back to `INFO`.
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level
            .trim()
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}
