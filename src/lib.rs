//! Command Fabric Library
//!
//! A message-routed command engine for services that talk over a broadcast transport.
//! It serves as the foundation for the node binary (`main.rs`).
//!
//! ## Architecture Modules
//! - **`command`**: The composition root. `Command` ties the subsystems below together,
//!   processes inbound messages and sends tracked requests.
//! - **`router`**: Wildcard routing keys resolved to handlers through a memoised lookup.
//! - **`outgoing`**: The table of pending requests, each settled exactly once by a
//!   response, a timeout or a cancellation.
//! - **`negotiation`**: Gossip-style election of one master instance among peers that
//!   share a command name.
//! - **`schedule`**: Periodic jobs, including master-only jobs that follow mastership.
//! - **`message`**: The `ServiceMessage` envelope, routing keys and payload codecs.
//! - **`transport`**: The `Dispatcher` seam with an in-process bus and a UDP transport.
//! - **`collector`** / **`observer`**: Logging sink and registration observers.
//! - **`config`** / **`error`**: Node configuration and the API error type.

pub mod collector;
pub mod command;
pub mod config;
pub mod error;
pub mod message;
pub mod negotiation;
pub mod observer;
pub mod outgoing;
pub mod router;
pub mod schedule;
pub mod transport;
