//! Message Model
//!
//! Defines the payload-agnostic envelope exchanged between services and the keys used
//! to route it.
//!
//! ## Core Concepts
//! - **`ServiceMessage`**: The addressed envelope. The engine only reads and writes the
//!   routing and correlation fields; the `blob` is opaque and handled by a `PayloadCodec`.
//! - **`MessageHeader`**: The concrete, case-normalised `(channel, type, action)` triple of
//!   an inbound message.
//! - **`RoutingKey`**: The registered counterpart of a header where any field may be a
//!   wildcard.

pub mod codec;
pub mod types;

#[cfg(test)]
mod tests;
