//! Master Job Negotiation
//!
//! Gossip-style election of one active instance among replicas of the same command,
//! using nothing but broadcast messages on a negotiation channel.
//!
//! ## Failure Model
//! - **Partition**: Indistinguishable from a missing master. An isolated instance reaches
//!   `Active` on its own.
//! - **Split-brain**: Healed, not prevented. An active instance that hears another
//!   `IAmMaster` steps down and answers `IAmStandby`.
//!
//! ## Submodules
//! - **`context`**: The `MasterJobContext` state machine.
//! - **`types`**: States, wire actions, effects and `MasterJobPolicy`.

pub mod context;
pub mod types;
