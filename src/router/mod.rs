//! Command Router Module
//!
//! Maps inbound message headers to registered handlers.
//!
//! ## Resolution Model
//! 1. **Registration**: Handlers are appended to an ordered table under a coarse lock.
//!    Duplicate keys are allowed.
//! 2. **Matching**: A header is matched against each key in registration order. `None`
//!    fields in a key act as wildcards, so the first registered match wins.
//! 3. **Caching**: The result is stored per concrete header in a `DashMap` so repeated
//!    messages of the same shape skip the scan.
//!
//! ## Submodules
//! - **`registry`**: The handler table, the lookup cache and observer notification.
//! - **`types`**: Handler delegates, the per-request context and usage counters.

pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;
