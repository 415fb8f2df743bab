//! Outgoing Request Tracking Module
//!
//! Correlates outgoing requests with their responses and guarantees that every request
//! observes exactly one outcome: a response, a timeout or a cancellation.
//!
//! ## Lifecycle
//! 1. **Register**: A pending entry is inserted under the uppercased correlation id. An
//!    id that is already pending is rejected, never overwritten.
//! 2. **Wait**: The caller awaits a `oneshot` completion handle (cooperatively, no
//!    dedicated thread). Asynchronous sends skip this step.
//! 3. **Settle**: A response, the TTL sweep, a caller cancellation or shutdown removes the
//!    entry. `DashMap::remove` is atomic, so whichever path removes it signals the
//!    outcome and every other path sees "not found" and does nothing.
//!
//! ## Submodules
//! - **`tracker`**: The pending table and the settle operations.
//! - **`types`**: Request settings, outcomes and the typed response wrapper.

pub mod tracker;
pub mod types;
