//! Job Schedule Module
//!
//! Hands recurring callbacks to a scheduler and keeps track of them so they can be torn
//! down in bulk, including the master-only subset that follows mastership.
//!
//! ## Architecture Overview
//! - **`registrar`**: The per-command list of schedules. Runs tear-up/tear-down hooks,
//!   registers with the scheduler and notifies observers.
//! - **`scheduler`**: The `Scheduler` contract plus two implementations: `TokioScheduler`
//!   (one background task per schedule) and `ManualScheduler` (the host triggers runs).
//! - **`types`**: Timer configuration, schedule definitions and execution counters.

pub mod registrar;
pub mod scheduler;
pub mod types;
