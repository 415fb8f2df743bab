//! Command Module
//!
//! The composition root of the engine. A `Command` owns one router, one outgoing
//! tracker, one schedule registrar and one master job context, and talks to the outside
//! world through a `Dispatcher`.
//!
//! ## Lifecycle
//! 1. **Build**: `CommandBuilder` collects handlers, schedules and collaborators.
//! 2. **Start**: Internal routes and schedules are registered; `send` becomes usable.
//! 3. **Run**: Inbound messages go through `process_message`. With master jobs enabled,
//!    the poll schedule drives the election and mastership changes register or release
//!    the master-only handlers and schedules.
//! 4. **Stop**: Mastership is resigned, schedules are torn down and pending requests are
//!    cancelled.
//!
//! ## Submodules
//! - **`builder`**: `CommandBuilder`.
//! - **`engine`**: `Command` itself.
//! - **`handlers`**: HTTP diagnostics endpoints.
//! - **`policy`**: `CommandPolicy` and `RetryPolicy`.
//! - **`types`**: `ProcessOutcome` and `CommandStatistics`.

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod policy;
pub mod types;
