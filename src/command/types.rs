use crate::message::types::ServiceMessage;
use crate::negotiation::types::MasterJobStatus;
use crate::router::types::HandlerStatistics;
use crate::schedule::types::ScheduleStatistics;

use serde::{Deserialize, Serialize};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// A handler ran; these are the messages it emitted.
    Handled { responses: Vec<ServiceMessage> },
    /// No registered key matched the header.
    Unresolved,
    /// The handler failed or panicked. Details are logged under `tracking_id`.
    Faulted { tracking_id: String },
}

impl ProcessOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, ProcessOutcome::Handled { .. })
    }
}

/// Diagnostics snapshot served on `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandStatistics {
    pub name: String,
    pub service_id: String,
    pub running: bool,
    pub master_job: MasterJobStatus,
    pub pending_outgoing: usize,
    pub handlers: Vec<HandlerStatistics>,
    pub schedules: Vec<ScheduleStatistics>,
}
