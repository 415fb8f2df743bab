use crate::error::CommandError;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ACTION_WHO_IS_MASTER: &str = "WhoIsMaster";
pub const ACTION_REQUESTING_CONTROL_1: &str = "RequestingControl1";
pub const ACTION_REQUESTING_CONTROL_2: &str = "RequestingControl2";
pub const ACTION_TAKING_CONTROL: &str = "TakingControl";
pub const ACTION_I_AM_MASTER: &str = "IAmMaster";
pub const ACTION_I_AM_STANDBY: &str = "IAmStandby";
pub const ACTION_RESYNC_MASTER: &str = "ResyncMaster";

/// Where this instance stands in the election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MasterJobState {
    /// Not participating.
    Disabled,
    /// Waiting to hear one of its own broadcasts before joining.
    VerifyingComms,
    /// Standing by while another instance is (or may be) master.
    Inactive,
    /// Asking who the master is.
    Starting,
    Requesting1,
    Requesting2,
    /// Announced intent to take control, waiting for the echo.
    TakingControl,
    /// This instance is master.
    Active,
}

impl MasterJobState {
    /// Position on the acquisition ladder used by the yield rule.
    ///
    /// `None` for states that do not contend.
    pub fn negotiation_phase(&self) -> Option<u8> {
        match self {
            MasterJobState::Inactive => Some(0),
            MasterJobState::Starting => Some(1),
            MasterJobState::Requesting1 => Some(2),
            MasterJobState::Requesting2 => Some(3),
            MasterJobState::TakingControl => Some(4),
            MasterJobState::Disabled | MasterJobState::VerifyingComms | MasterJobState::Active => {
                None
            }
        }
    }

    /// Whether the instance is somewhere on the way to mastership.
    pub fn is_contending(&self) -> bool {
        matches!(
            self,
            MasterJobState::Starting
                | MasterJobState::Requesting1
                | MasterJobState::Requesting2
                | MasterJobState::TakingControl
        )
    }
}

impl fmt::Display for MasterJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Negotiation message carried in `action_type` on the negotiation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegotiationAction {
    WhoIsMaster,
    RequestingControl1,
    RequestingControl2,
    TakingControl,
    IAmMaster,
    IAmStandby,
    ResyncMaster,
}

impl NegotiationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationAction::WhoIsMaster => ACTION_WHO_IS_MASTER,
            NegotiationAction::RequestingControl1 => ACTION_REQUESTING_CONTROL_1,
            NegotiationAction::RequestingControl2 => ACTION_REQUESTING_CONTROL_2,
            NegotiationAction::TakingControl => ACTION_TAKING_CONTROL,
            NegotiationAction::IAmMaster => ACTION_I_AM_MASTER,
            NegotiationAction::IAmStandby => ACTION_I_AM_STANDBY,
            NegotiationAction::ResyncMaster => ACTION_RESYNC_MASTER,
        }
    }

    /// The ladder state a contender sending this action is in.
    pub fn sender_state(&self) -> Option<MasterJobState> {
        match self {
            NegotiationAction::RequestingControl1 => Some(MasterJobState::Requesting1),
            NegotiationAction::RequestingControl2 => Some(MasterJobState::Requesting2),
            NegotiationAction::TakingControl => Some(MasterJobState::TakingControl),
            _ => None,
        }
    }
}

impl fmt::Display for NegotiationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NegotiationAction {
    type Err = CommandError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            NegotiationAction::WhoIsMaster,
            NegotiationAction::RequestingControl1,
            NegotiationAction::RequestingControl2,
            NegotiationAction::TakingControl,
            NegotiationAction::IAmMaster,
            NegotiationAction::IAmStandby,
            NegotiationAction::ResyncMaster,
        ];

        all.into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CommandError::NegotiationProtocolViolation(s.to_string()))
    }
}

/// Side effects the owning command must carry out after a negotiation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationEffect {
    Broadcast(NegotiationAction),
    /// The context is now `Active`: announce it and register master-only commands and
    /// schedules.
    Promoted,
    /// Mastership was lost to another instance: drop master-only commands and schedules
    /// without asking the swarm to resync.
    Demoted,
}

/// Tuning of the election. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterJobPolicy {
    pub enabled: bool,
    pub negotiation_channel_id: String,
    /// Defaults to the command name so replicas of the same command negotiate together.
    pub negotiation_message_type: Option<String>,
    pub poll_interval_ms: u64,
    /// Random extra delay added to every poll so replicas drift apart. Zero is valid:
    /// level contenders are then separated by service id alone.
    pub poll_jitter_ms: u64,
    pub initial_delay_ms: u64,
    /// A self-echo advances the ladder only once the attempt counter exceeds this.
    pub min_attempts: u32,
    /// How long an inactive instance waits without hearing a master before restarting.
    pub standby_timeout_ms: u64,
    /// Frequency of the schedule that checks whether a poll is due.
    pub tick_resolution_ms: u64,
}

impl Default for MasterJobPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            negotiation_channel_id: "masterjob".to_string(),
            negotiation_message_type: None,
            poll_interval_ms: 5_000,
            poll_jitter_ms: 1_000,
            initial_delay_ms: 1_000,
            min_attempts: 2,
            standby_timeout_ms: 20_000,
            tick_resolution_ms: 250,
        }
    }
}

impl MasterJobPolicy {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn standby_timeout(&self) -> Duration {
        Duration::from_millis(self.standby_timeout_ms)
    }

    pub fn tick_resolution(&self) -> Duration {
        Duration::from_millis(self.tick_resolution_ms.max(1))
    }
}

/// Snapshot of the election state for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterJobStatus {
    pub name: String,
    pub state: MasterJobState,
    pub attempts: u32,
    pub known_master: Option<String>,
    pub partners: Vec<PartnerStatus>,
    pub state_changes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerStatus {
    pub service_id: String,
    pub is_master: bool,
}
