//! Master Job Context
//!
//! Sans-IO election state for one command. The owning command feeds it poll ticks and
//! negotiation messages (its own echoes included) and carries out the returned effects.
//!
//! ## Ladder
//! `VerifyingComms → Starting → Requesting1 → Requesting2 → TakingControl → Active`.
//! Each rung is climbed by hearing the echo of the rung's own announcement after more than
//! `min_attempts` polls. The last echo promotes the instance within the same event.
//! Hearing a master, or a contender further up the ladder, sends the instance back to
//! `Inactive`. Between two contenders on the same rung, the higher service id yields.

use super::types::*;
use crate::error::CommandError;

use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct MasterJobContext {
    name: String,
    service_id: String,
    policy: MasterJobPolicy,
    state: MasterJobState,
    attempts: u32,
    /// Remote service id → believed to be master.
    partners: HashMap<String, bool>,
    known_master: Option<String>,
    next_poll: Instant,
    standby_deadline: Option<Instant>,
    state_changes: u64,
}

impl MasterJobContext {
    pub fn new(name: &str, service_id: &str, policy: MasterJobPolicy, now: Instant) -> Self {
        let state = if policy.enabled {
            MasterJobState::VerifyingComms
        } else {
            MasterJobState::Disabled
        };

        Self {
            name: name.to_string(),
            service_id: service_id.to_string(),
            next_poll: now + policy.initial_delay(),
            policy,
            state,
            attempts: 0,
            partners: HashMap::new(),
            known_master: None,
            standby_deadline: None,
            state_changes: 0,
        }
    }

    pub fn state(&self) -> MasterJobState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_active(&self) -> bool {
        self.state == MasterJobState::Active
    }

    pub fn known_master(&self) -> Option<&str> {
        self.known_master.as_deref()
    }

    pub fn partners(&self) -> &HashMap<String, bool> {
        &self.partners
    }

    pub fn next_poll(&self) -> Instant {
        self.next_poll
    }

    pub fn policy(&self) -> &MasterJobPolicy {
        &self.policy
    }

    /// Timer tick. Returns the announcement to broadcast when a poll is due.
    pub fn poll(&mut self, now: Instant) -> Option<NegotiationAction> {
        if self.state == MasterJobState::Disabled || now < self.next_poll {
            return None;
        }

        if self.state == MasterJobState::Inactive
            && self.standby_deadline.is_some_and(|deadline| now >= deadline)
        {
            tracing::info!(
                "[{}] No master heard for {:?}, restarting negotiation",
                self.name,
                self.policy.standby_timeout()
            );
            self.known_master = None;
            self.transition(MasterJobState::Starting, now);
        }

        let announcement = Self::announcement_for(self.state)?;

        self.next_poll = now + self.policy.poll_interval() + self.jitter();
        if self.state != MasterJobState::VerifyingComms {
            self.attempts += 1;
        }

        tracing::debug!(
            "[{}] Poll in {} (attempt {}), broadcasting {}",
            self.name,
            self.state,
            self.attempts,
            announcement
        );

        Some(announcement)
    }

    /// Applies one negotiation message.
    ///
    /// # Errors
    /// `NegotiationProtocolViolation` for unknown actions; the state is left untouched.
    pub fn process(
        &mut self,
        is_self: bool,
        sender: &str,
        action: &str,
        now: Instant,
    ) -> Result<Vec<NegotiationEffect>, CommandError> {
        let action: NegotiationAction = action.parse()?;

        if self.state == MasterJobState::Disabled {
            return Ok(Vec::new());
        }

        if is_self {
            Ok(self.process_echo(action, now))
        } else {
            Ok(self.process_foreign(sender, action, now))
        }
    }

    fn process_echo(&mut self, action: NegotiationAction, now: Instant) -> Vec<NegotiationEffect> {
        if self.state == MasterJobState::VerifyingComms {
            tracing::info!("[{}] Heard own broadcast, communication verified", self.name);
            self.transition(MasterJobState::Starting, now);
            return Vec::new();
        }

        if Self::announcement_for(self.state) != Some(action) || self.attempts <= self.policy.min_attempts {
            return Vec::new();
        }

        match self.state {
            MasterJobState::Starting => self.transition(MasterJobState::Requesting1, now),
            MasterJobState::Requesting1 => self.transition(MasterJobState::Requesting2, now),
            MasterJobState::Requesting2 => self.transition(MasterJobState::TakingControl, now),
            MasterJobState::TakingControl => {
                self.activate(now);
                return vec![NegotiationEffect::Promoted];
            }
            _ => {}
        }

        Vec::new()
    }

    fn process_foreign(
        &mut self,
        sender: &str,
        action: NegotiationAction,
        now: Instant,
    ) -> Vec<NegotiationEffect> {
        let mut effects = Vec::new();

        match action {
            NegotiationAction::IAmStandby => {
                self.partners.insert(sender.to_string(), false);
                if self.known_master.as_deref() == Some(sender) {
                    self.known_master = None;
                }
            }
            NegotiationAction::IAmMaster => {
                self.record_master(sender);
                self.standby_deadline = Some(now + self.policy.standby_timeout());

                if self.state == MasterJobState::Active {
                    tracing::warn!(
                        "[{}] Another master announced itself ({}), standing down",
                        self.name,
                        sender
                    );
                    self.transition(MasterJobState::Inactive, now);
                    effects.push(NegotiationEffect::Demoted);
                    effects.push(NegotiationEffect::Broadcast(NegotiationAction::IAmStandby));
                } else if self.state.is_contending() {
                    tracing::info!("[{}] Master {} is present, standing by", self.name, sender);
                    self.transition(MasterJobState::Inactive, now);
                }
            }
            NegotiationAction::ResyncMaster => {
                self.partners.insert(sender.to_string(), false);
                for is_master in self.partners.values_mut() {
                    *is_master = false;
                }
                self.known_master = None;

                if self.state == MasterJobState::Inactive {
                    tracing::info!("[{}] Master {} resigned, renegotiating", self.name, sender);
                    self.transition(MasterJobState::Starting, now);
                }
            }
            NegotiationAction::WhoIsMaster => {
                self.partners.entry(sender.to_string()).or_insert(false);
                if self.state == MasterJobState::Active {
                    effects.push(NegotiationEffect::Broadcast(NegotiationAction::IAmMaster));
                }
            }
            NegotiationAction::RequestingControl1
            | NegotiationAction::RequestingControl2
            | NegotiationAction::TakingControl => {
                self.partners.entry(sender.to_string()).or_insert(false);

                if self.state == MasterJobState::Active {
                    effects.push(NegotiationEffect::Broadcast(NegotiationAction::IAmMaster));
                    return effects;
                }

                let own = self.state.negotiation_phase();
                let theirs = action.sender_state().and_then(|s| s.negotiation_phase());
                if let (Some(own), Some(theirs)) = (own, theirs)
                    && (own < theirs || (own == theirs && self.service_id.as_str() > sender))
                {
                    if self.state != MasterJobState::Inactive {
                        tracing::info!(
                            "[{}] Yielding to {} ({}) from {}",
                            self.name,
                            sender,
                            action,
                            self.state
                        );
                    }
                    self.transition(MasterJobState::Inactive, now);
                    self.standby_deadline = Some(now + self.policy.standby_timeout());
                }
            }
        }

        effects
    }

    /// Enters `Active`. Returns `false` if already active.
    pub fn activate(&mut self, now: Instant) -> bool {
        if self.state == MasterJobState::Active {
            return false;
        }

        self.transition(MasterJobState::Active, now);
        for is_master in self.partners.values_mut() {
            *is_master = false;
        }
        self.known_master = None;
        true
    }

    /// Leaves `Active` for `Inactive`. Returns `false` if not active.
    pub fn deactivate(&mut self, now: Instant) -> bool {
        if self.state != MasterJobState::Active {
            return false;
        }

        self.transition(MasterJobState::Inactive, now);
        true
    }

    pub fn status(&self) -> MasterJobStatus {
        let mut partners: Vec<PartnerStatus> = self
            .partners
            .iter()
            .map(|(service_id, is_master)| PartnerStatus {
                service_id: service_id.clone(),
                is_master: *is_master,
            })
            .collect();
        partners.sort_by(|a, b| a.service_id.cmp(&b.service_id));

        MasterJobStatus {
            name: self.name.clone(),
            state: self.state,
            attempts: self.attempts,
            known_master: self.known_master.clone(),
            partners,
            state_changes: self.state_changes,
        }
    }

    fn transition(&mut self, next: MasterJobState, now: Instant) {
        if self.state == next {
            return;
        }

        tracing::info!("[{}] Master job state {} -> {}", self.name, self.state, next);

        self.state = next;
        self.attempts = 0;
        self.state_changes += 1;
        self.standby_deadline = match next {
            MasterJobState::Inactive => Some(now + self.policy.standby_timeout()),
            _ => None,
        };
    }

    fn record_master(&mut self, sender: &str) {
        for is_master in self.partners.values_mut() {
            *is_master = false;
        }
        self.partners.insert(sender.to_string(), true);
        self.known_master = Some(sender.to_string());
    }

    fn jitter(&self) -> Duration {
        if self.policy.poll_jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=self.policy.poll_jitter_ms))
    }

    fn announcement_for(state: MasterJobState) -> Option<NegotiationAction> {
        match state {
            MasterJobState::Disabled => None,
            MasterJobState::VerifyingComms | MasterJobState::Inactive | MasterJobState::Starting => {
                Some(NegotiationAction::WhoIsMaster)
            }
            MasterJobState::Requesting1 => Some(NegotiationAction::RequestingControl1),
            MasterJobState::Requesting2 => Some(NegotiationAction::RequestingControl2),
            MasterJobState::TakingControl => Some(NegotiationAction::TakingControl),
            MasterJobState::Active => Some(NegotiationAction::IAmMaster),
        }
    }
}
