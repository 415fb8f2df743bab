//! Command Engine
//!
//! One `Command` is one logical service command running on one instance. It composes
//! the router, the outgoing tracker, the schedule registrar and the master job context,
//! and wires them to a `Dispatcher`.
//!
//! ## Message Flow
//! 1. **Inbound**: `process_message` resolves the header and runs the handler on its own
//!    task. Whatever the handler returns is emitted.
//! 2. **Outbound**: `send` tracks the request under its correlation id, emits it and
//!    waits for the tracker to settle it.
//! 3. **Internal routes**: `start` registers a response route (addressed to this
//!    instance only) and, when master jobs are enabled, a negotiation route. Both run
//!    through the same router as user handlers.
//!
//! ## Master Jobs
//! Master-only commands and schedules are kept as definitions and only registered
//! while this instance holds mastership.

use super::policy::CommandPolicy;
use super::types::*;
use crate::collector::{DataCollector, LogLevel};
use crate::error::CommandError;
use crate::message::codec::PayloadCodec;
use crate::message::types::{ResponseRouting, RoutingKey, ServiceId, ServiceMessage};
use crate::negotiation::context::MasterJobContext;
use crate::negotiation::types::{
    MasterJobState, MasterJobStatus, NegotiationAction, NegotiationEffect,
};
use crate::outgoing::tracker::{OutgoingTracker, normalise_correlation_id};
use crate::outgoing::types::*;
use crate::router::registry::CommandRegistry;
use crate::router::types::{
    CommandDefinition, CommandRequest, ErrorHandlerFn, HandlerEntry, HandlerFn, handler_fn,
};
use crate::schedule::registrar::ScheduleRegistrar;
use crate::schedule::types::{CommandJobSchedule, ScheduleDefinition, TimerConfig, schedule_fn};
use crate::transport::Dispatcher;

use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const RESPONSE_ACTION: &str = "response";

/// Everything `CommandBuilder` collected.
pub(super) struct CommandParts {
    pub name: String,
    pub service_id: ServiceId,
    pub policy: CommandPolicy,
    pub codec: PayloadCodec,
    pub collector: Arc<dyn DataCollector>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub registry: CommandRegistry,
    pub registrar: ScheduleRegistrar,
    pub master_commands: Vec<CommandDefinition>,
    pub master_schedules: Vec<ScheduleDefinition>,
    pub schedules: Vec<ScheduleDefinition>,
}

pub struct Command {
    name: String,
    service_id: ServiceId,
    policy: CommandPolicy,
    codec: PayloadCodec,
    collector: Arc<dyn DataCollector>,
    dispatcher: Arc<dyn Dispatcher>,
    registry: CommandRegistry,
    tracker: OutgoingTracker,
    registrar: ScheduleRegistrar,
    master_job: Mutex<MasterJobContext>,
    /// Whether master-only commands and schedules are currently registered.
    master_jobs_held: Mutex<bool>,
    master_commands: Vec<CommandDefinition>,
    master_schedules: Vec<ScheduleDefinition>,
    /// Registered on `start`, torn down on `stop`.
    schedules: Vec<ScheduleDefinition>,
    internal_routes: Mutex<Vec<RoutingKey>>,
    /// Loopback for messages sent with `RoutingOptions::Internal`.
    internal_tx: mpsc::UnboundedSender<ServiceMessage>,
    internal_rx: Mutex<Option<mpsc::UnboundedReceiver<ServiceMessage>>>,
    running: AtomicBool,
    weak_self: Weak<Command>,
}

impl Command {
    pub(super) fn assemble(parts: CommandParts) -> Arc<Self> {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let master_job = MasterJobContext::new(
            &parts.name,
            &parts.service_id.0,
            parts.policy.master_job.clone(),
            Instant::now(),
        );

        Arc::new_cyclic(|weak_self| Self {
            name: parts.name,
            service_id: parts.service_id,
            policy: parts.policy,
            codec: parts.codec,
            collector: parts.collector,
            dispatcher: parts.dispatcher,
            registry: parts.registry,
            tracker: OutgoingTracker::new(),
            registrar: parts.registrar,
            master_job: Mutex::new(master_job),
            master_jobs_held: Mutex::new(false),
            master_commands: parts.master_commands,
            master_schedules: parts.master_schedules,
            schedules: parts.schedules,
            internal_routes: Mutex::new(Vec::new()),
            internal_tx,
            internal_rx: Mutex::new(Some(internal_rx)),
            running: AtomicBool::new(false),
            weak_self: weak_self.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    pub fn codec(&self) -> PayloadCodec {
        self.codec
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn lock_master_job(&self) -> MutexGuard<'_, MasterJobContext> {
        self.master_job
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_internal_routes(&self) -> MutexGuard<'_, Vec<RoutingKey>> {
        self.internal_routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------

    /// Registers the internal routes and schedules and starts accepting `send` calls.
    ///
    /// # Errors
    /// `AlreadyStarted` if the command is running.
    pub fn start(&self) -> Result<(), CommandError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CommandError::AlreadyStarted(self.name.clone()));
        }

        tracing::info!("Starting command '{}' as {}", self.name, self.service_id);

        self.spawn_internal_pump();

        let response_key = self.response_key();
        let weak = self.weak_self.clone();
        self.registry.register(
            response_key.clone(),
            handler_fn(move |request: CommandRequest| {
                let weak = weak.clone();
                async move {
                    if let Some(command) = weak.upgrade() {
                        command.on_response(request.message);
                    }
                    Ok(Vec::new())
                }
            }),
            None,
            Some("outgoing-response".to_string()),
            false,
        );
        self.lock_internal_routes().push(response_key);

        if self.policy.master_job.enabled {
            self.start_negotiation();
        }

        let weak = self.weak_self.clone();
        self.registrar.register_schedule(ScheduleDefinition::new(
            &self.sweep_schedule_name(),
            TimerConfig::every(self.policy.outgoing_sweep_interval()),
            schedule_fn(move |_| {
                let weak = weak.clone();
                async move {
                    if let Some(command) = weak.upgrade() {
                        command.tracker.sweep_expired();
                    }
                    Ok(())
                }
            }),
        ));

        for definition in &self.schedules {
            self.registrar.register_schedule(definition.clone());
        }

        tracing::info!(
            "Command '{}' started with {} handler(s) and {} schedule(s)",
            self.name,
            self.registry.len(),
            self.registrar.len()
        );

        Ok(())
    }

    fn start_negotiation(&self) {
        let negotiation_key = self.negotiation_key();
        let weak = self.weak_self.clone();
        self.registry.register(
            negotiation_key.clone(),
            handler_fn(move |request: CommandRequest| {
                let weak = weak.clone();
                async move {
                    if let Some(command) = weak.upgrade() {
                        command.on_negotiation_message(&request.message);
                    }
                    Ok(Vec::new())
                }
            }),
            None,
            Some("master-job-negotiation".to_string()),
            false,
        );
        self.lock_internal_routes().push(negotiation_key);

        let weak = self.weak_self.clone();
        self.registrar.register_schedule(ScheduleDefinition::new(
            &self.poll_schedule_name(),
            TimerConfig::every(self.policy.master_job.tick_resolution()),
            schedule_fn(move |_| {
                let weak = weak.clone();
                async move {
                    if let Some(command) = weak.upgrade() {
                        command.negotiation_poll();
                    }
                    Ok(())
                }
            }),
        ));

        tracing::info!(
            "Master job negotiation enabled for '{}' on {}",
            self.name,
            self.negotiation_key()
        );
    }

    /// Gives up mastership, tears down every schedule and internal route and cancels
    /// pending requests.
    ///
    /// # Errors
    /// `NotStarted` if the command is not running.
    pub fn stop(&self) -> Result<(), CommandError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(CommandError::NotStarted(self.name.clone()));
        }

        self.master_job_stop();

        let schedules = self.registrar.tear_down();
        let routes: Vec<RoutingKey> = self.lock_internal_routes().drain(..).collect();
        for key in &routes {
            self.registry.unregister(key, false);
        }
        let cancelled = self.tracker.shutdown();

        *self.lock_master_job() = MasterJobContext::new(
            &self.name,
            &self.service_id.0,
            self.policy.master_job.clone(),
            Instant::now(),
        );

        tracing::info!(
            "Command '{}' stopped ({} schedule(s) removed, {} request(s) cancelled)",
            self.name,
            schedules,
            cancelled
        );

        Ok(())
    }

    fn spawn_internal_pump(&self) {
        let Some(mut internal) = self
            .internal_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        else {
            return;
        };

        let weak = self.weak_self.clone();
        tokio::spawn(async move {
            while let Some(message) = internal.recv().await {
                let Some(command) = weak.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    command.process_message(message).await;
                });
            }
        });
    }

    // ------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------

    /// Routes one inbound message to its handler and emits the handler's output.
    ///
    /// A failing or panicking handler is reported through the data collector under a
    /// fresh tracking id; if the sender asked for a reply it receives a 500 carrying only
    /// that id.
    pub async fn process_message(&self, message: ServiceMessage) -> ProcessOutcome {
        let header = message.header();

        let Some(entry) = self.registry.resolve(&header) else {
            self.collector.log_message(
                LogLevel::Debug,
                &format!("No handler for {} on '{}'", header, self.name),
                "routing",
            );
            return ProcessOutcome::Unresolved;
        };

        entry.counters.record_invocation();

        let request = CommandRequest::new(message.clone(), self.service_id.clone(), self.codec);
        let result = match tokio::spawn((entry.handler)(request)).await {
            Ok(result) => result,
            Err(join_error) => Err(anyhow::anyhow!("handler aborted: {}", join_error)),
        };

        match result {
            Ok(responses) => {
                for response in &responses {
                    if let Err(e) = self.emit(response.clone()) {
                        self.collector
                            .log_exception(&format!("Failed to emit reply to {}", header), &e);
                    }
                }
                ProcessOutcome::Handled { responses }
            }
            Err(error) => {
                entry.counters.record_failure();
                let tracking_id =
                    self.report_fault(&format!("Handler {} failed on {}", entry.key, header), &error);

                if let Some(error_handler) = &entry.error_handler {
                    error_handler(&message, &error);
                }

                let description = format!("Internal fault, tracking id {}", tracking_id);
                if let Some(reply) = message.reply(&self.service_id, STATUS_FAULT, &description)
                    && let Err(e) = self.emit(reply)
                {
                    self.collector
                        .log_exception(&format!("Failed to emit fault reply to {}", header), &e);
                }

                ProcessOutcome::Faulted { tracking_id }
            }
        }
    }

    fn on_response(&self, message: ServiceMessage) {
        match message.correlation_key.clone() {
            Some(correlation_key) => {
                self.tracker.complete(&correlation_key, message);
            }
            None => tracing::warn!(
                "Response without correlation key from {}",
                message.originator_service_id
            ),
        }
    }

    fn on_negotiation_message(&self, message: &ServiceMessage) {
        let is_self = message.is_from(&self.service_id);

        let result = self.lock_master_job().process(
            is_self,
            &message.originator_service_id,
            &message.action_type,
            Instant::now(),
        );

        match result {
            Ok(effects) => self.apply_negotiation_effects(effects),
            Err(e) => self.collector.log_message(
                LogLevel::Warning,
                &format!("{} from {}", e, message.originator_service_id),
                "negotiation",
            ),
        }
    }

    /// Carries out effects after the context lock is released. Other events may have
    /// been processed in between, so mastership effects re-read the current state.
    pub(super) fn apply_negotiation_effects(&self, effects: Vec<NegotiationEffect>) {
        for effect in effects {
            match effect {
                NegotiationEffect::Broadcast(action) => self.broadcast_negotiation(action),
                NegotiationEffect::Promoted => {
                    if self.is_master() {
                        tracing::info!("'{}' ({}) won the election", self.name, self.service_id);
                        self.broadcast_negotiation(NegotiationAction::IAmMaster);
                    }
                    self.sync_master_jobs();
                }
                NegotiationEffect::Demoted => {
                    tracing::warn!("'{}' lost mastership, releasing master jobs", self.name);
                    self.sync_master_jobs();
                }
            }
        }
    }

    // ------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------

    /// Sends a request and, unless it is asynchronous, waits for its outcome.
    ///
    /// Timeouts, cancellations and faults come back as status codes. Only misuse is an
    /// error.
    ///
    /// # Errors
    /// * `NotStarted` before `start`.
    /// * `Codec` if the request cannot be encoded.
    /// * `DuplicateCorrelation` if the correlation id is already pending.
    pub async fn send<Req, Res>(
        &self,
        channel_id: &str,
        message_type: &str,
        action_type: &str,
        request: &Req,
        settings: RequestSettings,
    ) -> Result<CommandResponse<Res>, CommandError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        if !self.is_running() {
            return Err(CommandError::NotStarted(self.name.clone()));
        }

        let blob = self.codec.serialize(request)?;
        let mut message = ServiceMessage::new(channel_id, message_type, action_type, &self.service_id)
            .with_blob(blob)
            .with_response(self.response_routing());

        if let Some(correlation_id) = &settings.correlation_id_override {
            message.originator_key = correlation_id.clone();
        }
        if let Some(priority) = settings.priority {
            message.priority = priority;
        }
        message.route_internal = settings.routing == RoutingOptions::Internal;

        let correlation_id = normalise_correlation_id(&message.originator_key);
        let ttl = settings
            .wait_time
            .unwrap_or_else(|| self.policy.default_request_timeout());

        let receiver =
            self.tracker
                .register(&correlation_id, message.clone(), ttl, settings.process_async)?;

        if let Err(e) = self.emit(message) {
            self.tracker.cancel(&correlation_id);
            return Ok(self.fault_response(&correlation_id, "Dispatch failed", &e));
        }

        let Some(mut receiver) = receiver else {
            return Ok(CommandResponse::new(&correlation_id, STATUS_ACCEPTED, "Accepted"));
        };

        let outcome = match &settings.cancel {
            Some(token) => tokio::select! {
                outcome = &mut receiver => outcome,
                _ = token.cancelled() => {
                    // Loses to a response or timeout that settled first.
                    self.tracker.cancel(&correlation_id);
                    receiver.await
                }
            },
            None => receiver.await,
        };

        // A dropped sender means the entry was discarded without an outcome.
        let outcome = outcome.unwrap_or(TrackerOutcome::Cancelled);

        Ok(self.settle_response(&correlation_id, outcome, ttl))
    }

    /// `send` that retries on timeout with exponential backoff plus jitter.
    ///
    /// The cancellation token in `settings` is checked before every attempt and
    /// interrupts the backoff sleep.
    pub async fn send_with_retry<Req, Res>(
        &self,
        channel_id: &str,
        message_type: &str,
        action_type: &str,
        request: &Req,
        settings: RequestSettings,
    ) -> Result<CommandResponse<Res>, CommandError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let retry = &self.policy.retry;
        let mut attempt = 0;
        // A cancelled call reports the id of its latest attempt.
        let mut last_correlation_id = settings.correlation_id_override.clone();

        loop {
            attempt += 1;

            if let Some(token) = &settings.cancel
                && token.is_cancelled()
            {
                let correlation_id = last_correlation_id
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                return Ok(CommandResponse::new(
                    &normalise_correlation_id(&correlation_id),
                    STATUS_CANCELLED,
                    "Request cancelled",
                ));
            }

            let response = self
                .send(channel_id, message_type, action_type, request, settings.clone())
                .await?;
            last_correlation_id = Some(response.correlation_id.clone());

            if !response.is_timeout() || attempt >= retry.max_attempts {
                return Ok(response);
            }

            let jitter = match retry.jitter_ms {
                0 => 0,
                jitter_ms => rand::thread_rng().gen_range(0..=jitter_ms),
            };
            let delay = retry.backoff(attempt) + Duration::from_millis(jitter);

            tracing::debug!(
                "Request {}/{}/{} timed out (attempt {}/{}), retrying in {:?}",
                channel_id,
                message_type,
                action_type,
                attempt,
                retry.max_attempts,
                delay
            );

            match &settings.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = token.cancelled() => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }
    }

    /// Blocks the calling worker thread until `send` completes.
    ///
    /// Kept for hosts that cannot await. Disabled unless
    /// `CommandPolicy::allow_blocking_send` is set, and only usable on a multi-threaded
    /// tokio runtime.
    pub fn send_blocking<Req, Res>(
        &self,
        channel_id: &str,
        message_type: &str,
        action_type: &str,
        request: &Req,
        settings: RequestSettings,
    ) -> Result<CommandResponse<Res>, CommandError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        if !self.policy.allow_blocking_send {
            return Err(CommandError::BlockingSendDisabled);
        }

        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            CommandError::InvalidArgument(format!("blocking send needs a tokio runtime: {}", e))
        })?;

        if handle.runtime_flavor() != tokio::runtime::RuntimeFlavor::MultiThread {
            return Err(CommandError::InvalidArgument(
                "blocking send needs a multi-threaded runtime".to_string(),
            ));
        }

        tokio::task::block_in_place(|| {
            handle.block_on(self.send(channel_id, message_type, action_type, request, settings))
        })
    }

    fn emit(&self, message: ServiceMessage) -> anyhow::Result<()> {
        if message.route_internal {
            self.internal_tx
                .send(message)
                .map_err(|_| anyhow::anyhow!("internal loopback of '{}' is closed", self.name))
        } else {
            self.dispatcher.submit(message)
        }
    }

    fn settle_response<Res: DeserializeOwned>(
        &self,
        correlation_id: &str,
        outcome: TrackerOutcome,
        ttl: Duration,
    ) -> CommandResponse<Res> {
        match outcome {
            TrackerOutcome::Response(message) => {
                let status = message.status.unwrap_or(STATUS_OK);
                let description = message.status_description.as_deref().unwrap_or("OK");
                let response = CommandResponse::new(correlation_id, status, description);

                if message.blob.is_empty() {
                    return response;
                }

                match self.codec.deserialize::<Res>(&message.blob) {
                    Ok(body) => response.with_response(body),
                    Err(e) => self.fault_response(
                        correlation_id,
                        "Failed to decode response",
                        &anyhow::Error::new(e),
                    ),
                }
            }
            TrackerOutcome::TimedOut => CommandResponse::new(
                correlation_id,
                STATUS_TIMEOUT,
                &format!("No response within {:?}", ttl),
            ),
            TrackerOutcome::Cancelled => {
                CommandResponse::new(correlation_id, STATUS_CANCELLED, "Request cancelled")
            }
        }
    }

    fn report_fault(&self, context: &str, error: &anyhow::Error) -> String {
        let tracking_id = uuid::Uuid::new_v4().to_string();
        self.collector
            .log_exception(&format!("{} [tracking id {}]", context, tracking_id), error);
        tracking_id
    }

    fn fault_response<Res>(
        &self,
        correlation_id: &str,
        context: &str,
        error: &anyhow::Error,
    ) -> CommandResponse<Res> {
        let tracking_id = self.report_fault(context, error);
        CommandResponse::new(
            correlation_id,
            STATUS_FAULT,
            &format!("Internal fault, tracking id {}", tracking_id),
        )
    }

    // ------------------------------------------------------------
    // Master jobs
    // ------------------------------------------------------------

    /// Takes mastership: announces it and registers master-only commands and schedules.
    ///
    /// # Returns
    /// `false` if this instance was already master.
    pub fn master_job_start(&self) -> bool {
        if !self.lock_master_job().activate(Instant::now()) {
            return false;
        }

        tracing::info!("'{}' ({}) is now master", self.name, self.service_id);

        self.broadcast_negotiation(NegotiationAction::IAmMaster);
        self.sync_master_jobs();
        true
    }

    /// Gives up mastership and asks the other instances to renegotiate.
    ///
    /// # Returns
    /// `false` if this instance was not master.
    pub fn master_job_stop(&self) -> bool {
        if !self.lock_master_job().deactivate(Instant::now()) {
            return false;
        }

        tracing::info!("'{}' ({}) resigned mastership", self.name, self.service_id);

        self.broadcast_negotiation(NegotiationAction::ResyncMaster);
        self.sync_master_jobs();
        true
    }

    /// Registers or releases master-only commands and schedules so they match the
    /// current state, whatever order mastership changes were applied in.
    fn sync_master_jobs(&self) {
        let mut held = self
            .master_jobs_held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let active = self.is_master();
        if *held == active {
            return;
        }

        if active {
            for definition in &self.master_commands {
                self.registry.register_definition(definition, true);
            }
            self.registrar
                .master_job_schedules_start(&self.master_schedules);
        } else {
            for definition in &self.master_commands {
                self.registry.unregister(&definition.key, true);
            }
            self.registrar.master_job_schedules_stop();
        }
        *held = active;
    }

    /// Runs one negotiation tick. Driven by the poll schedule; exposed for hosts that
    /// drive time themselves.
    pub fn negotiation_poll(&self) -> Option<NegotiationAction> {
        let action = self.lock_master_job().poll(Instant::now())?;
        self.broadcast_negotiation(action);
        Some(action)
    }

    fn broadcast_negotiation(&self, action: NegotiationAction) {
        let message = ServiceMessage::new(
            &self.policy.master_job.negotiation_channel_id,
            &self.negotiation_message_type(),
            action.as_str(),
            &self.service_id,
        );

        if let Err(e) = self.dispatcher.submit(message) {
            self.collector
                .log_exception(&format!("Failed to broadcast {}", action), &e);
        }
    }

    pub fn master_job_state(&self) -> MasterJobState {
        self.lock_master_job().state()
    }

    pub fn is_master(&self) -> bool {
        self.master_job_state() == MasterJobState::Active
    }

    pub fn master_job_status(&self) -> MasterJobStatus {
        self.lock_master_job().status()
    }

    // ------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------

    pub fn register_command(
        &self,
        key: RoutingKey,
        handler: HandlerFn,
        error_handler: Option<ErrorHandlerFn>,
        is_master_job: bool,
    ) -> Arc<HandlerEntry> {
        self.registry
            .register(key, handler, error_handler, None, is_master_job)
    }

    pub fn unregister_command(&self, key: &RoutingKey, is_master_job: bool) -> bool {
        self.registry.unregister(key, is_master_job)
    }

    pub fn register_schedule(&self, definition: ScheduleDefinition) -> Arc<CommandJobSchedule> {
        self.registrar.register_schedule(definition)
    }

    pub fn unregister_schedule(&self, schedule: &Arc<CommandJobSchedule>) -> bool {
        self.registrar.unregister_schedule(schedule)
    }

    pub fn supported_keys(&self) -> Vec<RoutingKey> {
        self.registry.supported_keys()
    }

    // ------------------------------------------------------------
    // Addressing and diagnostics
    // ------------------------------------------------------------

    /// Where replies to this instance's requests are sent. The message type is the
    /// service id, so only this instance routes them.
    pub fn response_routing(&self) -> ResponseRouting {
        ResponseRouting::new(
            &self.policy.response_channel_id,
            &self.service_id.0,
            RESPONSE_ACTION,
        )
    }

    fn response_key(&self) -> RoutingKey {
        RoutingKey::new(
            Some(&self.policy.response_channel_id),
            Some(&self.service_id.0),
            None,
        )
    }

    pub fn negotiation_message_type(&self) -> String {
        self.policy
            .master_job
            .negotiation_message_type
            .clone()
            .unwrap_or_else(|| self.name.clone())
    }

    pub fn negotiation_key(&self) -> RoutingKey {
        RoutingKey::new(
            Some(&self.policy.master_job.negotiation_channel_id),
            Some(&self.negotiation_message_type()),
            None,
        )
    }

    pub fn poll_schedule_name(&self) -> String {
        format!("{}:master-job-poll", self.name)
    }

    pub fn sweep_schedule_name(&self) -> String {
        format!("{}:outgoing-sweep", self.name)
    }

    pub fn pending_outgoing(&self) -> usize {
        self.tracker.pending_count()
    }

    pub fn statistics(&self) -> CommandStatistics {
        CommandStatistics {
            name: self.name.clone(),
            service_id: self.service_id.0.clone(),
            running: self.is_running(),
            master_job: self.master_job_status(),
            pending_outgoing: self.tracker.pending_count(),
            handlers: self.registry.handler_statistics(),
            schedules: self.registrar.statistics(),
        }
    }
}
