//! Command Builder
//!
//! Collects handlers, schedules and collaborators into a `Command`. Plain handlers are
//! registered immediately; master-only handlers and all schedules are kept as
//! definitions until `start` or a mastership change registers them.

use super::engine::{Command, CommandParts};
use super::policy::CommandPolicy;
use crate::collector::{DataCollector, TracingCollector};
use crate::error::CommandError;
use crate::message::codec::PayloadCodec;
use crate::message::types::{RoutingKey, ServiceId};
use crate::observer::{CommandObserver, ObserverSet};
use crate::router::registry::CommandRegistry;
use crate::router::types::{CommandDefinition, ErrorHandlerFn, HandlerFn};
use crate::schedule::registrar::ScheduleRegistrar;
use crate::schedule::scheduler::{Scheduler, TokioScheduler};
use crate::schedule::types::ScheduleDefinition;
use crate::transport::Dispatcher;

use std::sync::Arc;

pub struct CommandBuilder {
    name: String,
    service_id: Option<ServiceId>,
    policy: CommandPolicy,
    codec: PayloadCodec,
    collector: Option<Arc<dyn DataCollector>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    observers: ObserverSet,
    handlers: Vec<CommandDefinition>,
    master_handlers: Vec<CommandDefinition>,
    schedules: Vec<ScheduleDefinition>,
    master_schedules: Vec<ScheduleDefinition>,
}

impl Command {
    pub fn builder(name: &str) -> CommandBuilder {
        CommandBuilder::new(name)
    }
}

impl CommandBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            service_id: None,
            policy: CommandPolicy::default(),
            codec: PayloadCodec::default(),
            collector: None,
            scheduler: None,
            dispatcher: None,
            observers: ObserverSet::new(),
            handlers: Vec::new(),
            master_handlers: Vec::new(),
            schedules: Vec::new(),
            master_schedules: Vec::new(),
        }
    }

    /// Defaults to a fresh random id.
    pub fn service_id(mut self, service_id: ServiceId) -> Self {
        self.service_id = Some(service_id);
        self
    }

    pub fn policy(mut self, policy: CommandPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Defaults to `TracingCollector`.
    pub fn collector(mut self, collector: Arc<dyn DataCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Defaults to a `TokioScheduler`.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Required.
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn observer(self, observer: Arc<dyn CommandObserver>) -> Self {
        self.observers.subscribe(observer);
        self
    }

    pub fn handler(self, key: RoutingKey, handler: HandlerFn) -> Self {
        self.add_handler(key, handler, None, false)
    }

    pub fn handler_with_error(
        self,
        key: RoutingKey,
        handler: HandlerFn,
        error_handler: ErrorHandlerFn,
    ) -> Self {
        self.add_handler(key, handler, Some(error_handler), false)
    }

    /// A handler that is only routed while this instance is master.
    pub fn master_job_handler(self, key: RoutingKey, handler: HandlerFn) -> Self {
        self.add_handler(key, handler, None, true)
    }

    fn add_handler(
        mut self,
        key: RoutingKey,
        handler: HandlerFn,
        error_handler: Option<ErrorHandlerFn>,
        is_master_job: bool,
    ) -> Self {
        let definition = CommandDefinition {
            key,
            handler,
            error_handler,
            reference_id: None,
        };

        if is_master_job {
            self.master_handlers.push(definition);
        } else {
            self.handlers.push(definition);
        }
        self
    }

    /// Registered on `start`.
    pub fn schedule(mut self, definition: ScheduleDefinition) -> Self {
        self.schedules.push(definition);
        self
    }

    /// Registered whenever this instance becomes master.
    pub fn master_job_schedule(mut self, definition: ScheduleDefinition) -> Self {
        self.master_schedules.push(definition.master_job());
        self
    }

    /// # Errors
    /// `InvalidArgument` if the name is empty or no dispatcher was given.
    pub fn build(self) -> Result<Arc<Command>, CommandError> {
        if self.name.is_empty() {
            return Err(CommandError::InvalidArgument(
                "command name must not be empty".to_string(),
            ));
        }

        let dispatcher = self.dispatcher.ok_or_else(|| {
            CommandError::InvalidArgument(format!("command '{}' needs a dispatcher", self.name))
        })?;

        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => TokioScheduler::new(),
        };

        let registry = CommandRegistry::with_cache_capacity(
            self.observers.clone(),
            self.policy.route_cache_capacity,
        );
        for definition in &self.handlers {
            registry.register_definition(definition, false);
        }

        tracing::debug!(
            "Building command '{}' with {} handler(s), {} master-only handler(s)",
            self.name,
            self.handlers.len(),
            self.master_handlers.len()
        );

        Ok(Command::assemble(CommandParts {
            name: self.name,
            service_id: self.service_id.unwrap_or_default(),
            policy: self.policy,
            codec: self.codec,
            collector: self
                .collector
                .unwrap_or_else(|| Arc::new(TracingCollector)),
            dispatcher,
            registry,
            registrar: ScheduleRegistrar::new(scheduler, self.observers),
            master_commands: self.master_handlers,
            master_schedules: self.master_schedules,
            schedules: self.schedules,
        }))
    }
}
