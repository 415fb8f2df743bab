use crate::message::types::now_ms;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::task::AbortHandle;

/// Type alias for the asynchronous body of a schedule.
pub type ScheduleFn = Arc<
    dyn Fn(Arc<CommandJobSchedule>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// Synchronous tear-up / tear-down hook.
pub type ScheduleHookFn = Arc<dyn Fn(&CommandJobSchedule) -> Result<()> + Send + Sync>;

/// Wraps a closure returning a future into a type-erased `ScheduleFn`.
pub fn schedule_fn<F, Fut>(execute: F) -> ScheduleFn
where
    F: Fn(Arc<CommandJobSchedule>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |schedule: Arc<CommandJobSchedule>| {
        Box::pin(execute(schedule)) as Pin<Box<dyn Future<Output = Result<()>> + Send>>
    })
}

pub fn schedule_hook<F>(hook: F) -> ScheduleHookFn
where
    F: Fn(&CommandJobSchedule) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(hook)
}

/// Opaque handle returned by a `Scheduler` registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchedulerHandle(pub String);

impl SchedulerHandle {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SchedulerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// When a schedule first runs and how often it repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerConfig {
    /// Repeat period. `None` runs the schedule once.
    pub interval: Option<Duration>,
    pub initial_delay: Option<Duration>,
    /// Wall-clock time of the first run. Takes precedence over `initial_delay`.
    pub initial_time: Option<SystemTime>,
}

impl TimerConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Self::default()
        }
    }

    pub fn once_after(delay: Duration) -> Self {
        Self {
            initial_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    pub fn starting_at(mut self, time: SystemTime) -> Self {
        self.initial_time = Some(time);
        self
    }

    /// Delay before the first run, measured from now.
    pub fn first_delay(&self) -> Duration {
        match self.initial_time {
            Some(time) => time
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO),
            None => self.initial_delay.unwrap_or(Duration::ZERO),
        }
    }
}

/// Everything needed to register a schedule. Kept by commands for master-only
/// schedules so they can be registered again each time mastership is gained.
#[derive(Clone)]
pub struct ScheduleDefinition {
    pub name: String,
    pub execute: ScheduleFn,
    pub timer: TimerConfig,
    pub is_long_running: bool,
    pub is_master_job: bool,
    pub tear_up: Option<ScheduleHookFn>,
    pub tear_down: Option<ScheduleHookFn>,
}

impl ScheduleDefinition {
    pub fn new(name: &str, timer: TimerConfig, execute: ScheduleFn) -> Self {
        Self {
            name: name.to_string(),
            execute,
            timer,
            is_long_running: false,
            is_master_job: false,
            tear_up: None,
            tear_down: None,
        }
    }

    pub fn long_running(mut self) -> Self {
        self.is_long_running = true;
        self
    }

    pub fn master_job(mut self) -> Self {
        self.is_master_job = true;
        self
    }

    pub fn with_tear_up(mut self, hook: ScheduleHookFn) -> Self {
        self.tear_up = Some(hook);
        self
    }

    pub fn with_tear_down(mut self, hook: ScheduleHookFn) -> Self {
        self.tear_down = Some(hook);
        self
    }
}

#[derive(Debug, Default)]
struct ScheduleCounters {
    executions: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
    last_run_ms: AtomicU64,
}

/// A schedule registered with a scheduler.
pub struct CommandJobSchedule {
    pub name: String,
    pub timer: TimerConfig,
    pub is_long_running: bool,
    pub is_master_job: bool,
    execute: ScheduleFn,
    tear_up: Option<ScheduleHookFn>,
    tear_down: Option<ScheduleHookFn>,
    /// Set while a run is in flight.
    active: AtomicBool,
    counters: ScheduleCounters,
    handle: Mutex<Option<SchedulerHandle>>,
}

/// Clears the running flag when a run ends, and stops the body if the run is dropped
/// before the body finishes.
struct RunGuard<'a> {
    active: &'a AtomicBool,
    body: AbortHandle,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.body.abort();
        self.active.store(false, Ordering::Release);
    }
}

impl CommandJobSchedule {
    pub fn from_definition(definition: ScheduleDefinition) -> Self {
        Self {
            name: definition.name,
            timer: definition.timer,
            is_long_running: definition.is_long_running,
            is_master_job: definition.is_master_job,
            execute: definition.execute,
            tear_up: definition.tear_up,
            tear_down: definition.tear_down,
            active: AtomicBool::new(false),
            counters: ScheduleCounters::default(),
            handle: Mutex::new(None),
        }
    }

    /// Runs the schedule body once.
    ///
    /// The body runs on its own task. Errors and panics are logged and counted as
    /// failures, never returned, so the scheduler loop outlives a broken schedule.
    /// Overlapping runs are skipped.
    pub async fn execute(self: Arc<Self>) {
        if self.active.swap(true, Ordering::AcqRel) {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Schedule '{}' still running, tick skipped", self.name);
            return;
        }

        self.counters.last_run_ms.store(now_ms(), Ordering::Relaxed);
        let body = tokio::spawn((self.execute)(self.clone()));
        let _run = RunGuard {
            active: &self.active,
            body: body.abort_handle(),
        };

        let result = match body.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("schedule body aborted: {}", e)),
        };

        self.counters.executions.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = result {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!("Schedule '{}' failed: {:#}", self.name, e);
        }
    }

    pub fn run_tear_up(&self) {
        if let Some(hook) = &self.tear_up
            && let Err(e) = hook(self)
        {
            tracing::warn!("Tear-up of schedule '{}' failed: {:#}", self.name, e);
        }
    }

    pub fn run_tear_down(&self) {
        if let Some(hook) = &self.tear_down
            && let Err(e) = hook(self)
        {
            tracing::warn!("Tear-down of schedule '{}' failed: {:#}", self.name, e);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn executions(&self) -> u64 {
        self.counters.executions.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }

    pub(crate) fn set_handle(&self, handle: Option<SchedulerHandle>) {
        *self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = handle;
    }

    pub(crate) fn take_handle(&self) -> Option<SchedulerHandle> {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub fn statistics(&self) -> ScheduleStatistics {
        ScheduleStatistics {
            name: self.name.clone(),
            is_master_job: self.is_master_job,
            is_long_running: self.is_long_running,
            interval_ms: self.timer.interval.map(|d| d.as_millis() as u64),
            executions: self.executions(),
            failures: self.failures(),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            last_run_ms: match self.counters.last_run_ms.load(Ordering::Relaxed) {
                0 => None,
                ms => Some(ms),
            },
        }
    }
}

impl std::fmt::Debug for CommandJobSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandJobSchedule")
            .field("name", &self.name)
            .field("timer", &self.timer)
            .field("is_long_running", &self.is_long_running)
            .field("is_master_job", &self.is_master_job)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleStatistics {
    pub name: String,
    pub is_master_job: bool,
    pub is_long_running: bool,
    pub interval_ms: Option<u64>,
    pub executions: u64,
    pub failures: u64,
    pub skipped: u64,
    pub last_run_ms: Option<u64>,
}
