//! Scheduler Implementations
//!
//! The engine never creates its own execution threads: every recurring callback goes
//! through a `Scheduler`. `TokioScheduler` drives schedules from background tasks the
//! way the rest of the node runs its loops; `ManualScheduler` lets a host (or a test)
//! decide exactly when each schedule runs.

use super::types::{CommandJobSchedule, SchedulerHandle};

use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub trait Scheduler: Send + Sync {
    fn register(&self, schedule: Arc<CommandJobSchedule>) -> SchedulerHandle;

    /// Stops a schedule. Returns `false` for unknown handles.
    fn unregister(&self, handle: &SchedulerHandle) -> bool;
}

/// Runs each schedule on its own tokio task.
///
/// Long-running schedules execute on a further spawned task so the timer keeps ticking;
/// ticks that land while a run is still in flight are skipped.
#[derive(Default)]
pub struct TokioScheduler {
    tasks: DashMap<SchedulerHandle, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    async fn run_loop(schedule: Arc<CommandJobSchedule>) {
        let first_delay = schedule.timer.first_delay();
        if !first_delay.is_zero() {
            tokio::time::sleep(first_delay).await;
        }

        let Some(interval) = schedule.timer.interval else {
            Self::run_once(&schedule).await;
            tracing::debug!("One-shot schedule '{}' finished", schedule.name);
            return;
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            Self::run_once(&schedule).await;
        }
    }

    async fn run_once(schedule: &Arc<CommandJobSchedule>) {
        if schedule.is_long_running {
            let schedule = schedule.clone();
            tokio::spawn(async move {
                schedule.execute().await;
            });
        } else {
            schedule.clone().execute().await;
        }
    }
}

impl Scheduler for TokioScheduler {
    fn register(&self, schedule: Arc<CommandJobSchedule>) -> SchedulerHandle {
        let handle = SchedulerHandle::new();

        tracing::debug!(
            "Starting schedule '{}' (interval {:?}, first run in {:?})",
            schedule.name,
            schedule.timer.interval,
            schedule.timer.first_delay()
        );

        let task = tokio::spawn(Self::run_loop(schedule));
        self.tasks.insert(handle.clone(), task);

        handle
    }

    fn unregister(&self, handle: &SchedulerHandle) -> bool {
        match self.tasks.remove(handle) {
            Some((_, task)) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

/// Records schedules without running them; the host triggers runs by name.
#[derive(Default)]
pub struct ManualScheduler {
    schedules: DashMap<SchedulerHandle, Arc<CommandJobSchedule>>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Runs every registered schedule called `name` once, awaiting each run.
    ///
    /// # Returns
    /// The number of schedules that ran.
    pub async fn trigger(&self, name: &str) -> usize {
        let matching: Vec<Arc<CommandJobSchedule>> = self
            .schedules
            .iter()
            .filter(|entry| entry.value().name == name)
            .map(|entry| entry.value().clone())
            .collect();

        for schedule in &matching {
            schedule.clone().execute().await;
        }

        matching.len()
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schedules
            .iter()
            .map(|entry| entry.value().name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.schedules.iter().any(|entry| entry.value().name == name)
    }
}

impl Scheduler for ManualScheduler {
    fn register(&self, schedule: Arc<CommandJobSchedule>) -> SchedulerHandle {
        let handle = SchedulerHandle::new();
        self.schedules.insert(handle.clone(), schedule);
        handle
    }

    fn unregister(&self, handle: &SchedulerHandle) -> bool {
        self.schedules.remove(handle).is_some()
    }
}
