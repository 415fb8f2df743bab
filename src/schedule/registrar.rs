//! Schedule Registrar
//!
//! Thin adapter between a command and its `Scheduler`: every schedule the command owns
//! is registered through here so it can be torn down symmetrically.

use super::scheduler::Scheduler;
use super::types::*;
use crate::observer::ObserverSet;

use std::sync::{Arc, Mutex, MutexGuard};

pub struct ScheduleRegistrar {
    scheduler: Arc<dyn Scheduler>,
    schedules: Mutex<Vec<Arc<CommandJobSchedule>>>,
    observers: ObserverSet,
}

impl ScheduleRegistrar {
    pub fn new(scheduler: Arc<dyn Scheduler>, observers: ObserverSet) -> Self {
        Self {
            scheduler,
            schedules: Mutex::new(Vec::new()),
            observers,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<CommandJobSchedule>>> {
        self.schedules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs the tear-up hook, hands the schedule to the scheduler and tracks it.
    ///
    /// A failing tear-up hook is logged; the schedule is still registered.
    pub fn register_schedule(&self, definition: ScheduleDefinition) -> Arc<CommandJobSchedule> {
        let schedule = Arc::new(CommandJobSchedule::from_definition(definition));

        schedule.run_tear_up();

        let handle = self.scheduler.register(schedule.clone());
        schedule.set_handle(Some(handle));
        self.lock().push(schedule.clone());

        tracing::info!(
            "Registered schedule '{}' (master job: {}, long running: {})",
            schedule.name,
            schedule.is_master_job,
            schedule.is_long_running
        );

        self.observers.notify("schedule_added", |observer| {
            observer.schedule_added(&schedule.name, schedule.is_master_job)
        });

        schedule
    }

    /// Runs the tear-down hook, stops the schedule and forgets it.
    ///
    /// # Returns
    /// `false` if the schedule was not registered here.
    pub fn unregister_schedule(&self, schedule: &Arc<CommandJobSchedule>) -> bool {
        let removed = {
            let mut schedules = self.lock();
            match schedules.iter().position(|s| Arc::ptr_eq(s, schedule)) {
                Some(index) => {
                    schedules.remove(index);
                    true
                }
                None => false,
            }
        };

        if !removed {
            tracing::debug!("Schedule '{}' is not registered", schedule.name);
            return false;
        }

        schedule.run_tear_down();

        if let Some(handle) = schedule.take_handle()
            && !self.scheduler.unregister(&handle)
        {
            tracing::warn!("Scheduler did not know schedule '{}'", schedule.name);
        }

        tracing::info!("Unregistered schedule '{}'", schedule.name);

        self.observers.notify("schedule_removed", |observer| {
            observer.schedule_removed(&schedule.name, schedule.is_master_job)
        });

        true
    }

    /// Registers each definition as a master-only schedule.
    pub fn master_job_schedules_start(&self, definitions: &[ScheduleDefinition]) -> usize {
        for definition in definitions {
            self.register_schedule(definition.clone().master_job());
        }
        definitions.len()
    }

    /// Unregisters every master-only schedule.
    pub fn master_job_schedules_stop(&self) -> usize {
        self.tear_down_where(|schedule| schedule.is_master_job)
    }

    /// Unregisters every schedule.
    pub fn tear_down(&self) -> usize {
        self.tear_down_where(|_| true)
    }

    fn tear_down_where<F>(&self, filter: F) -> usize
    where
        F: Fn(&CommandJobSchedule) -> bool,
    {
        let selected: Vec<Arc<CommandJobSchedule>> = self
            .lock()
            .iter()
            .filter(|schedule| filter(schedule))
            .cloned()
            .collect();

        selected
            .iter()
            .filter(|schedule| self.unregister_schedule(schedule))
            .count()
    }

    /// Snapshot of tracked schedules; `master_only` restricts it to master jobs.
    pub fn schedules(&self, master_only: bool) -> Vec<Arc<CommandJobSchedule>> {
        self.lock()
            .iter()
            .filter(|schedule| !master_only || schedule.is_master_job)
            .cloned()
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<Arc<CommandJobSchedule>> {
        self.lock()
            .iter()
            .find(|schedule| schedule.name == name)
            .cloned()
    }

    pub fn statistics(&self) -> Vec<ScheduleStatistics> {
        self.lock()
            .iter()
            .map(|schedule| schedule.statistics())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
