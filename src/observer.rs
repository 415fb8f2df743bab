//! Registration Observers
//!
//! Containers subscribe to command and schedule (un)registrations through the
//! `CommandObserver` trait. A failing observer is logged and skipped; it never blocks
//! the registration that triggered it.

use crate::message::types::RoutingKey;

use anyhow::Result;
use std::sync::{Arc, RwLock};

pub trait CommandObserver: Send + Sync {
    fn command_added(&self, _key: &RoutingKey, _is_master_job: bool) -> Result<()> {
        Ok(())
    }

    fn command_removed(&self, _key: &RoutingKey, _is_master_job: bool) -> Result<()> {
        Ok(())
    }

    fn schedule_added(&self, _name: &str, _is_master_job: bool) -> Result<()> {
        Ok(())
    }

    fn schedule_removed(&self, _name: &str, _is_master_job: bool) -> Result<()> {
        Ok(())
    }
}

/// Shared, clonable list of observers used by both the registry and the registrar.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Arc<RwLock<Vec<Arc<dyn CommandObserver>>>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn CommandObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes `notify` on every observer, logging failures.
    pub fn notify<F>(&self, event: &str, notify: F)
    where
        F: Fn(&dyn CommandObserver) -> Result<()>,
    {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for observer in observers {
            if let Err(e) = notify(observer.as_ref()) {
                tracing::warn!("Observer failed to handle {}: {}", event, e);
            }
        }
    }
}
