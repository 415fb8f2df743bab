//! Command Handler Registry
//!
//! An ordered table of `HandlerEntry` values keyed by wildcard-capable `RoutingKey`s,
//! fronted by a per-header lookup cache.
//!
//! Registration is rare (normally at start-up, or when mastership changes) and takes a
//! write lock on the table. Resolution is the hot path: it reads the `DashMap` cache
//! first and only scans the table on a miss.
//!
//! The cache is bounded. Misses are remembered only for channels some key listens on,
//! and once `cache_capacity` headers are held new resolutions are no longer stored.

use super::types::*;
use crate::message::types::{MessageHeader, RoutingKey};
use crate::observer::ObserverSet;

use dashmap::DashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default bound on cached header resolutions.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Registry holding the routing table of one command.
pub struct CommandRegistry {
    /// Handlers in registration order. First match wins.
    entries: RwLock<Vec<Arc<HandlerEntry>>>,
    /// Resolution result per concrete header. `None` caches a miss.
    cache: DashMap<MessageHeader, Option<Arc<HandlerEntry>>>,
    cache_capacity: usize,
    observers: ObserverSet,
}

impl CommandRegistry {
    /// Creates a new, empty registry.
    pub fn new(observers: ObserverSet) -> Self {
        Self::with_cache_capacity(observers, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(observers: ObserverSet, cache_capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            cache: DashMap::new(),
            cache_capacity,
            observers,
        }
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, Vec<Arc<HandlerEntry>>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Vec<Arc<HandlerEntry>>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a handler for `key`. Duplicate keys are permitted.
    ///
    /// Cached hits stay valid because an appended entry can never precede an existing
    /// first match. Cached misses are dropped so the new key becomes reachable.
    pub fn register(
        &self,
        key: RoutingKey,
        handler: HandlerFn,
        error_handler: Option<ErrorHandlerFn>,
        reference_id: Option<String>,
        is_master_job: bool,
    ) -> Arc<HandlerEntry> {
        let entry = Arc::new(HandlerEntry {
            key: key.clone(),
            handler,
            error_handler,
            reference_id,
            is_master_job,
            counters: HandlerCounters::default(),
        });

        {
            let mut entries = self.write_entries();
            entries.push(entry.clone());
            self.cache.retain(|_, cached| cached.is_some());
        }

        tracing::info!(
            "Registered command handler: {} (master job: {})",
            key,
            is_master_job
        );

        self.observers.notify("command_added", |observer| {
            observer.command_added(&key, is_master_job)
        });

        entry
    }

    /// Registers a stored definition.
    pub fn register_definition(
        &self,
        definition: &CommandDefinition,
        is_master_job: bool,
    ) -> Arc<HandlerEntry> {
        self.register(
            definition.key.clone(),
            definition.handler.clone(),
            definition.error_handler.clone(),
            definition.reference_id.clone(),
            is_master_job,
        )
    }

    /// Removes the first entry with an equal key and the same master-job flag.
    ///
    /// # Returns
    /// * `true` if an entry was removed, `false` if nothing matched.
    pub fn unregister(&self, key: &RoutingKey, is_master_job: bool) -> bool {
        {
            let mut entries = self.write_entries();
            let Some(index) = entries
                .iter()
                .position(|entry| &entry.key == key && entry.is_master_job == is_master_job)
            else {
                tracing::debug!("Unregister ignored, no handler for {}", key);
                return false;
            };
            let removed = entries.remove(index);

            // A header routed to the removed entry may now resolve to a later one.
            self.cache.retain(|_, cached| match cached {
                Some(entry) => !Arc::ptr_eq(entry, &removed),
                None => true,
            });
        }

        tracing::info!("Unregistered command handler: {}", key);

        self.observers.notify("command_removed", |observer| {
            observer.command_removed(key, is_master_job)
        });

        true
    }

    /// Returns the first registered handler matching `header`, if any.
    pub fn resolve(&self, header: &MessageHeader) -> Option<Arc<HandlerEntry>> {
        if let Some(cached) = self.cache.get(header) {
            return cached.value().clone();
        }

        // The read guard is held across the insert so a concurrent registration
        // cannot clear misses before a stale one lands.
        let entries = self.read_entries();
        let resolved = entries
            .iter()
            .find(|entry| entry.key.matches(header))
            .cloned();

        match &resolved {
            Some(entry) => tracing::trace!("Resolved {} to {}", header, entry.key),
            None => tracing::trace!("No handler for {}", header),
        }

        let listened = resolved.is_some()
            || entries.iter().any(|entry| {
                entry
                    .key
                    .channel_id
                    .as_deref()
                    .is_none_or(|channel| channel == header.channel_id)
            });
        if listened && self.cache.len() < self.cache_capacity {
            self.cache.insert(header.clone(), resolved.clone());
        }
        drop(entries);
        resolved
    }

    /// Snapshot of registered keys in registration order.
    pub fn supported_keys(&self) -> Vec<RoutingKey> {
        self.read_entries()
            .iter()
            .map(|entry| entry.key.clone())
            .collect()
    }

    pub fn handler_statistics(&self) -> Vec<HandlerStatistics> {
        self.read_entries()
            .iter()
            .map(|entry| entry.statistics())
            .collect()
    }

    /// Returns the total number of registered handlers.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of header shapes currently cached.
    pub fn cached_headers(&self) -> usize {
        self.cache.len()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(ObserverSet::new())
    }
}
