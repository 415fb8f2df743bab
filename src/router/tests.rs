//! Router Module Tests
//!
//! ## Test Scopes
//! - **Resolution**: Concrete keys, wildcard keys and the first-registered tie-break.
//! - **Lifecycle**: Unregistration, cache coherence after table changes and the cache
//!   bound.
//! - **Observers**: Notifications, including observers that fail.
//! - **Execution**: Invoking a resolved handler and building replies.

#[cfg(test)]
mod tests {
    use crate::message::codec::PayloadCodec;
    use crate::message::types::{MessageHeader, ResponseRouting, RoutingKey, ServiceId, ServiceMessage};
    use crate::observer::{CommandObserver, ObserverSet};
    use crate::router::registry::CommandRegistry;
    use crate::router::types::{CommandRequest, HandlerFn, handler_fn};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop() -> HandlerFn {
        handler_fn(|_request| async { Ok(Vec::new()) })
    }

    fn register(registry: &CommandRegistry, key: RoutingKey, reference: &str) {
        registry.register(key, noop(), None, Some(reference.to_string()), false);
    }

    fn resolved_reference(registry: &CommandRegistry, header: &MessageHeader) -> Option<String> {
        registry
            .resolve(header)
            .and_then(|entry| entry.reference_id.clone())
    }

    // ============================================================
    // TEST 1: Resolution
    // ============================================================

    #[test]
    fn test_disjoint_concrete_keys_resolve_uniquely() {
        // ARRANGE
        let registry = CommandRegistry::default();
        register(&registry, RoutingKey::exact("orders", "invoice", "create"), "create");
        register(&registry, RoutingKey::exact("orders", "invoice", "delete"), "delete");

        // ACT & ASSERT
        assert_eq!(
            resolved_reference(&registry, &MessageHeader::new("orders", "invoice", "create")),
            Some("create".to_string())
        );
        assert_eq!(
            resolved_reference(&registry, &MessageHeader::new("orders", "invoice", "delete")),
            Some("delete".to_string())
        );
        assert!(registry.resolve(&MessageHeader::new("orders", "invoice", "update")).is_none());
    }

    #[test]
    fn test_overlapping_wildcards_first_registered_wins() {
        // ARRANGE: The broad key is registered before the specific one.
        let registry = CommandRegistry::default();
        register(&registry, RoutingKey::new(Some("orders"), None, None), "broad");
        register(&registry, RoutingKey::exact("orders", "invoice", "create"), "specific");

        // ACT
        let winner = resolved_reference(&registry, &MessageHeader::new("orders", "invoice", "create"));

        // ASSERT
        assert_eq!(winner, Some("broad".to_string()));
    }

    #[test]
    fn test_resolution_is_case_insensitive() {
        let registry = CommandRegistry::default();
        register(&registry, RoutingKey::exact("Orders", "Invoice", "Create"), "create");

        let header = MessageHeader::new("ORDERS", "invoice", "cReAtE");
        assert_eq!(resolved_reference(&registry, &header), Some("create".to_string()));
    }

    #[test]
    fn test_duplicate_keys_are_permitted() {
        let registry = CommandRegistry::default();
        let key = RoutingKey::exact("orders", "invoice", "create");
        register(&registry, key.clone(), "first");
        register(&registry, key.clone(), "second");

        assert_eq!(registry.len(), 2);
        assert_eq!(
            resolved_reference(&registry, &MessageHeader::new("orders", "invoice", "create")),
            Some("first".to_string())
        );
    }

    // ============================================================
    // TEST 2: Unregistration and cache coherence
    // ============================================================

    #[test]
    fn test_register_then_unregister_resolves_none() {
        // ARRANGE
        let registry = CommandRegistry::default();
        let key = RoutingKey::exact("orders", "invoice", "create");
        register(&registry, key.clone(), "create");
        let header = MessageHeader::new("orders", "invoice", "create");
        assert!(registry.resolve(&header).is_some());

        // ACT
        let removed = registry.unregister(&key, false);

        // ASSERT
        assert!(removed);
        assert!(registry.resolve(&header).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_key_is_noop() {
        let registry = CommandRegistry::default();
        register(&registry, RoutingKey::exact("orders", "invoice", "create"), "create");

        assert!(!registry.unregister(&RoutingKey::exact("orders", "invoice", "delete"), false));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_respects_master_job_flag() {
        let registry = CommandRegistry::default();
        let key = RoutingKey::exact("orders", "invoice", "create");
        register(&registry, key.clone(), "normal");

        assert!(!registry.unregister(&key, true));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_falls_through_to_next_match() {
        // ARRANGE
        let registry = CommandRegistry::default();
        let broad = RoutingKey::new(Some("orders"), None, None);
        register(&registry, broad.clone(), "broad");
        register(&registry, RoutingKey::exact("orders", "invoice", "create"), "specific");
        let header = MessageHeader::new("orders", "invoice", "create");
        assert_eq!(resolved_reference(&registry, &header), Some("broad".to_string()));

        // ACT
        registry.unregister(&broad, false);

        // ASSERT: The cached hit was evicted with its entry.
        assert_eq!(resolved_reference(&registry, &header), Some("specific".to_string()));
    }

    #[test]
    fn test_cached_miss_is_refreshed_by_registration() {
        // ARRANGE
        let registry = CommandRegistry::default();
        register(&registry, RoutingKey::exact("orders", "invoice", "delete"), "delete");
        let header = MessageHeader::new("orders", "invoice", "create");
        assert!(registry.resolve(&header).is_none());
        assert_eq!(registry.cached_headers(), 1);

        // ACT
        register(&registry, RoutingKey::exact("orders", "invoice", "create"), "late");

        // ASSERT
        assert_eq!(resolved_reference(&registry, &header), Some("late".to_string()));
    }

    #[test]
    fn test_misses_on_unknown_channels_are_not_cached() {
        // ARRANGE
        let registry = CommandRegistry::default();
        register(&registry, RoutingKey::new(Some("orders"), None, None), "orders");

        // ACT: Traffic for channels nobody listens on.
        for i in 0..100 {
            let header = MessageHeader::new(&format!("noise-{}", i), "chatter", "emit");
            assert!(registry.resolve(&header).is_none());
        }

        // ASSERT
        assert_eq!(registry.cached_headers(), 0);
        assert!(registry.resolve(&MessageHeader::new("orders", "x", "y")).is_some());
        assert_eq!(registry.cached_headers(), 1);
    }

    #[test]
    fn test_wildcard_channel_keeps_misses_cacheable() {
        let registry = CommandRegistry::default();
        register(&registry, RoutingKey::new(None, Some("invoice"), None), "any-channel");

        assert!(registry.resolve(&MessageHeader::new("billing", "refund", "create")).is_none());

        assert_eq!(registry.cached_headers(), 1);
    }

    #[test]
    fn test_cache_stops_growing_at_capacity() {
        // ARRANGE
        let registry = CommandRegistry::with_cache_capacity(ObserverSet::new(), 8);
        register(&registry, RoutingKey::new(Some("orders"), None, None), "orders");

        // ACT
        for i in 0..50 {
            let header = MessageHeader::new("orders", &format!("type-{}", i), "create");
            assert_eq!(resolved_reference(&registry, &header), Some("orders".to_string()));
        }

        // ASSERT: Uncached headers still resolve.
        assert_eq!(registry.cached_headers(), 8);
        let late = MessageHeader::new("orders", "type-49", "create");
        assert_eq!(resolved_reference(&registry, &late), Some("orders".to_string()));
    }

    #[test]
    fn test_supported_keys_snapshot_in_registration_order() {
        let registry = CommandRegistry::default();
        register(&registry, RoutingKey::exact("a", "b", "c"), "1");
        register(&registry, RoutingKey::new(Some("x"), None, None), "2");

        let keys = registry.supported_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], RoutingKey::exact("a", "b", "c"));
        assert_eq!(keys[1], RoutingKey::new(Some("x"), None, None));
    }

    // ============================================================
    // TEST 3: Observers
    // ============================================================

    struct CountingObserver {
        added: AtomicUsize,
        removed: AtomicUsize,
    }

    impl CommandObserver for CountingObserver {
        fn command_added(&self, _key: &RoutingKey, _is_master_job: bool) -> anyhow::Result<()> {
            self.added.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn command_removed(&self, _key: &RoutingKey, _is_master_job: bool) -> anyhow::Result<()> {
            self.removed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingObserver;

    impl CommandObserver for FailingObserver {
        fn command_added(&self, _key: &RoutingKey, _is_master_job: bool) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("observer is broken"))
        }
    }

    #[test]
    fn test_observers_are_notified_and_failures_are_contained() {
        // ARRANGE
        let observers = ObserverSet::new();
        let counting = Arc::new(CountingObserver {
            added: AtomicUsize::new(0),
            removed: AtomicUsize::new(0),
        });
        observers.subscribe(Arc::new(FailingObserver));
        observers.subscribe(counting.clone());
        let registry = CommandRegistry::new(observers);
        let key = RoutingKey::exact("orders", "invoice", "create");

        // ACT
        register(&registry, key.clone(), "create");
        registry.unregister(&key, false);

        // ASSERT: The failing observer did not stop the registration or the next observer.
        assert_eq!(counting.added.load(Ordering::SeqCst), 1);
        assert_eq!(counting.removed.load(Ordering::SeqCst), 1);
    }

    // ============================================================
    // TEST 4: Handler execution
    // ============================================================

    #[tokio::test]
    async fn test_resolved_handler_builds_reply() {
        // ARRANGE
        let registry = CommandRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        registry.register(
            RoutingKey::exact("orders", "invoice", "total"),
            handler_fn(move |request: CommandRequest| {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let amounts: Vec<u32> = request.payload()?;
                    let total: u32 = amounts.iter().sum();
                    Ok(request.reply(200, "ok", &total)?.into_iter().collect())
                }
            }),
            None,
            None,
            false,
        );

        let client = ServiceId::new();
        let message = ServiceMessage::new("orders", "invoice", "total", &client)
            .with_blob(PayloadCodec::Json.serialize(&vec![1u32, 2, 3]).unwrap())
            .with_response(ResponseRouting::new("response", "client", "reply"));

        // ACT
        let entry = registry.resolve(&message.header()).expect("handler registered");
        let request = CommandRequest::new(message.clone(), ServiceId::new(), PayloadCodec::Json);
        let replies = (entry.handler)(request).await.unwrap();

        // ASSERT
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(replies.len(), 1);
        let total: u32 = PayloadCodec::Json.deserialize(&replies[0].blob).unwrap();
        assert_eq!(total, 6);
        assert_eq!(
            replies[0].correlation_key.as_deref(),
            Some(message.originator_key.as_str())
        );
    }
}
