//! Message Module Tests
//!
//! ## Test Scopes
//! - **Routing Keys**: Case-insensitive normalisation and asymmetric wildcard matching.
//! - **Envelope**: Reply construction and originator identification.
//! - **Codec**: JSON and bincode payload handling.

#[cfg(test)]
mod tests {
    use crate::message::codec::PayloadCodec;
    use crate::message::types::{MessageHeader, ResponseRouting, RoutingKey, ServiceId, ServiceMessage};
    use serde::{Deserialize, Serialize};

    // ============================================================
    // ROUTING KEY TESTS
    // ============================================================

    #[test]
    fn test_routing_key_is_case_insensitive() {
        let key = RoutingKey::exact("Orders", "INVOICE", "Create");
        let header = MessageHeader::new("orders", "invoice", "CREATE");

        assert!(key.matches(&header));
        assert_eq!(key, RoutingKey::exact("orders", "invoice", "create"));
    }

    #[test]
    fn test_wildcard_fields_match_any_value() {
        let key = RoutingKey::new(Some("orders"), None, None);

        assert!(key.matches(&MessageHeader::new("orders", "invoice", "create")));
        assert!(key.matches(&MessageHeader::new("orders", "refund", "delete")));
        assert!(!key.matches(&MessageHeader::new("billing", "invoice", "create")));
    }

    #[test]
    fn test_concrete_key_does_not_match_other_values() {
        let key = RoutingKey::exact("orders", "invoice", "create");

        assert!(!key.matches(&MessageHeader::new("orders", "invoice", "delete")));
    }

    #[test]
    fn test_routing_key_display_marks_wildcards() {
        let key = RoutingKey::new(Some("orders"), None, Some("create"));
        assert_eq!(key.to_string(), "orders/*/create");
    }

    // ============================================================
    // ENVELOPE TESTS
    // ============================================================

    #[test]
    fn test_reply_is_addressed_to_response_routing() {
        let client = ServiceId("client".to_string());
        let server = ServiceId("server".to_string());

        let request = ServiceMessage::new("orders", "invoice", "create", &client)
            .with_response(ResponseRouting::new("response", "billing", "reply"));

        let reply = request.reply(&server, 200, "ok").expect("reply routing present");

        assert_eq!(reply.channel_id, "response");
        assert_eq!(reply.message_type, "billing");
        assert_eq!(reply.correlation_key.as_deref(), Some(request.originator_key.as_str()));
        assert_eq!(reply.status, Some(200));
        assert!(reply.is_from(&server));
    }

    #[test]
    fn test_reply_without_response_routing_is_none() {
        let client = ServiceId::new();
        let request = ServiceMessage::new("orders", "invoice", "create", &client);

        assert!(request.reply(&client, 200, "ok").is_none());
    }

    #[test]
    fn test_originator_keys_are_unique() {
        let id = ServiceId::new();
        let a = ServiceMessage::new("c", "t", "a", &id);
        let b = ServiceMessage::new("c", "t", "a", &id);

        assert_ne!(a.originator_key, b.originator_key);
    }

    // ============================================================
    // CODEC TESTS
    // ============================================================

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Invoice {
        id: u32,
        customer: String,
    }

    #[test]
    fn test_codecs_restore_payload() {
        let invoice = Invoice {
            id: 7,
            customer: "ACME".to_string(),
        };

        for codec in [PayloadCodec::Json, PayloadCodec::Bincode] {
            let bytes = codec.serialize(&invoice).expect("serialize");
            let restored: Invoice = codec.deserialize(&bytes).expect("deserialize");
            assert_eq!(restored, invoice);
        }
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        let result: Result<Invoice, _> = PayloadCodec::Json.deserialize(b"not json");
        assert!(result.is_err());
    }
}
