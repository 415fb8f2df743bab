use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a running service instance.
///
/// Every replica of a command gets its own id; the negotiation protocol compares it
/// against `ServiceMessage::originator_service_id` to recognise its own broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ServiceId(pub String);

impl ServiceId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalise(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Where the receiver of a request should send its reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseRouting {
    pub channel_id: String,
    pub message_type: String,
    pub action_type: String,
}

impl ResponseRouting {
    pub fn new(channel_id: &str, message_type: &str, action_type: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            message_type: message_type.to_string(),
            action_type: action_type.to_string(),
        }
    }
}

/// The addressed envelope carried by the transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceMessage {
    pub channel_id: String,
    pub message_type: String,
    pub action_type: String,
    /// Unique key of this message. Outgoing requests derive their correlation id from it.
    pub originator_key: String,
    /// The service instance that emitted the message.
    pub originator_service_id: String,
    /// For responses: the `originator_key` of the request being answered.
    pub correlation_key: Option<String>,
    pub priority: u8,
    pub response: Option<ResponseRouting>,
    pub delivery_count: u32,
    pub status: Option<u16>,
    pub status_description: Option<String>,
    /// Loop the message back into the sending command instead of the transport.
    #[serde(default)]
    pub route_internal: bool,
    pub blob: Vec<u8>,
}

impl ServiceMessage {
    pub fn new(
        channel_id: &str,
        message_type: &str,
        action_type: &str,
        originator_service_id: &ServiceId,
    ) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            message_type: message_type.to_string(),
            action_type: action_type.to_string(),
            originator_key: uuid::Uuid::new_v4().to_string(),
            originator_service_id: originator_service_id.0.clone(),
            correlation_key: None,
            priority: 1,
            response: None,
            delivery_count: 0,
            status: None,
            status_description: None,
            route_internal: false,
            blob: Vec::new(),
        }
    }

    pub fn with_blob(mut self, blob: Vec<u8>) -> Self {
        self.blob = blob;
        self
    }

    pub fn with_response(mut self, response: ResponseRouting) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_status(mut self, status: u16, description: &str) -> Self {
        self.status = Some(status);
        self.status_description = Some(description.to_string());
        self
    }

    /// The normalised routing triple used for handler resolution.
    pub fn header(&self) -> MessageHeader {
        MessageHeader::new(&self.channel_id, &self.message_type, &self.action_type)
    }

    pub fn is_from(&self, service_id: &ServiceId) -> bool {
        self.originator_service_id == service_id.0
    }

    /// Builds the reply envelope for this message, addressed to its response routing.
    ///
    /// Returns `None` when the sender did not ask for a reply.
    pub fn reply(&self, from: &ServiceId, status: u16, description: &str) -> Option<ServiceMessage> {
        let routing = self.response.as_ref()?;

        let mut reply = ServiceMessage::new(
            &routing.channel_id,
            &routing.message_type,
            &routing.action_type,
            from,
        )
        .with_status(status, description);

        reply.correlation_key = Some(self.originator_key.clone());
        reply.priority = self.priority;
        reply.route_internal = self.route_internal;

        Some(reply)
    }
}

/// The concrete `(channel, type, action)` triple of an inbound message, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHeader {
    pub channel_id: String,
    pub message_type: String,
    pub action_type: String,
}

impl MessageHeader {
    pub fn new(channel_id: &str, message_type: &str, action_type: &str) -> Self {
        Self {
            channel_id: normalise(channel_id),
            message_type: normalise(message_type),
            action_type: normalise(action_type),
        }
    }
}

impl fmt::Display for MessageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.channel_id, self.message_type, self.action_type)
    }
}

/// A registered routing key. `None` fields are wildcards.
///
/// Matching is asymmetric: a key matches a concrete header, never another key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    pub channel_id: Option<String>,
    pub message_type: Option<String>,
    pub action_type: Option<String>,
}

impl RoutingKey {
    pub fn new(channel_id: Option<&str>, message_type: Option<&str>, action_type: Option<&str>) -> Self {
        Self {
            channel_id: channel_id.map(normalise),
            message_type: message_type.map(normalise),
            action_type: action_type.map(normalise),
        }
    }

    /// A fully concrete key.
    pub fn exact(channel_id: &str, message_type: &str, action_type: &str) -> Self {
        Self::new(Some(channel_id), Some(message_type), Some(action_type))
    }

    pub fn matches(&self, header: &MessageHeader) -> bool {
        fn field(key: &Option<String>, value: &str) -> bool {
            key.as_deref().is_none_or(|k| k == value)
        }

        field(&self.channel_id, &header.channel_id)
            && field(&self.message_type, &header.message_type)
            && field(&self.action_type, &header.action_type)
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.channel_id.as_deref().unwrap_or("*"),
            self.message_type.as_deref().unwrap_or("*"),
            self.action_type.as_deref().unwrap_or("*")
        )
    }
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
