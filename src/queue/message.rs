//! Message types for the delivery queues
//!
//! A message is an opaque byte payload plus a flat map of scalar attributes
//! that subscription filters are evaluated against. The header carries the
//! system metadata: id, queue sequence, enqueue timestamp, receive count and
//! the topic the message was published to.
//!
//! Each subscriber copy of a published message is a separate delivery with
//! its own id; `published_id` links the copies back to the publish.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// Unique message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Scalar attribute value used for filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl AttributeValue {
    /// Convert a JSON scalar; arrays, objects and null have no attribute form
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(AttributeValue::Number),
            serde_json::Value::String(s) => Some(AttributeValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Boolean(b) => write!(f, "{b}"),
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

/// Attribute map carried by every message
pub type Attributes = BTreeMap<String, AttributeValue>;

/// System metadata for a message
///
/// `sequence`, `timestamp` and `receive_count` are owned by the queue the
/// message currently lives in: `enqueue` assigns the first two and resets the
/// count to 0, `receive` increments the count.
#[derive(Debug, Clone)]
pub struct MessageHeader {
    pub id: MessageId,
    /// Monotonic per-queue enqueue sequence, starting at 1
    pub sequence: u64,
    /// Creation time, replaced by the enqueue time once queued
    pub timestamp: SystemTime,
    /// Topic the message was published through, if any
    pub topic_id: Option<String>,
    /// Id of the published message this copy was fanned out from
    pub published_id: Option<MessageId>,
    /// Number of times the message has been handed to a consumer
    pub receive_count: u32,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub header: MessageHeader,
    pub attributes: Attributes,
    pub body: Bytes,
}

impl Message {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            header: MessageHeader {
                id: MessageId::new(),
                sequence: 0,
                timestamp: SystemTime::now(),
                topic_id: None,
                published_id: None,
                receive_count: 0,
            },
            attributes: Attributes::new(),
            body: body.into(),
        }
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn id(&self) -> MessageId {
        self.header.id
    }

    pub fn published_id(&self) -> Option<MessageId> {
        self.header.published_id
    }

    pub fn receive_count(&self) -> u32 {
        self.header.receive_count
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Body as UTF-8, if it is valid UTF-8
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Independent copy for delivery into one subscriber queue
    pub(crate) fn copy_for_topic(&self, topic_id: &str) -> Self {
        let mut copy = self.clone();
        copy.header.id = MessageId::new();
        copy.header.published_id = Some(self.id());
        copy.header.topic_id = Some(topic_id.to_string());
        copy.header.receive_count = 0;
        copy.header.sequence = 0;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_creation() {
        let message = Message::new("{\"eventType\":\"typeA\"}")
            .with_attribute("eventType", "typeA")
            .with_attribute("priority", 3i64);

        assert_eq!(message.receive_count(), 0);
        assert_eq!(message.header.sequence, 0);
        assert!(message.header.topic_id.is_none());
        assert_eq!(
            message.attribute("eventType"),
            Some(&AttributeValue::String("typeA".to_string()))
        );
        assert_eq!(
            message.attribute("priority"),
            Some(&AttributeValue::Number(3.0))
        );
        assert_eq!(message.body_str(), Some("{\"eventType\":\"typeA\"}"));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::new("a");
        let b = Message::new("a");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_copy_for_topic_gets_own_id_and_resets_delivery_state() {
        let mut original = Message::new("payload");
        original.header.receive_count = 4;
        original.header.sequence = 9;

        let copy = original.copy_for_topic("MicroServiceOrchestratorTopic");

        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.published_id(), Some(original.id()));
        assert_eq!(copy.receive_count(), 0);
        assert_eq!(copy.header.sequence, 0);
        assert_eq!(
            copy.header.topic_id.as_deref(),
            Some("MicroServiceOrchestratorTopic")
        );
        assert_eq!(original.receive_count(), 4);
    }

    #[test]
    fn test_attribute_value_from_json() {
        assert_eq!(
            AttributeValue::from_json(&json!("typeB")),
            Some(AttributeValue::String("typeB".to_string()))
        );
        assert_eq!(
            AttributeValue::from_json(&json!(12)),
            Some(AttributeValue::Number(12.0))
        );
        assert_eq!(
            AttributeValue::from_json(&json!(true)),
            Some(AttributeValue::Boolean(true))
        );
        assert_eq!(AttributeValue::from_json(&json!(null)), None);
        assert_eq!(AttributeValue::from_json(&json!(["typeA"])), None);
        assert_eq!(AttributeValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_attribute_value_untagged_deserialization() {
        let values: Vec<AttributeValue> =
            serde_json::from_str("[\"typeA\", 2.5, 7, false]").unwrap();
        assert_eq!(
            values,
            vec![
                AttributeValue::String("typeA".to_string()),
                AttributeValue::Number(2.5),
                AttributeValue::Number(7.0),
                AttributeValue::Boolean(false),
            ]
        );
    }
}
