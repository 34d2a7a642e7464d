use crate::queue::api::{AttributeValue, Attributes, Message};
use crate::topic::api::Topic;
use serde_json::Value;
use std::sync::Arc;

/// Top-level event fields copied into message attributes by default
pub const DEFAULT_ATTRIBUTE_FIELDS: &[&str] = &["eventType"];

/// Response bodies, JSON-encoded strings
pub const SUCCESS_BODY: &str = "\"Message sent to topic successfully.\"";
pub const FAILURE_BODY: &str = "\"Failed to send message to topic.\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerResponse {
    pub status_code: u16,
    pub body: String,
}

impl ProducerResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: SUCCESS_BODY.to_string(),
        }
    }

    pub fn failure() -> Self {
        Self {
            status_code: 500,
            body: FAILURE_BODY.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

pub struct ProducerAdapter {
    topic: Arc<Topic>,
    attribute_fields: Vec<String>,
}

impl ProducerAdapter {
    pub fn new(topic: Arc<Topic>) -> Self {
        Self {
            topic,
            attribute_fields: DEFAULT_ATTRIBUTE_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_attribute_fields(mut self, fields: Vec<String>) -> Self {
        self.attribute_fields = fields;
        self
    }

    pub fn attribute_fields(&self) -> &[String] {
        &self.attribute_fields
    }

    /// Build the message an event is published as
    ///
    /// The body is the compact JSON serialisation of the whole event. Only
    /// configured top-level fields with scalar values become attributes; a
    /// non-object event carries no attributes.
    pub fn to_message(&self, event: &Value) -> Result<Message, serde_json::Error> {
        let body = serde_json::to_vec(event)?;
        let attributes: Attributes = match event.as_object() {
            Some(fields) => self
                .attribute_fields
                .iter()
                .filter_map(|name| {
                    let value = fields.get(name)?;
                    match AttributeValue::from_json(value) {
                        Some(attribute) => Some((name.clone(), attribute)),
                        None => {
                            log::debug!(
                                "Field '{}' is not a scalar and is not used for filtering",
                                name
                            );
                            None
                        }
                    }
                })
                .collect(),
            None => Attributes::new(),
        };
        Ok(Message::new(body).with_attributes(attributes))
    }

    /// Publish one event to the topic
    ///
    /// Any subscriber rejecting its copy turns the response into a failure;
    /// an event no subscription matches is still a success.
    pub fn handle_event(&self, event: &Value) -> ProducerResponse {
        let message = match self.to_message(event) {
            Ok(message) => message,
            Err(e) => {
                log::error!("Failed to serialise event: {}", e);
                return ProducerResponse::failure();
            }
        };

        match self.topic.publish(message) {
            Ok(result) if result.is_success() => {
                log::info!(
                    "Published message {} to topic '{}' ({} subscriber(s))",
                    result.message_id,
                    self.topic.topic_id(),
                    result.delivered.len()
                );
                ProducerResponse::success()
            }
            Ok(result) => {
                log::error!(
                    "Message {} was rejected by queue(s) {:?}",
                    result.message_id,
                    result.failed_queues()
                );
                ProducerResponse::failure()
            }
            Err(e) => {
                log::error!("Failed to publish to topic '{}': {}", self.topic.topic_id(), e);
                ProducerResponse::failure()
            }
        }
    }

    /// Parse a raw JSON event and publish it; unparseable input is a failure
    pub fn handle_raw(&self, raw: &str) -> ProducerResponse {
        match serde_json::from_str::<Value>(raw) {
            Ok(event) => self.handle_event(&event),
            Err(e) => {
                log::error!("Rejected malformed event: {}", e);
                ProducerResponse::failure()
            }
        }
    }
}
