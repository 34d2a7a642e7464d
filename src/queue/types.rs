//! Queue configuration and reporting types

use crate::core::validation::{validate_name, validate_positive, ValidationError};
use serde::Deserialize;
use std::time::Duration;

/// Receives allowed before a message is dead-lettered, when not configured
pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 10;

/// How long a received message stays invisible before it is redelivered
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a single delivery queue
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub name: String,
    /// Deliveries allowed before the message is redirected
    pub max_receive_count: u32,
    /// Name of the queue that receives exhausted messages
    pub dead_letter_queue: Option<String>,
    /// Maximum number of messages held (visible plus in flight); unbounded if unset
    pub capacity: Option<usize>,
    #[serde(rename = "visibility_timeout_ms", with = "crate::core::time::millis")]
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_receive_count: DEFAULT_MAX_RECEIVE_COUNT,
            dead_letter_queue: None,
            capacity: None,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }
}

impl QueueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_receive_count(mut self, max_receive_count: u32) -> Self {
        self.max_receive_count = max_receive_count;
        self
    }

    pub fn with_dead_letter_queue(mut self, name: impl Into<String>) -> Self {
        self.dead_letter_queue = Some(name.into());
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("queue name", &self.name)?;
        validate_positive(
            &format!("queues.{}.max_receive_count", self.name),
            self.max_receive_count as u64,
        )?;
        if let Some(capacity) = self.capacity {
            validate_positive(
                &format!("queues.{}.capacity", self.name),
                capacity as u64,
            )?;
        }
        if self.visibility_timeout.is_zero() {
            return Err(ValidationError::new(format!(
                "'queues.{}.visibility_timeout_ms' must be greater than 0",
                self.name
            )));
        }
        if let Some(dead_letter_queue) = &self.dead_letter_queue {
            validate_name(
                &format!("queues.{}.dead_letter_queue", self.name),
                dead_letter_queue,
            )?;
            if dead_letter_queue == &self.name {
                return Err(ValidationError::new(format!(
                    "Queue '{}' cannot be its own dead-letter queue",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// What happened to a message handed back with `requeue`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequeueOutcome {
    /// Visible again at the tail of the queue
    Requeued,
    /// Receives exhausted; moved to the named dead-letter queue
    DeadLettered { dead_letter_queue: String },
    /// Receives exhausted and no dead-letter queue could take it; dropped
    Undeliverable,
    /// The message was not in flight; nothing changed
    NotInFlight,
}

/// Point-in-time counters for one queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub queue_id: String,
    /// Messages currently held (visible plus in flight)
    pub messages: usize,
    pub visible: usize,
    pub in_flight: usize,
    pub enqueued_total: u64,
    pub acknowledged_total: u64,
    /// Messages made visible again by requeue or visibility expiry
    pub redelivered_total: u64,
    pub dead_lettered_total: u64,
    pub undeliverable_total: u64,
    pub rejected_total: u64,
}
