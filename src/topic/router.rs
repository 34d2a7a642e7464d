//! Topic fan-out router
//!
//! Publishing evaluates every subscription in registration order and
//! enqueues an independent copy of the message into each matching queue. A
//! queue that refuses its copy is reported in the result; it never stops
//! delivery to the other subscribers.

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::queue::api::{DeliveryQueue, Message, MessageId, QueueError};
use crate::topic::error::TopicError;
use crate::topic::filter::FilterPolicy;
use crate::topic::subscription::{Subscription, SubscriptionId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A subscriber queue that did not accept its copy
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub queue_id: String,
    pub error: QueueError,
}

/// Outcome of a single publish
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub message_id: MessageId,
    /// Subscriptions whose filter accepted the message
    pub matched: usize,
    /// Queues that accepted their copy, in subscription order
    pub delivered: Vec<String>,
    pub failed: Vec<DeliveryFailure>,
}

impl PublishResult {
    /// True when every matching subscriber accepted the message
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_queues(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.queue_id.as_str()).collect()
    }
}

pub struct Topic {
    topic_id: String,
    subscriptions: RwLock<Vec<Subscription>>,
    next_subscription_id: AtomicU64,
}

impl Topic {
    pub fn new(topic_id: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
            subscriptions: RwLock::new(Vec::new()),
            next_subscription_id: AtomicU64::new(1),
        }
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    /// Attach a queue, optionally behind a filter policy
    ///
    /// The policy is validated here so that a malformed predicate is
    /// rejected before any message is published.
    pub fn subscribe(
        &self,
        queue: Arc<DeliveryQueue>,
        filter: Option<FilterPolicy>,
    ) -> Result<SubscriptionId, TopicError> {
        if let Some(policy) = &filter {
            policy.validate()?;
        }

        let id = SubscriptionId::new(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        log::debug!(
            "Topic '{}' subscription {} -> queue '{}' (filter: {:?})",
            self.topic_id,
            id,
            queue.name(),
            filter
        );

        let mut subscriptions =
            handle_rwlock_write(self.subscriptions.write(), TopicError::operation_failed)?;
        subscriptions.push(Subscription::new(id, queue, filter));
        Ok(id)
    }

    /// Remove a subscription; returns false if it did not exist
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, TopicError> {
        let mut subscriptions =
            handle_rwlock_write(self.subscriptions.write(), TopicError::operation_failed)?;
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id() != id);
        Ok(subscriptions.len() != before)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Snapshot of the current subscriptions in registration order
    pub fn subscriptions(&self) -> Result<Vec<Subscription>, TopicError> {
        let subscriptions =
            handle_rwlock_read(self.subscriptions.read(), TopicError::operation_failed)?;
        Ok(subscriptions.clone())
    }

    /// Fan a message out to every matching subscriber queue
    pub fn publish(&self, message: Message) -> Result<PublishResult, TopicError> {
        let subscriptions = self.subscriptions()?;
        let mut result = PublishResult {
            message_id: message.id(),
            matched: 0,
            delivered: Vec::new(),
            failed: Vec::new(),
        };

        for subscription in subscriptions.iter().filter(|s| s.accepts(&message)) {
            result.matched += 1;
            let queue = subscription.queue();
            match queue.enqueue(message.copy_for_topic(&self.topic_id)) {
                Ok(_) => result.delivered.push(queue.name().to_string()),
                Err(error) => {
                    log::warn!(
                        "Topic '{}' could not deliver message {} to '{}': {}",
                        self.topic_id,
                        result.message_id,
                        queue.name(),
                        error
                    );
                    result.failed.push(DeliveryFailure {
                        queue_id: queue.name().to_string(),
                        error,
                    });
                }
            }
        }

        if result.matched == 0 {
            log::debug!(
                "Topic '{}' message {} matched no subscription",
                self.topic_id,
                result.message_id
            );
        } else {
            log::debug!(
                "Topic '{}' message {} delivered to {:?}",
                self.topic_id,
                result.message_id,
                result.delivered
            );
        }
        Ok(result)
    }
}
