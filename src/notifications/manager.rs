//! NotificationManager implementation
//!
//! Every subscriber gets its own unbounded channel and an [`EventFilter`].
//! Publishing never blocks: events are cloned into each accepting channel and
//! subscribers whose receiver has been dropped are removed on the spot.

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::notifications::error::NotificationError;
use crate::notifications::event::{Event, EventFilter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub type EventReceiver = UnboundedReceiver<Event>;

struct SubscriberInfo {
    filter: EventFilter,
    source: String,
    sender: UnboundedSender<Event>,
    delivered: AtomicUsize,
}

#[derive(Default)]
pub struct NotificationManager {
    subscribers: RwLock<HashMap<String, SubscriberInfo>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        subscriber_id: String,
        filter: EventFilter,
        source: String,
    ) -> Result<EventReceiver, NotificationError> {
        let (sender, receiver) = unbounded_channel();

        let subscriber_info = SubscriberInfo {
            filter,
            source: source.clone(),
            sender,
            delivered: AtomicUsize::new(0),
        };

        let mut subscribers =
            handle_rwlock_write(self.subscribers.write(), NotificationError::Internal)?;
        if let Some(existing) = subscribers.insert(subscriber_id.clone(), subscriber_info) {
            log::warn!(
                "Subscriber '{}' replaced existing subscription (source: {} -> {})",
                subscriber_id,
                existing.source,
                source
            );
        }

        Ok(receiver)
    }

    pub fn unsubscribe(&self, subscriber_id: &str) -> Result<bool, NotificationError> {
        let mut subscribers =
            handle_rwlock_write(self.subscribers.write(), NotificationError::Internal)?;
        Ok(subscribers.remove(subscriber_id).is_some())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers
            .read()
            .map(|s| s.contains_key(subscriber_id))
            .unwrap_or(false)
    }

    /// Number of events delivered to a subscriber so far
    pub fn delivered_count(&self, subscriber_id: &str) -> Option<usize> {
        self.subscribers
            .read()
            .ok()?
            .get(subscriber_id)
            .map(|info| info.delivered.load(Ordering::Relaxed))
    }

    pub fn publish(&self, event: Event) -> Result<(), NotificationError> {
        let mut failed_subscribers = Vec::new();

        {
            let subscribers =
                handle_rwlock_read(self.subscribers.read(), NotificationError::Internal)?;
            for (subscriber_id, info) in subscribers.iter() {
                if !info.filter.accepts(&event) {
                    continue;
                }
                if info.sender.send(event.clone()).is_err() {
                    failed_subscribers.push(subscriber_id.clone());
                } else {
                    info.delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        if failed_subscribers.is_empty() {
            return Ok(());
        }

        {
            let mut subscribers =
                handle_rwlock_write(self.subscribers.write(), NotificationError::Internal)?;
            for subscriber_id in &failed_subscribers {
                subscribers.remove(subscriber_id);
            }
        }
        log::debug!(
            "Removed {} closed notification subscribers",
            failed_subscribers.len()
        );

        Err(NotificationError::PublishFailed {
            event_type: event.kind().to_string(),
            failed_subscribers,
        })
    }
}
