//! QueueManager - registry of named delivery queues
//!
//! The manager owns every queue in the system, wires each one to its
//! dead-letter queue by name and injects the shared clock and notification
//! manager. Topics, runners and the application look queues up here.

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::core::time::TimeProvider;
use crate::notifications::api::NotificationManager;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::internal::DeliveryQueue;
use crate::queue::types::{QueueConfig, QueueStats};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of delivery queues
///
/// Thread-safe; share it as `Arc<QueueManager>`. Queues are never removed
/// once created, so an `Arc<DeliveryQueue>` handed out stays valid.
pub struct QueueManager {
    queues: RwLock<HashMap<String, Arc<DeliveryQueue>>>,
    clock: Arc<dyn TimeProvider>,
    notifications: Option<Arc<NotificationManager>>,
}

impl QueueManager {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            clock,
            notifications: None,
        }
    }

    pub fn with_notifications(mut self, notifications: Arc<NotificationManager>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Create and register a single queue
    ///
    /// A configured dead-letter queue must already exist.
    pub fn create_queue(&self, config: QueueConfig) -> QueueResult<Arc<DeliveryQueue>> {
        config
            .validate()
            .map_err(|e| QueueError::InvalidConfiguration {
                message: e.to_string(),
            })?;

        let mut queues = handle_rwlock_write(self.queues.write(), QueueError::operation_failed)?;
        if queues.contains_key(&config.name) {
            return Err(QueueError::QueueExists {
                queue_id: config.name,
            });
        }

        let dead_letter_queue = match &config.dead_letter_queue {
            Some(name) => Some(queues.get(name).cloned().ok_or_else(|| {
                QueueError::QueueNotFound {
                    queue_id: name.clone(),
                }
            })?),
            None => None,
        };

        let name = config.name.clone();
        let mut queue = DeliveryQueue::new(config, Arc::clone(&self.clock));
        if let Some(dead_letter_queue) = dead_letter_queue {
            queue = queue.with_dead_letter_queue(dead_letter_queue);
        }
        if let Some(notifications) = &self.notifications {
            queue = queue.with_notifications(Arc::clone(notifications));
        }

        let queue = Arc::new(queue);
        queues.insert(name.clone(), Arc::clone(&queue));
        log::debug!(
            "Created queue '{}' (max receives {}, dead-letter queue {:?})",
            name,
            queue.max_receive_count(),
            queue.config().dead_letter_queue
        );
        Ok(queue)
    }

    /// Create a set of queues in dependency order
    ///
    /// Dead-letter queues are created before the queues that point at them,
    /// whatever order they are listed in. Fails if a dead-letter queue is
    /// missing or the references form a cycle.
    pub fn create_queues(&self, configs: Vec<QueueConfig>) -> QueueResult<Vec<Arc<DeliveryQueue>>> {
        let mut pending = configs;
        let mut created = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|config| {
                config
                    .dead_letter_queue
                    .as_ref()
                    .is_none_or(|name| self.contains(name))
            });

            if ready.is_empty() {
                let unresolved: Vec<String> = blocked
                    .iter()
                    .map(|c| {
                        format!(
                            "{} -> {}",
                            c.name,
                            c.dead_letter_queue.as_deref().unwrap_or_default()
                        )
                    })
                    .collect();
                return Err(QueueError::InvalidConfiguration {
                    message: format!(
                        "Unresolvable dead-letter queue references: {}",
                        unresolved.join(", ")
                    ),
                });
            }

            for config in ready {
                created.push(self.create_queue(config)?);
            }
            pending = blocked;
        }

        Ok(created)
    }

    pub fn get_queue(&self, name: &str) -> QueueResult<Arc<DeliveryQueue>> {
        let queues = handle_rwlock_read(self.queues.read(), QueueError::operation_failed)?;
        queues
            .get(name)
            .cloned()
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_id: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.queues
            .read()
            .map(|q| q.contains_key(name))
            .unwrap_or(false)
    }

    /// Registered queue names, sorted
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .queues
            .read()
            .map(|q| q.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn queue_count(&self) -> usize {
        self.queues.read().map(|q| q.len()).unwrap_or(0)
    }

    /// Messages held across every queue
    pub fn total_message_count(&self) -> usize {
        self.queues
            .read()
            .map(|q| q.values().map(|queue| queue.len()).sum())
            .unwrap_or(0)
    }

    /// Stats for every queue, sorted by queue name
    pub fn stats(&self) -> QueueResult<Vec<QueueStats>> {
        let queues: Vec<Arc<DeliveryQueue>> = {
            let queues = handle_rwlock_read(self.queues.read(), QueueError::operation_failed)?;
            queues.values().cloned().collect()
        };
        let mut stats = queues
            .iter()
            .map(|queue| queue.stats())
            .collect::<QueueResult<Vec<_>>>()?;
        stats.sort_by(|a, b| a.queue_id.cmp(&b.queue_id));
        Ok(stats)
    }
}
