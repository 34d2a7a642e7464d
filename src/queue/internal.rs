//! Delivery queue implementation
//!
//! Each queue keeps its messages in a single map guarded by one mutex, with a
//! FIFO of visible message ids beside it. A received message stays in the map
//! with a visibility deadline until it is acknowledged, requeued or its
//! deadline passes. Messages whose receives are exhausted are removed while
//! the lock is held and redirected only after it has been released, so two
//! queue locks are never held at the same time.

use crate::core::sync::handle_mutex_poison;
use crate::core::time::TimeProvider;
use crate::notifications::api::{
    publish_best_effort, Event, NotificationManager, QueueEvent, QueueEventType,
};
use crate::queue::dead_letter;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::message::{Message, MessageId};
use crate::queue::types::{QueueConfig, QueueStats, RequeueOutcome};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

struct Entry {
    message: Message,
    /// Set while the message is invisible to other consumers
    in_flight_until: Option<Instant>,
}

#[derive(Default)]
struct QueueState {
    next_sequence: u64,
    entries: HashMap<MessageId, Entry>,
    /// Visible messages in delivery order
    ready: VecDeque<MessageId>,
}

impl QueueState {
    fn in_flight_count(&self) -> usize {
        self.entries.len() - self.ready.len()
    }
}

#[derive(Default)]
struct QueueCounters {
    enqueued: AtomicU64,
    acknowledged: AtomicU64,
    redelivered: AtomicU64,
    dead_lettered: AtomicU64,
    undeliverable: AtomicU64,
    rejected: AtomicU64,
}

pub struct DeliveryQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    dead_letter_queue: Option<Arc<DeliveryQueue>>,
    clock: Arc<dyn TimeProvider>,
    notifications: Option<Arc<NotificationManager>>,
    counters: QueueCounters,
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("name", &self.config.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DeliveryQueue {
    /// Create a queue; any `dead_letter_queue` name in the config is only
    /// resolved once a queue is attached with [`Self::with_dead_letter_queue`]
    pub fn new(config: QueueConfig, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            state: Mutex::new(QueueState {
                next_sequence: 1,
                ..QueueState::default()
            }),
            dead_letter_queue: None,
            clock,
            notifications: None,
            counters: QueueCounters::default(),
        }
    }

    pub fn with_dead_letter_queue(mut self, dead_letter_queue: Arc<DeliveryQueue>) -> Self {
        self.config.dead_letter_queue = Some(dead_letter_queue.name().to_string());
        self.dead_letter_queue = Some(dead_letter_queue);
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<NotificationManager>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn max_receive_count(&self) -> u32 {
        self.config.max_receive_count
    }

    pub fn dead_letter_queue(&self) -> Option<&Arc<DeliveryQueue>> {
        self.dead_letter_queue.as_ref()
    }

    fn lock_state(&self) -> QueueResult<MutexGuard<'_, QueueState>> {
        handle_mutex_poison(self.state.lock(), QueueError::operation_failed)
    }

    /// Append a message to the tail of the queue
    ///
    /// Assigns the next sequence number and the enqueue timestamp and resets
    /// the receive count. Returns the assigned sequence.
    pub fn enqueue(&self, message: Message) -> QueueResult<u64> {
        self.insert(message, true)
    }

    /// Accept a message redirected from another queue, keeping its receive count
    pub(crate) fn accept_dead_letter(&self, message: Message) -> QueueResult<u64> {
        self.insert(message, false)
    }

    fn insert(&self, mut message: Message, reset_receive_count: bool) -> QueueResult<u64> {
        let message_id = message.id();
        let result = {
            let mut state = self.lock_state()?;
            if let Some(capacity) = self.config.capacity.filter(|c| state.entries.len() >= *c) {
                Err(QueueError::CapacityExceeded {
                    queue_id: self.config.name.clone(),
                    capacity,
                })
            } else if state.entries.contains_key(&message_id) {
                Err(QueueError::DuplicateMessage {
                    queue_id: self.config.name.clone(),
                    message_id,
                })
            } else {
                let sequence = state.next_sequence;
                state.next_sequence += 1;

                message.header.sequence = sequence;
                message.header.timestamp = self.clock.system_time();
                if reset_receive_count {
                    message.header.receive_count = 0;
                }
                state.entries.insert(
                    message_id,
                    Entry {
                        message,
                        in_flight_until: None,
                    },
                );
                state.ready.push_back(message_id);
                Ok(sequence)
            }
        };

        match &result {
            Ok(sequence) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                log::trace!(
                    "Queue '{}' enqueued message {} (sequence {})",
                    self.config.name,
                    message_id,
                    sequence
                );
            }
            Err(QueueError::CapacityExceeded { capacity, .. }) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Queue '{}' rejected message {}: at capacity ({})",
                    self.config.name,
                    message_id,
                    capacity
                );
                self.publish(
                    QueueEvent::for_message(
                        QueueEventType::CapacityExceeded,
                        self.config.name.clone(),
                        message_id,
                        0,
                    )
                    .with_message(format!("capacity {capacity}")),
                );
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                log::warn!("Queue '{}' rejected message: {}", self.config.name, e);
            }
        }
        result
    }

    /// Hand out up to `batch_size` visible messages, oldest first
    ///
    /// Expired in-flight messages are reclaimed first. Each returned message
    /// has its receive count incremented and stays invisible until the
    /// visibility timeout elapses. A batch size of 0 returns nothing.
    pub fn receive(&self, batch_size: usize) -> QueueResult<Vec<Message>> {
        self.reclaim_expired()?;
        if batch_size == 0 {
            return Ok(Vec::new());
        }

        let deadline = self.clock.now() + self.config.visibility_timeout;
        let mut state = self.lock_state()?;
        let mut batch = Vec::with_capacity(batch_size.min(state.ready.len()));

        while batch.len() < batch_size {
            let Some(message_id) = state.ready.pop_front() else {
                break;
            };
            let Some(entry) = state.entries.get_mut(&message_id) else {
                continue;
            };
            entry.message.header.receive_count += 1;
            entry.in_flight_until = Some(deadline);
            batch.push(entry.message.clone());
        }

        if !batch.is_empty() {
            log::trace!(
                "Queue '{}' delivered {} message(s)",
                self.config.name,
                batch.len()
            );
        }
        Ok(batch)
    }

    /// Permanently remove a message; returns false if it was not present
    pub fn ack(&self, message_id: MessageId) -> QueueResult<bool> {
        let removed = {
            let mut state = self.lock_state()?;
            match state.entries.remove(&message_id) {
                Some(entry) => {
                    if entry.in_flight_until.is_none() {
                        state.ready.retain(|id| *id != message_id);
                    }
                    true
                }
                None => false,
            }
        };

        if removed {
            self.counters.acknowledged.fetch_add(1, Ordering::Relaxed);
            log::trace!("Queue '{}' acknowledged {}", self.config.name, message_id);
        } else {
            log::debug!(
                "Queue '{}' ignored ack for unknown message {}",
                self.config.name,
                message_id
            );
        }
        Ok(removed)
    }

    /// Return an in-flight message to the queue after a failed attempt
    ///
    /// Once the message has been received `max_receive_count` times it is
    /// handed to the dead-letter queue instead, or dropped as undeliverable
    /// when there is none.
    pub fn requeue(&self, message_id: MessageId) -> QueueResult<RequeueOutcome> {
        let exhausted = {
            let mut state = self.lock_state()?;
            let max_receive_count = self.config.max_receive_count;

            let Some(entry) = state.entries.get_mut(&message_id) else {
                log::debug!(
                    "Queue '{}' ignored requeue for unknown message {}",
                    self.config.name,
                    message_id
                );
                return Ok(RequeueOutcome::NotInFlight);
            };
            if entry.in_flight_until.is_none() {
                return Ok(RequeueOutcome::NotInFlight);
            }

            if entry.message.header.receive_count >= max_receive_count {
                state.entries.remove(&message_id).map(|entry| entry.message)
            } else {
                entry.in_flight_until = None;
                state.ready.push_back(message_id);
                None
            }
        };

        match exhausted {
            Some(message) => Ok(self.escalate(message)),
            None => {
                self.counters.redelivered.fetch_add(1, Ordering::Relaxed);
                Ok(RequeueOutcome::Requeued)
            }
        }
    }

    /// Make in-flight messages whose visibility deadline has passed visible again
    ///
    /// Expired messages that have exhausted their receives are redirected the
    /// same way `requeue` would. Returns the number of messages reclaimed.
    pub fn reclaim_expired(&self) -> QueueResult<usize> {
        let now = self.clock.now();
        let mut exhausted = Vec::new();
        let mut reclaimed = 0;
        {
            let mut state = self.lock_state()?;
            if state.in_flight_count() == 0 {
                return Ok(0);
            }

            let mut expired: Vec<(u64, MessageId)> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.in_flight_until.is_some_and(|until| until <= now))
                .map(|(id, entry)| (entry.message.header.sequence, *id))
                .collect();
            expired.sort_unstable();

            for (_, message_id) in expired {
                let over_limit = state.entries.get(&message_id).is_some_and(|entry| {
                    entry.message.header.receive_count >= self.config.max_receive_count
                });
                if over_limit {
                    if let Some(entry) = state.entries.remove(&message_id) {
                        exhausted.push(entry.message);
                    }
                } else if let Some(entry) = state.entries.get_mut(&message_id) {
                    entry.in_flight_until = None;
                    state.ready.push_back(message_id);
                }
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            log::debug!(
                "Queue '{}' reclaimed {} message(s) past their visibility timeout",
                self.config.name,
                reclaimed
            );
        }
        self.counters
            .redelivered
            .fetch_add((reclaimed - exhausted.len()) as u64, Ordering::Relaxed);
        for message in exhausted {
            self.escalate(message);
        }
        Ok(reclaimed)
    }

    /// Route a message whose receives are exhausted
    fn escalate(&self, message: Message) -> RequeueOutcome {
        let message_id = message.id();
        let receive_count = message.receive_count();

        match dead_letter::redirect(message, self) {
            Ok(dead_letter_queue) => {
                self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Message {} moved from '{}' to dead-letter queue '{}' after {} receive(s)",
                    message_id,
                    self.config.name,
                    dead_letter_queue,
                    receive_count
                );
                self.publish(
                    QueueEvent::for_message(
                        QueueEventType::DeadLettered,
                        self.config.name.clone(),
                        message_id,
                        receive_count,
                    )
                    .with_message(format!("moved to {dead_letter_queue}")),
                );
                RequeueOutcome::DeadLettered { dead_letter_queue }
            }
            Err(e) => {
                self.counters.undeliverable.fetch_add(1, Ordering::Relaxed);
                log::error!("{}", e);
                self.publish(
                    QueueEvent::for_message(
                        QueueEventType::Undeliverable,
                        self.config.name.clone(),
                        message_id,
                        receive_count,
                    )
                    .with_message(e.to_string()),
                );
                RequeueOutcome::Undeliverable
            }
        }
    }

    fn publish(&self, event: QueueEvent) {
        publish_best_effort(self.notifications.as_ref(), Event::Queue(event));
    }

    /// Messages held, visible plus in flight
    pub fn len(&self) -> usize {
        self.lock_state().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn visible_count(&self) -> usize {
        self.lock_state().map(|s| s.ready.len()).unwrap_or(0)
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock_state().map(|s| s.in_flight_count()).unwrap_or(0)
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.lock_state()
            .map(|s| s.entries.contains_key(&message_id))
            .unwrap_or(false)
    }

    pub fn get(&self, message_id: MessageId) -> Option<Message> {
        self.lock_state()
            .ok()?
            .entries
            .get(&message_id)
            .map(|entry| entry.message.clone())
    }

    /// Copy of every held message, in enqueue order
    pub fn snapshot(&self) -> QueueResult<Vec<Message>> {
        let state = self.lock_state()?;
        let mut messages: Vec<Message> = state
            .entries
            .values()
            .map(|entry| entry.message.clone())
            .collect();
        messages.sort_by_key(|m| m.header.sequence);
        Ok(messages)
    }

    pub fn stats(&self) -> QueueResult<QueueStats> {
        let (messages, visible, in_flight) = {
            let state = self.lock_state()?;
            (
                state.entries.len(),
                state.ready.len(),
                state.in_flight_count(),
            )
        };
        Ok(QueueStats {
            queue_id: self.config.name.clone(),
            messages,
            visible,
            in_flight,
            enqueued_total: self.counters.enqueued.load(Ordering::Relaxed),
            acknowledged_total: self.counters.acknowledged.load(Ordering::Relaxed),
            redelivered_total: self.counters.redelivered.load(Ordering::Relaxed),
            dead_lettered_total: self.counters.dead_lettered.load(Ordering::Relaxed),
            undeliverable_total: self.counters.undeliverable.load(Ordering::Relaxed),
            rejected_total: self.counters.rejected.load(Ordering::Relaxed),
        })
    }
}
