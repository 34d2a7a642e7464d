//! Consumer runner
//!
//! One runner drains one queue on behalf of one consumer group:
//!
//! ```text
//!   Idle ──▶ Polling ──(batch)──▶ Processing ──▶ Idle ...
//!               │
//!               └──(empty)──▶ Idle + backoff sleep
//!   any state ──(shutdown)──▶ Stopped
//! ```
//!
//! Every message of a batch runs on its own task under the handler timeout.
//! Success acknowledges the message; failure, timeout or a panicking handler
//! requeues it (which may dead-letter it) and counts as a failure for the
//! group's alarm. Shutdown is only observed between batches and while
//! backing off, so a started batch always finishes.

use crate::alarm::api::AlarmEvaluator;
use crate::consumer::error::RunnerError;
use crate::consumer::handler::{HandlerOutcome, MessageHandler};
use crate::core::backoff::BackoffPolicy;
use crate::notifications::api::{
    publish_best_effort, Event, NotificationManager, RunnerEvent, RunnerEventType,
};
use crate::queue::api::{DeliveryQueue, Message, MessageId, RequeueOutcome};
use futures::future::join_all;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Maximum messages received per poll
    pub batch_size: usize,
    #[serde(rename = "handler_timeout_ms", with = "crate::core::time::millis")]
    pub handler_timeout: Duration,
    /// Delay between polls of an empty queue
    pub backoff: BackoffPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            handler_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<(), RunnerError> {
        let invalid = |message: &str| RunnerError::InvalidConfiguration {
            message: message.to_string(),
        };
        if self.batch_size == 0 {
            return Err(invalid("'runner.batch_size' must be greater than 0"));
        }
        if self.handler_timeout.is_zero() {
            return Err(invalid("'runner.handler_timeout_ms' must be greater than 0"));
        }
        if self.backoff.initial_delay.is_zero() {
            return Err(invalid(
                "'runner.backoff.initial_delay_ms' must be greater than 0",
            ));
        }
        if self.backoff.max_delay < self.backoff.initial_delay {
            return Err(invalid(
                "'runner.backoff.max_delay_ms' must not be below initial_delay_ms",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RunnerState {
    Idle,
    Polling,
    Processing,
    Stopped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerStats {
    pub received: u64,
    pub succeeded: u64,
    /// Handler failures, including panics
    pub failed: u64,
    pub timed_out: u64,
    pub dead_lettered: u64,
    pub undeliverable: u64,
}

#[derive(Default)]
struct RunnerCounters {
    received: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    dead_lettered: AtomicU64,
    undeliverable: AtomicU64,
}

enum Settlement {
    Success,
    Failure(String),
    TimedOut,
}

pub struct ConsumerRunner {
    group: String,
    queue: Arc<DeliveryQueue>,
    handler: Arc<dyn MessageHandler>,
    config: RunnerConfig,
    alarms: Option<Arc<AlarmEvaluator>>,
    notifications: Option<Arc<NotificationManager>>,
    state: watch::Sender<RunnerState>,
    counters: RunnerCounters,
}

impl ConsumerRunner {
    pub fn new(
        group: impl Into<String>,
        queue: Arc<DeliveryQueue>,
        handler: Arc<dyn MessageHandler>,
        config: RunnerConfig,
    ) -> Self {
        let (state, _) = watch::channel(RunnerState::Idle);
        Self {
            group: group.into(),
            queue,
            handler,
            config,
            alarms: None,
            notifications: None,
            state,
            counters: RunnerCounters::default(),
        }
    }

    pub fn with_alarms(mut self, alarms: Arc<AlarmEvaluator>) -> Self {
        self.alarms = Some(alarms);
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<NotificationManager>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    pub fn state(&self) -> RunnerState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<RunnerState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> RunnerStats {
        RunnerStats {
            received: self.counters.received.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
            dead_lettered: self.counters.dead_lettered.load(Ordering::Relaxed),
            undeliverable: self.counters.undeliverable.load(Ordering::Relaxed),
        }
    }

    fn set_state(&self, state: RunnerState) {
        self.state.send_replace(state);
    }

    fn publish(&self, event: RunnerEvent) {
        publish_best_effort(self.notifications.as_ref(), Event::Runner(event));
    }

    /// Poll until shutdown is signalled, then return the final counters
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunnerStats, RunnerError> {
        log::info!(
            "Consumer '{}' started on queue '{}'",
            self.group,
            self.queue.name()
        );
        self.publish(RunnerEvent::new(
            RunnerEventType::Started,
            self.group.clone(),
            self.queue.name().to_string(),
        ));

        let mut backoff = self.config.backoff.start();
        let result = loop {
            match shutdown.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => {}
                _ => break Ok(()),
            }

            match self.poll_once().await {
                Ok(0) => {
                    let delay = backoff.next_delay();
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.recv() => break Ok(()),
                    }
                }
                Ok(_) => backoff.reset(),
                Err(e) => break Err(e),
            }
        };

        self.set_state(RunnerState::Stopped);
        let stats = self.stats();
        match &result {
            Ok(()) => log::info!(
                "Consumer '{}' stopped: {} received, {} succeeded, {} failed, {} timed out",
                self.group,
                stats.received,
                stats.succeeded,
                stats.failed,
                stats.timed_out
            ),
            Err(e) => log::error!("Consumer '{}' stopped on error: {}", self.group, e),
        }
        self.publish(
            RunnerEvent::new(
                RunnerEventType::Stopped,
                self.group.clone(),
                self.queue.name().to_string(),
            )
            .with_message(format!("{stats:?}")),
        );

        result.map(|_| stats)
    }

    /// Receive one batch and settle every message in it
    ///
    /// Returns the number of messages processed; 0 means the queue had
    /// nothing visible.
    pub async fn poll_once(&self) -> Result<usize, RunnerError> {
        self.set_state(RunnerState::Polling);
        let batch = self.queue.receive(self.config.batch_size)?;
        if batch.is_empty() {
            self.set_state(RunnerState::Idle);
            return Ok(0);
        }

        self.set_state(RunnerState::Processing);
        let count = batch.len();
        self.counters
            .received
            .fetch_add(count as u64, Ordering::Relaxed);

        let (message_ids, tasks): (Vec<MessageId>, Vec<JoinHandle<Option<HandlerOutcome>>>) =
            batch
                .into_iter()
                .map(|message| (message.id(), self.spawn_handler(message)))
                .unzip();
        let outcomes = join_all(tasks).await;

        let mut first_error = None;
        for (message_id, outcome) in message_ids.into_iter().zip(outcomes) {
            let settlement = match outcome {
                Ok(Some(HandlerOutcome::Success)) => Settlement::Success,
                Ok(Some(HandlerOutcome::Failure(reason))) => Settlement::Failure(reason),
                Ok(None) => Settlement::TimedOut,
                Err(e) => Settlement::Failure(if e.is_panic() {
                    "handler panicked".to_string()
                } else {
                    format!("handler task failed: {e}")
                }),
            };
            // Keep settling the rest of the batch so no message is left in flight
            if let Err(e) = self.settle(message_id, settlement) {
                first_error.get_or_insert(e);
            }
        }

        self.set_state(RunnerState::Idle);
        match first_error {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    fn spawn_handler(&self, message: Message) -> JoinHandle<Option<HandlerOutcome>> {
        let handler = Arc::clone(&self.handler);
        let timeout = self.config.handler_timeout;
        tokio::spawn(async move {
            tokio::time::timeout(timeout, handler.handle(&message))
                .await
                .ok()
        })
    }

    fn settle(&self, message_id: MessageId, settlement: Settlement) -> Result<(), RunnerError> {
        match settlement {
            Settlement::Success => {
                self.queue.ack(message_id)?;
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                if let Some(alarms) = &self.alarms {
                    alarms.record_success(&self.group)?;
                }
                return Ok(());
            }
            Settlement::Failure(reason) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Consumer '{}' failed to process {}: {}",
                    self.group,
                    message_id,
                    reason
                );
            }
            Settlement::TimedOut => {
                self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Consumer '{}' timed out processing {} after {:?}",
                    self.group,
                    message_id,
                    self.config.handler_timeout
                );
            }
        }

        match self.queue.requeue(message_id)? {
            RequeueOutcome::DeadLettered { .. } => {
                self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
            }
            RequeueOutcome::Undeliverable => {
                self.counters.undeliverable.fetch_add(1, Ordering::Relaxed);
            }
            RequeueOutcome::Requeued | RequeueOutcome::NotInFlight => {}
        }
        if let Some(alarms) = &self.alarms {
            alarms.record_failure(&self.group)?;
        }
        Ok(())
    }
}
