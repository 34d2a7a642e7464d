//! Orchestrator assembly
//!
//! Builds the whole pipeline from an [`OrchestratorConfig`]:
//!
//! ```text
//!  ProducerAdapter ──▶ Topic ──(filter)──▶ DeliveryQueue ──▶ ConsumerRunner ──▶ handler
//!                                               │                    │
//!                                               ▼                    ▼
//!                                        dead-letter queue     AlarmEvaluator ──▶ sinks
//! ```
//!
//! Every component receives its collaborators through its constructor; the
//! single [`NotificationManager`] is shared by all of them.

use crate::alarm::api::{AlarmError, AlarmEvaluator, LogAlertSink, NotificationAlertSink};
use crate::app::config::{ConsumerSettings, OrchestratorConfig};
use crate::consumer::api::{
    ConsumerRunner, LoggingHandler, MessageHandler, RunnerError, RunnerState, RunnerStats,
};
use crate::core::error_handling::ContextualError;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::time::TimeProvider;
use crate::core::validation::ValidationError;
use crate::notifications::api::NotificationManager;
use crate::producer::api::ProducerAdapter;
use crate::queue::api::{DeliveryQueue, Message, QueueError, QueueManager};
use crate::topic::api::{Topic, TopicError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ValidationError),

    #[error("Failed to create queues: {0}")]
    Queue(#[from] QueueError),

    #[error("Failed to subscribe queue: {0}")]
    Topic(#[from] TopicError),

    #[error("Failed to set up alarms: {0}")]
    Alarm(#[from] AlarmError),
}

impl ContextualError for OrchestratorError {
    fn is_user_actionable(&self) -> bool {
        match self {
            OrchestratorError::Config(e) => e.is_user_actionable(),
            OrchestratorError::Queue(e) => e.is_user_actionable(),
            OrchestratorError::Topic(e) => e.is_user_actionable(),
            OrchestratorError::Alarm(e) => e.is_user_actionable(),
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            OrchestratorError::Config(e) => e.user_message(),
            OrchestratorError::Queue(e) => e.user_message(),
            OrchestratorError::Topic(e) => e.user_message(),
            OrchestratorError::Alarm(e) => e.user_message(),
        }
    }
}

/// Messages parked in one dead-letter queue, oldest first
#[derive(Debug, Clone)]
pub struct DeadLetterReport {
    pub queue_id: String,
    pub messages: Vec<Message>,
}

/// How one consumer runner ended
#[derive(Debug, Clone)]
pub struct RunnerReport {
    pub group: String,
    pub queue_id: String,
    pub result: Result<RunnerStats, RunnerError>,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    notifications: Arc<NotificationManager>,
    queues: Arc<QueueManager>,
    topic: Arc<Topic>,
    producer: ProducerAdapter,
    alarms: Arc<AlarmEvaluator>,
    runners: Vec<Arc<ConsumerRunner>>,
}

impl Orchestrator {
    /// Build with a [`LoggingHandler`] for every consumer group
    pub fn build(
        config: OrchestratorConfig,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, OrchestratorError> {
        Self::build_with_handlers(config, clock, |consumer| {
            Arc::new(LoggingHandler::new(consumer.group.clone())) as Arc<dyn MessageHandler>
        })
    }

    /// Build with handlers supplied per consumer
    pub fn build_with_handlers<F>(
        config: OrchestratorConfig,
        clock: Arc<dyn TimeProvider>,
        handler_for: F,
    ) -> Result<Self, OrchestratorError>
    where
        F: Fn(&ConsumerSettings) -> Arc<dyn MessageHandler>,
    {
        config.validate()?;

        let notifications = Arc::new(NotificationManager::new());
        let queues =
            Arc::new(QueueManager::new(clock).with_notifications(Arc::clone(&notifications)));
        queues.create_queues(config.queues.clone())?;

        let topic = Arc::new(Topic::new(config.topic.clone()));
        for subscription in &config.subscriptions {
            let queue = queues.get_queue(&subscription.queue)?;
            let id = topic.subscribe(queue, subscription.filter.clone())?;
            log::debug!(
                "Subscribed queue '{}' to topic '{}' as {}",
                subscription.queue,
                topic.topic_id(),
                id
            );
        }

        let alarms = Arc::new(
            AlarmEvaluator::new(&config.alarm)?
                .with_sink(Arc::new(LogAlertSink))
                .with_sink(Arc::new(NotificationAlertSink::new(Arc::clone(
                    &notifications,
                )))),
        );

        let mut runners = Vec::with_capacity(config.consumers.len());
        for consumer in &config.consumers {
            alarms.register_group(&consumer.group)?;
            let runner = ConsumerRunner::new(
                consumer.group.clone(),
                queues.get_queue(&consumer.queue)?,
                handler_for(consumer),
                config.runner_config_for(consumer),
            )
            .with_alarms(Arc::clone(&alarms))
            .with_notifications(Arc::clone(&notifications));
            runners.push(Arc::new(runner));
        }

        let producer = ProducerAdapter::new(Arc::clone(&topic))
            .with_attribute_fields(config.producer.attribute_fields.clone());

        log::info!(
            "Topic '{}' ready: {} queue(s), {} subscription(s), {} consumer(s)",
            topic.topic_id(),
            queues.queue_count(),
            topic.subscription_count(),
            runners.len()
        );

        Ok(Self {
            config,
            notifications,
            queues,
            topic,
            producer,
            alarms,
            runners,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn notifications(&self) -> &Arc<NotificationManager> {
        &self.notifications
    }

    pub fn queues(&self) -> &Arc<QueueManager> {
        &self.queues
    }

    pub fn topic(&self) -> &Arc<Topic> {
        &self.topic
    }

    pub fn producer(&self) -> &ProducerAdapter {
        &self.producer
    }

    pub fn alarms(&self) -> &Arc<AlarmEvaluator> {
        &self.alarms
    }

    pub fn runners(&self) -> &[Arc<ConsumerRunner>] {
        &self.runners
    }

    /// Spawn every runner and the alarm ticker
    ///
    /// All of them stop when `shutdown` is triggered; await
    /// [`RunningOrchestrator::join`] to drain them.
    pub fn start(&self, shutdown: &ShutdownCoordinator) -> RunningOrchestrator {
        let mut runners = JoinSet::new();
        for runner in &self.runners {
            let runner = Arc::clone(runner);
            let receiver = shutdown.subscribe();
            runners.spawn(async move {
                let result = runner.run(receiver).await;
                RunnerReport {
                    group: runner.group().to_string(),
                    queue_id: runner.queue().name().to_string(),
                    result,
                }
            });
        }

        let ticker = tokio::spawn(Arc::clone(&self.alarms).run_periodic(
            self.config.alarm.tick_interval,
            shutdown.subscribe(),
        ));

        RunningOrchestrator { runners, ticker }
    }

    /// True once every queue with a live consumer holds no messages
    ///
    /// A runner that has stopped, e.g. on a queue error, no longer drains its
    /// queue, so that queue is not waited on.
    pub fn is_idle(&self) -> bool {
        self.live_queues().all(|queue| queue.is_empty())
    }

    /// Wait until every queue with a live consumer has been drained
    pub async fn wait_until_idle(&self, poll_interval: Duration) {
        while !self.is_idle() {
            tokio::time::sleep(poll_interval).await;
        }
    }

    fn live_queues(&self) -> impl Iterator<Item = &Arc<DeliveryQueue>> {
        self.runners
            .iter()
            .filter(|runner| runner.state() != RunnerState::Stopped)
            .map(|runner| runner.queue())
    }

    /// Current contents of every dead-letter queue
    pub fn dead_letter_report(&self) -> Result<Vec<DeadLetterReport>, QueueError> {
        self.config
            .dead_letter_queue_names()
            .into_iter()
            .map(|name| {
                let queue = self.queues.get_queue(&name)?;
                Ok(DeadLetterReport {
                    queue_id: name,
                    messages: queue.snapshot()?,
                })
            })
            .collect()
    }
}

/// Handles to the tasks started by [`Orchestrator::start`]
pub struct RunningOrchestrator {
    runners: JoinSet<RunnerReport>,
    ticker: JoinHandle<()>,
}

impl RunningOrchestrator {
    /// Wait for every runner and the ticker to stop
    ///
    /// Reports are sorted by consumer group. A runner task that panicked is
    /// logged and left out.
    pub async fn join(mut self) -> Vec<RunnerReport> {
        let mut reports = Vec::new();
        while let Some(result) = self.runners.join_next().await {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => log::error!("Consumer task failed: {}", e),
            }
        }
        if let Err(e) = self.ticker.await {
            log::error!("Alarm ticker failed: {}", e);
        }
        reports.sort_by(|a, b| a.group.cmp(&b.group));
        reports
    }
}
