//! Tests for batch processing and outcome settlement

#[cfg(test)]
mod tests {
    use crate::alarm::api::{AlarmConfig, AlarmEvaluator, AlarmStatus};
    use crate::consumer::api::{ConsumerRunner, RunnerConfig, RunnerState};
    use crate::consumer::tests::{fast_config, scripted, Behaviour, ScriptedHandler};
    use crate::core::time::system_clock;
    use crate::queue::api::{DeliveryQueue, QueueConfig, QueueManager};
    use std::sync::Arc;

    fn single_queue(name: &str) -> Arc<DeliveryQueue> {
        Arc::new(DeliveryQueue::new(QueueConfig::new(name), system_clock()))
    }

    #[tokio::test]
    async fn test_success_acknowledges_message() {
        let queue = single_queue("QueueA");
        queue.enqueue(scripted(Behaviour::Succeed)).unwrap();
        queue.enqueue(scripted(Behaviour::Succeed)).unwrap();
        let handler = Arc::new(ScriptedHandler::default());
        let runner =
            ConsumerRunner::new("ConsumerA", Arc::clone(&queue), handler.clone(), fast_config());

        assert_eq!(runner.poll_once().await.unwrap(), 2);

        assert!(queue.is_empty());
        assert_eq!(handler.calls(), 2);
        let stats = runner.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(runner.state(), RunnerState::Idle);
    }

    #[tokio::test]
    async fn test_empty_poll_returns_zero() {
        let queue = single_queue("QueueA");
        let runner = ConsumerRunner::new(
            "ConsumerA",
            queue,
            Arc::new(ScriptedHandler::default()),
            fast_config(),
        );

        assert_eq!(runner.poll_once().await.unwrap(), 0);
        assert_eq!(runner.state(), RunnerState::Idle);
        assert_eq!(runner.stats().received, 0);
    }

    #[tokio::test]
    async fn test_failure_requeues_until_dead_lettered() {
        let manager = QueueManager::new(system_clock());
        let dead_letter = manager
            .create_queue(QueueConfig::new("DeadLetterQueue"))
            .unwrap();
        let queue = manager
            .create_queue(
                QueueConfig::new("QueueA")
                    .with_max_receive_count(2)
                    .with_dead_letter_queue("DeadLetterQueue"),
            )
            .unwrap();
        let message = scripted(Behaviour::Fail);
        let id = message.id();
        queue.enqueue(message).unwrap();

        let runner = ConsumerRunner::new(
            "ConsumerA",
            Arc::clone(&queue),
            Arc::new(ScriptedHandler::default()),
            fast_config(),
        );

        runner.poll_once().await.unwrap();
        assert!(queue.contains(id));
        assert_eq!(queue.visible_count(), 1);

        runner.poll_once().await.unwrap();
        assert!(!queue.contains(id));
        assert!(dead_letter.contains(id));
        assert_eq!(dead_letter.get(id).unwrap().receive_count(), 2);

        assert_eq!(runner.poll_once().await.unwrap(), 0);
        let stats = runner.stats();
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.dead_lettered, 1);
        assert_eq!(stats.undeliverable, 0);
    }

    #[tokio::test]
    async fn test_exhausted_without_dead_letter_queue_is_undeliverable() {
        let queue = Arc::new(DeliveryQueue::new(
            QueueConfig::new("QueueB").with_max_receive_count(1),
            system_clock(),
        ));
        queue.enqueue(scripted(Behaviour::Fail)).unwrap();
        let runner = ConsumerRunner::new(
            "ConsumerB",
            Arc::clone(&queue),
            Arc::new(ScriptedHandler::default()),
            fast_config(),
        );

        runner.poll_once().await.unwrap();

        assert!(queue.is_empty());
        assert_eq!(runner.stats().undeliverable, 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_counts_as_failure() {
        let queue = single_queue("QueueA");
        let panicking = scripted(Behaviour::Panic);
        let panicking_id = panicking.id();
        queue.enqueue(panicking).unwrap();
        queue.enqueue(scripted(Behaviour::Succeed)).unwrap();
        let runner = ConsumerRunner::new(
            "ConsumerA",
            Arc::clone(&queue),
            Arc::new(ScriptedHandler::default()),
            fast_config(),
        );

        assert_eq!(runner.poll_once().await.unwrap(), 2);

        let stats = runner.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(panicking_id));
        assert_eq!(queue.visible_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_handler_times_out_and_is_requeued() {
        let queue = single_queue("QueueA");
        let slow = scripted(Behaviour::Hang);
        let slow_id = slow.id();
        queue.enqueue(slow).unwrap();
        let runner = ConsumerRunner::new(
            "ConsumerA",
            Arc::clone(&queue),
            Arc::new(ScriptedHandler::default()),
            fast_config(),
        );

        let started = std::time::Instant::now();
        runner.poll_once().await.unwrap();

        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(runner.stats().timed_out, 1);
        assert_eq!(runner.stats().failed, 0);
        assert!(queue.contains(slow_id));
        assert_eq!(queue.visible_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_size_limits_each_poll() {
        let queue = single_queue("QueueA");
        for _ in 0..5 {
            queue.enqueue(scripted(Behaviour::Succeed)).unwrap();
        }
        let runner = ConsumerRunner::new(
            "ConsumerA",
            Arc::clone(&queue),
            Arc::new(ScriptedHandler::default()),
            RunnerConfig {
                batch_size: 2,
                ..fast_config()
            },
        );

        assert_eq!(runner.poll_once().await.unwrap(), 2);
        assert_eq!(runner.poll_once().await.unwrap(), 2);
        assert_eq!(runner.poll_once().await.unwrap(), 1);
        assert_eq!(runner.poll_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_outcomes_reported_to_alarm() {
        let alarms = Arc::new(AlarmEvaluator::new(&AlarmConfig::default()).unwrap());
        let queue = single_queue("QueueA");
        queue.enqueue(scripted(Behaviour::Succeed)).unwrap();
        queue.enqueue(scripted(Behaviour::Fail)).unwrap();
        let runner = ConsumerRunner::new(
            "ConsumerA",
            Arc::clone(&queue),
            Arc::new(ScriptedHandler::default()),
            fast_config(),
        )
        .with_alarms(Arc::clone(&alarms));

        runner.poll_once().await.unwrap();
        alarms.evaluate().unwrap();

        let snapshot = alarms.snapshot("ConsumerA").unwrap();
        assert_eq!(snapshot.total_failures, 1);
        assert_eq!(snapshot.total_successes, 1);
        assert_eq!(snapshot.status, AlarmStatus::Fired);
    }

    #[test]
    fn test_runner_config_validation() {
        assert!(RunnerConfig::default().validate().is_ok());
        assert!(RunnerConfig {
            batch_size: 0,
            ..RunnerConfig::default()
        }
        .validate()
        .is_err());
        assert!(RunnerConfig {
            handler_timeout: std::time::Duration::ZERO,
            ..RunnerConfig::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_runner_config_from_toml() {
        let config: RunnerConfig = toml::from_str(
            r#"
            batch_size = 4
            handler_timeout_ms = 2500

            [backoff]
            initial_delay_ms = 10
            max_delay_ms = 1000
            multiplier = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 4);
        assert_eq!(config.handler_timeout, std::time::Duration::from_millis(2500));
        assert_eq!(config.backoff.multiplier, 3);
        assert_eq!(
            config.backoff.max_delay,
            std::time::Duration::from_millis(1000)
        );
    }
}
