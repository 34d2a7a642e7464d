//! Failure alarms driven by consumer outcomes

use crate::common::{fast_runner_config, BodyDrivenHandler, RecordingSink};
use orchestrator::alarm::api::{AlarmConfig, AlarmEvaluator, AlarmStatus, AlertKind, ResolutionMode};
use orchestrator::consumer::api::ConsumerRunner;
use orchestrator::core::time::system_clock;
use orchestrator::queue::api::{DeliveryQueue, Message, QueueConfig};
use std::sync::Arc;

#[test]
fn test_single_failure_fires_exactly_one_alert() {
    let sink = Arc::new(RecordingSink::default());
    let evaluator = AlarmEvaluator::new(&AlarmConfig {
        threshold: 1,
        window_ticks: 1,
        ..AlarmConfig::default()
    })
    .unwrap()
    .with_sink(sink.clone());

    evaluator.record_failure("ConsumerA").unwrap();
    evaluator.evaluate().unwrap();
    evaluator.evaluate().unwrap();

    let alerts = sink.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Fired);
    assert_eq!(alerts[0].consumer_group, "ConsumerA");
    assert_eq!(alerts[0].channel, "AlarmTopic");
    assert_eq!(
        evaluator.snapshot("ConsumerA").unwrap().status,
        AlarmStatus::Fired
    );
}

#[test]
fn test_auto_resolve_after_quiet_period() {
    let sink = Arc::new(RecordingSink::default());
    let evaluator = AlarmEvaluator::new(&AlarmConfig {
        notify_on_resolve: true,
        ..AlarmConfig::default()
    })
    .unwrap()
    .with_sink(sink.clone());

    evaluator.record_failure("ConsumerB").unwrap();
    evaluator.evaluate().unwrap();
    evaluator.tick().unwrap();
    evaluator.evaluate().unwrap();

    let kinds: Vec<AlertKind> = sink.alerts().iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AlertKind::Fired, AlertKind::Resolved]);
}

#[test]
fn test_manual_resolution_holds_until_reset() {
    let evaluator = AlarmEvaluator::new(&AlarmConfig {
        resolution: ResolutionMode::Manual,
        ..AlarmConfig::default()
    })
    .unwrap();

    evaluator.record_failure("ConsumerC").unwrap();
    evaluator.evaluate().unwrap();
    evaluator.tick().unwrap();
    evaluator.evaluate().unwrap();
    assert_eq!(
        evaluator.snapshot("ConsumerC").unwrap().status,
        AlarmStatus::Fired
    );

    assert!(evaluator.reset("ConsumerC").unwrap());
    assert_eq!(
        evaluator.snapshot("ConsumerC").unwrap().status,
        AlarmStatus::Ok
    );
}

#[tokio::test]
async fn test_runner_failures_feed_the_alarm() {
    let sink = Arc::new(RecordingSink::default());
    let alarms = Arc::new(
        AlarmEvaluator::new(&AlarmConfig {
            threshold: 2,
            ..AlarmConfig::default()
        })
        .unwrap()
        .with_sink(sink.clone()),
    );
    let queue = Arc::new(DeliveryQueue::new(QueueConfig::new("QueueA"), system_clock()));
    queue.enqueue(Message::new("please fail")).unwrap();
    queue.enqueue(Message::new("please fail too")).unwrap();
    queue.enqueue(Message::new("fine")).unwrap();
    let runner = ConsumerRunner::new(
        "ConsumerA",
        Arc::clone(&queue),
        Arc::new(BodyDrivenHandler::default()),
        fast_runner_config(),
    )
    .with_alarms(Arc::clone(&alarms));

    assert_eq!(runner.poll_once().await.unwrap(), 3);
    let alerts = alarms.evaluate().unwrap();

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].failure_count, 2);
    assert_eq!(sink.alerts().len(), 1);
    let snapshot = alarms.snapshot("ConsumerA").unwrap();
    assert_eq!(snapshot.total_successes, 1);
}
