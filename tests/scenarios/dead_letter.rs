//! Retry exhaustion and dead-lettering

use orchestrator::core::time::ManualTimeProvider;
use orchestrator::queue::api::{Message, QueueConfig, QueueManager, RequeueOutcome};
use std::sync::Arc;
use std::time::Duration;

fn queues_with_dead_letter(clock: &ManualTimeProvider) -> QueueManager {
    let manager = QueueManager::new(Arc::new(clock.clone()));
    manager
        .create_queues(vec![
            QueueConfig::new("QueueA")
                .with_max_receive_count(2)
                .with_dead_letter_queue("DeadLetterQueue")
                .with_visibility_timeout(Duration::from_secs(30)),
            QueueConfig::new("DeadLetterQueue"),
        ])
        .unwrap();
    manager
}

#[test]
fn test_exhausted_message_moves_to_dead_letter_queue() {
    let clock = ManualTimeProvider::new();
    let manager = queues_with_dead_letter(&clock);
    let queue = manager.get_queue("QueueA").unwrap();
    let dead_letter = manager.get_queue("DeadLetterQueue").unwrap();
    let message = Message::new("{\"eventType\":\"typeA\"}").with_attribute("eventType", "typeA");
    let id = message.id();
    queue.enqueue(message).unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        let batch = queue.receive(1).unwrap();
        let Some(received) = batch.first() else {
            break;
        };
        outcomes.push(queue.requeue(received.id()).unwrap());
    }

    assert_eq!(
        outcomes,
        vec![
            RequeueOutcome::Requeued,
            RequeueOutcome::DeadLettered {
                dead_letter_queue: "DeadLetterQueue".to_string()
            }
        ]
    );
    assert!(!queue.contains(id));
    assert!(queue.receive(10).unwrap().is_empty());

    let parked = dead_letter.get(id).unwrap();
    assert_eq!(parked.receive_count(), 2);
    assert_eq!(parked.body_str(), Some("{\"eventType\":\"typeA\"}"));
    assert_eq!(parked.attribute("eventType").and_then(|v| v.as_str()), Some("typeA"));
    assert_eq!(queue.stats().unwrap().dead_lettered_total, 1);
}

#[test]
fn test_unacknowledged_message_dead_letters_after_visibility_expiry() {
    let clock = ManualTimeProvider::new();
    let manager = queues_with_dead_letter(&clock);
    let queue = manager.get_queue("QueueA").unwrap();
    let dead_letter = manager.get_queue("DeadLetterQueue").unwrap();
    let message = Message::new("crashed consumer");
    let id = message.id();
    queue.enqueue(message).unwrap();

    assert_eq!(queue.receive(1).unwrap().len(), 1);
    assert!(queue.receive(1).unwrap().is_empty());

    clock.advance_time(Duration::from_secs(31));
    let second = queue.receive(1).unwrap();
    assert_eq!(second[0].receive_count(), 2);

    clock.advance_time(Duration::from_secs(31));
    assert_eq!(queue.reclaim_expired().unwrap(), 1);

    assert!(queue.is_empty());
    assert!(dead_letter.contains(id));
}

#[test]
fn test_dead_letter_queue_is_a_normal_queue() {
    let clock = ManualTimeProvider::new();
    let manager = queues_with_dead_letter(&clock);
    let queue = manager.get_queue("QueueA").unwrap();
    let dead_letter = manager.get_queue("DeadLetterQueue").unwrap();
    let message = Message::new("poison");
    let id = message.id();
    queue.enqueue(message).unwrap();
    for _ in 0..2 {
        queue.receive(1).unwrap();
        queue.requeue(id).unwrap();
    }

    let inspected = dead_letter.receive(1).unwrap();

    assert_eq!(inspected[0].id(), id);
    assert_eq!(inspected[0].receive_count(), 3);
    assert!(dead_letter.ack(id).unwrap());
    assert!(dead_letter.is_empty());
}
