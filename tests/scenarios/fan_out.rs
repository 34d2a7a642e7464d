//! Filtered delivery to subscribed queues

use orchestrator::core::time::system_clock;
use orchestrator::queue::api::{DeliveryQueue, Message, QueueConfig};
use orchestrator::topic::api::{FilterPolicy, Topic};
use std::sync::Arc;

fn queue(name: &str) -> Arc<DeliveryQueue> {
    Arc::new(DeliveryQueue::new(QueueConfig::new(name), system_clock()))
}

#[test]
fn test_message_reaches_only_matching_subscription() {
    let topic = Topic::new("MicroServiceOrchestratorTopic");
    let first = queue("QueueA");
    let second = queue("QueueB");
    topic
        .subscribe(
            Arc::clone(&first),
            Some(FilterPolicy::new().allow("eventType", ["typeA"])),
        )
        .unwrap();
    topic
        .subscribe(
            Arc::clone(&second),
            Some(FilterPolicy::new().allow("eventType", ["typeB"])),
        )
        .unwrap();

    let result = topic
        .publish(Message::new("order").with_attribute("eventType", "typeA"))
        .unwrap();

    assert_eq!(result.matched, 1);
    assert_eq!(result.delivered, vec!["QueueA".to_string()]);
    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn test_unfiltered_subscription_receives_everything() {
    let topic = Topic::new("Audit");
    let audit = queue("AuditQueue");
    let filtered = queue("QueueC");
    topic.subscribe(Arc::clone(&audit), None).unwrap();
    topic
        .subscribe(
            Arc::clone(&filtered),
            Some(FilterPolicy::new().allow("eventType", ["typeC"])),
        )
        .unwrap();

    for event_type in ["typeA", "typeB", "typeC"] {
        topic
            .publish(Message::new(event_type).with_attribute("eventType", event_type))
            .unwrap();
    }
    topic.publish(Message::new("no attributes")).unwrap();

    assert_eq!(audit.len(), 4);
    assert_eq!(filtered.len(), 1);
}

#[test]
fn test_each_queue_holds_its_own_copy() {
    let topic = Topic::new("Orders");
    let first = queue("QueueA");
    let second = queue("QueueB");
    topic.subscribe(Arc::clone(&first), None).unwrap();
    topic.subscribe(Arc::clone(&second), None).unwrap();
    let result = topic.publish(Message::new("shared")).unwrap();

    let received = first.receive(1).unwrap();
    first.ack(received[0].id()).unwrap();

    assert_eq!(received[0].published_id(), Some(result.message_id));
    assert!(first.is_empty());
    let other = second.receive(1).unwrap();
    assert_ne!(other[0].id(), received[0].id());
    assert_eq!(other[0].published_id(), Some(result.message_id));
    assert_eq!(other[0].receive_count(), 1);
    assert_eq!(other[0].body_str(), Some("shared"));
}
