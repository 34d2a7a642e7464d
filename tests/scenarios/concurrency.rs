//! Concurrent publishers and consumers

use crate::common::{fast_runner_config, wait_for, BodyDrivenHandler};
use orchestrator::consumer::api::ConsumerRunner;
use orchestrator::core::time::system_clock;
use orchestrator::queue::api::{DeliveryQueue, Message, MessageId, QueueConfig};
use orchestrator::topic::api::Topic;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishers_lose_nothing() {
    let topic = Arc::new(Topic::new("Orders"));
    let queue = Arc::new(DeliveryQueue::new(QueueConfig::new("QueueA"), system_clock()));
    topic.subscribe(Arc::clone(&queue), None).unwrap();

    let mut publishers = JoinSet::new();
    for publisher in 0..10 {
        let topic = Arc::clone(&topic);
        publishers.spawn(async move {
            let mut ids = Vec::with_capacity(100);
            for n in 0..100 {
                let result = topic
                    .publish(Message::new(format!("{publisher}-{n}")))
                    .unwrap();
                assert!(result.is_success());
                ids.push(result.message_id);
                if n % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            ids
        });
    }
    let mut published: HashSet<MessageId> = HashSet::new();
    while let Some(ids) = publishers.join_next().await {
        published.extend(ids.unwrap());
    }

    assert_eq!(queue.len(), 1000);
    let stored: HashSet<MessageId> = queue
        .snapshot()
        .unwrap()
        .iter()
        .filter_map(|m| m.published_id())
        .collect();
    assert_eq!(stored.len(), 1000);
    assert_eq!(stored, published);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_runner_drains_while_publishers_write() {
    let queue = Arc::new(DeliveryQueue::new(QueueConfig::new("QueueA"), system_clock()));
    let handler = Arc::new(BodyDrivenHandler::default());
    let runner = Arc::new(ConsumerRunner::new(
        "ConsumerA",
        Arc::clone(&queue),
        handler.clone(),
        fast_runner_config(),
    ));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let consumer = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.run(shutdown_rx).await })
    };

    let mut publishers = JoinSet::new();
    for publisher in 0..4 {
        let queue = Arc::clone(&queue);
        publishers.spawn(async move {
            for n in 0..50 {
                queue.enqueue(Message::new(format!("ok {publisher}-{n}"))).unwrap();
                tokio::task::yield_now().await;
            }
        });
    }
    while let Some(result) = publishers.join_next().await {
        result.unwrap();
    }

    wait_for(Duration::from_secs(5), || queue.is_empty()).await;
    shutdown_tx.send(()).unwrap();
    let stats = consumer.await.unwrap().unwrap();

    assert_eq!(stats.received, 200);
    assert_eq!(stats.succeeded, 200);
    assert_eq!(handler.calls(), 200);
    assert_eq!(queue.stats().unwrap().acknowledged_total, 200);
}
