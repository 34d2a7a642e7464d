//! Test modules for the queue system
//!
//! Tests are organized by functional area.


use crate::core::time::{ManualTimeProvider, TimeProvider};
use crate::queue::api::{DeliveryQueue, QueueConfig};
use std::sync::Arc;

/// Queue driven by a manual clock the test can advance
fn manual_queue(config: QueueConfig) -> (DeliveryQueue, ManualTimeProvider) {
    let clock = ManualTimeProvider::new();
    let provider: Arc<dyn TimeProvider> = Arc::new(clock.clone());
    (DeliveryQueue::new(config, provider), clock)
}
