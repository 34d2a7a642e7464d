//! Subscriptions binding a topic to a delivery queue

use crate::queue::api::{DeliveryQueue, Message};
use crate::topic::filter::FilterPolicy;
use std::fmt;
use std::sync::Arc;

/// Topic-local subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One subscriber queue and its optional filter; immutable once created
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    queue: Arc<DeliveryQueue>,
    filter: Option<FilterPolicy>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        queue: Arc<DeliveryQueue>,
        filter: Option<FilterPolicy>,
    ) -> Self {
        Self { id, queue, filter }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    pub fn queue_name(&self) -> &str {
        self.queue.name()
    }

    pub fn filter(&self) -> Option<&FilterPolicy> {
        self.filter.as_ref()
    }

    pub fn accepts(&self, message: &Message) -> bool {
        crate::topic::filter::matches(message, self.filter.as_ref())
    }
}
