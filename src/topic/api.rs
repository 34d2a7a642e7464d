//! Public API for topics and filter policies

pub use crate::topic::error::{FilterEvaluationError, TopicError};
pub use crate::topic::filter::{matches, FilterPolicy};
pub use crate::topic::router::{DeliveryFailure, PublishResult, Topic};
pub use crate::topic::subscription::{Subscription, SubscriptionId};
