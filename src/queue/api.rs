//! Public API for the queue system
//!
//! External modules should import from here rather than directly from internal modules.

// Core queue components
pub use crate::queue::internal::DeliveryQueue;
pub use crate::queue::manager::QueueManager;

// Dead-letter handling
pub use crate::queue::dead_letter::redirect;

// Message types
pub use crate::queue::message::{AttributeValue, Attributes, Message, MessageHeader, MessageId};

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};

// Configuration and statistics
pub use crate::queue::types::{
    QueueConfig, QueueStats, RequeueOutcome, DEFAULT_MAX_RECEIVE_COUNT,
    DEFAULT_VISIBILITY_TIMEOUT,
};
