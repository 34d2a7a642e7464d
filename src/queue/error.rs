//! Queue Error Types

use crate::queue::message::MessageId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueueError {
    #[error("Queue '{queue_id}' is full (capacity: {capacity})")]
    CapacityExceeded { queue_id: String, capacity: usize },

    #[error("Message {message_id} is already present in queue '{queue_id}'")]
    DuplicateMessage {
        queue_id: String,
        message_id: MessageId,
    },

    #[error("Message {message_id} from queue '{queue_id}' is undeliverable: {reason}")]
    Undeliverable {
        queue_id: String,
        message_id: MessageId,
        reason: String,
    },

    #[error("Queue not found: {queue_id}")]
    QueueNotFound { queue_id: String },

    #[error("Queue already exists: {queue_id}")]
    QueueExists { queue_id: String },

    #[error("Invalid queue configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

impl QueueError {
    /// Constructor for lock-poison helpers
    pub(crate) fn operation_failed(message: String) -> Self {
        QueueError::OperationFailed { message }
    }

    /// True when retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::CapacityExceeded { .. })
    }
}

impl crate::core::error_handling::ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, QueueError::InvalidConfiguration { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            QueueError::InvalidConfiguration { message } => Some(message),
            _ => None,
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
