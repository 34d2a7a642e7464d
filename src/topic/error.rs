//! Topic Error Types

use crate::topic::subscription::SubscriptionId;

/// A filter predicate that cannot be evaluated
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterEvaluationError {
    #[error("Filter policy contains an empty attribute key")]
    EmptyKey,

    #[error("Filter allow-list for attribute '{key}' is empty")]
    EmptyAllowList { key: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopicError {
    #[error("Invalid filter policy: {0}")]
    InvalidFilter(#[from] FilterEvaluationError),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

impl TopicError {
    pub(crate) fn operation_failed(message: String) -> Self {
        TopicError::OperationFailed { message }
    }
}

impl crate::core::error_handling::ContextualError for TopicError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, TopicError::InvalidFilter(_))
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
