//! Consumer Runner Error Types

use crate::alarm::api::AlarmError;
use crate::queue::api::QueueError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunnerError {
    #[error("Queue operation failed: {0}")]
    Queue(#[from] QueueError),

    #[error("Alarm reporting failed: {0}")]
    Alarm(#[from] AlarmError),

    #[error("Invalid runner configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl crate::core::error_handling::ContextualError for RunnerError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, RunnerError::InvalidConfiguration { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            RunnerError::InvalidConfiguration { message } => Some(message),
            _ => None,
        }
    }
}
