//! Alarm Error Types

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlarmError {
    #[error("Alert sink '{sink}' failed: {message}")]
    SinkFailed { sink: String, message: String },

    #[error("Unknown consumer group: {group}")]
    UnknownGroup { group: String },

    #[error("Invalid alarm configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

impl AlarmError {
    pub(crate) fn operation_failed(message: String) -> Self {
        AlarmError::OperationFailed { message }
    }
}

impl crate::core::error_handling::ContextualError for AlarmError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, AlarmError::InvalidConfiguration { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            AlarmError::InvalidConfiguration { message } => Some(message),
            _ => None,
        }
    }
}
