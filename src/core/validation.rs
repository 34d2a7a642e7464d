//! Validation helpers for configuration values

use crate::core::error_handling::ContextualError;

/// A configuration value the operator has to fix
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Require a strictly positive integer setting
pub fn validate_positive<T>(field: &str, value: T) -> Result<T, ValidationError>
where
    T: PartialOrd + Default + std::fmt::Display + Copy,
{
    if value <= T::default() {
        return Err(ValidationError::new(format!(
            "'{field}' must be greater than 0 (got {value})"
        )));
    }
    Ok(value)
}

/// Require a non-blank identifier without surrounding whitespace
pub fn validate_name<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(format!("'{field}' cannot be empty")));
    }
    if value.trim() != value {
        return Err(ValidationError::new(format!(
            "'{field}' cannot start or end with whitespace: '{value}'"
        )));
    }
    Ok(value)
}
