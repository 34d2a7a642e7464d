//! Error reporting helpers
//!
//! Errors that surface at the process boundary (bad configuration, logger
//! setup, unreadable event files) are logged through
//! [`log_error_with_context`], which shows the specific message when the
//! operator can act on it and a generic context line otherwise.

/// Errors that know whether the operator can fix them
///
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)`; otherwise it should return `None`.
pub trait ContextualError: std::error::Error {
    /// True if the message can be shown to the operator as-is
    fn is_user_actionable(&self) -> bool;

    /// The operator-facing message for actionable errors
    fn user_message(&self) -> Option<&str>;
}

/// Log a fatal error with the appropriate level of detail
///
/// Actionable errors log their own message; system errors log the operation
/// context. Full details always go to debug level.
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

/// Exit-code style summary of an error for the binary
pub fn render_error_for_operator<E: ContextualError + std::fmt::Display>(
    error: &E,
    operation_context: &str,
) -> String {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => user_msg.to_string(),
        _ => format!("{operation_context}: {error}"),
    }
}
