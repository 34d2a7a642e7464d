//! Message handlers invoked by consumer runners

use crate::queue::api::Message;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Success,
    Failure(String),
}

impl HandlerOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        HandlerOutcome::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HandlerOutcome::Success)
    }
}

/// Business logic applied to each delivered message
///
/// Delivery is at-least-once, so a handler may see the same message more
/// than once and should be idempotent.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> HandlerOutcome;
}

/// Logs every message it receives and always succeeds
#[derive(Debug, Clone)]
pub struct LoggingHandler {
    group: String,
}

impl LoggingHandler {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }
}

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, message: &Message) -> HandlerOutcome {
        let body = message
            .body_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("<{} bytes>", message.body.len()));
        log::info!(
            "{} processing message {} (receive {}): {}",
            self.group,
            message.id(),
            message.receive_count(),
            body
        );
        HandlerOutcome::Success
    }
}
