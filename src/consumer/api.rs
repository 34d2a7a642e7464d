//! Public API for consumer runners

pub use crate::consumer::error::RunnerError;
pub use crate::consumer::handler::{HandlerOutcome, LoggingHandler, MessageHandler};
pub use crate::consumer::runner::{ConsumerRunner, RunnerConfig, RunnerState, RunnerStats};
