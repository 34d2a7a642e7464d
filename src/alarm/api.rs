//! Public API for the alarm system

pub use crate::alarm::config::{AlarmConfig, ResolutionMode, ResolutionPolicy};
pub use crate::alarm::error::AlarmError;
pub use crate::alarm::evaluator::{AlarmEvaluator, AlarmSnapshot, AlarmStatus};
pub use crate::alarm::sink::{Alert, AlertKind, AlertSink, LogAlertSink, NotificationAlertSink};
