//! Alert delivery
//!
//! An [`AlertSink`] receives every alarm state change the evaluator decides
//! to announce. Sinks are called synchronously from `evaluate`; a failing
//! sink is logged and does not affect the alarm state or other sinks.

use crate::alarm::error::AlarmError;
use crate::notifications::api::{AlarmEvent, AlarmEventType, Event, NotificationManager};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AlertKind {
    Fired,
    Resolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Alert channel the alarm publishes to
    pub channel: String,
    pub consumer_group: String,
    /// Failures counted in the evaluation window
    pub failure_count: u64,
    pub threshold: u64,
    pub kind: AlertKind,
    pub timestamp: SystemTime,
}

pub trait AlertSink: Send + Sync {
    fn notify(&self, alert: &Alert) -> Result<(), AlarmError>;

    /// Name used when reporting sink failures
    fn name(&self) -> &str;
}

/// Writes alerts to the application log
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&self, alert: &Alert) -> Result<(), AlarmError> {
        match alert.kind {
            AlertKind::Fired => log::warn!(
                "ALARM [{}] consumer group '{}' failing: {} failure(s) in window (threshold {})",
                alert.channel,
                alert.consumer_group,
                alert.failure_count,
                alert.threshold
            ),
            AlertKind::Resolved => log::info!(
                "OK [{}] consumer group '{}' recovered: {} failure(s) in window (threshold {})",
                alert.channel,
                alert.consumer_group,
                alert.failure_count,
                alert.threshold
            ),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Publishes alerts as alarm events on the notification bus
pub struct NotificationAlertSink {
    manager: Arc<NotificationManager>,
}

impl NotificationAlertSink {
    pub fn new(manager: Arc<NotificationManager>) -> Self {
        Self { manager }
    }
}

impl AlertSink for NotificationAlertSink {
    fn notify(&self, alert: &Alert) -> Result<(), AlarmError> {
        let event_type = match alert.kind {
            AlertKind::Fired => AlarmEventType::Fired,
            AlertKind::Resolved => AlarmEventType::Resolved,
        };
        self.manager
            .publish(Event::Alarm(AlarmEvent {
                event_type,
                timestamp: alert.timestamp,
                channel: alert.channel.clone(),
                consumer_group: alert.consumer_group.clone(),
                failure_count: alert.failure_count,
                threshold: alert.threshold,
            }))
            .map_err(|e| AlarmError::SinkFailed {
                sink: self.name().to_string(),
                message: e.to_string(),
            })
    }

    fn name(&self) -> &str {
        "notifications"
    }
}
