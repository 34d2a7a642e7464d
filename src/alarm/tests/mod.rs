//! Test modules for the alarm system


use crate::alarm::api::{AlarmError, Alert, AlertSink};
use std::sync::Mutex;

/// Sink that keeps every alert it is given
#[derive(Default)]
pub(crate) struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingSink {
    pub(crate) fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingSink {
    fn notify(&self, alert: &Alert) -> Result<(), AlarmError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Sink that always fails
pub(crate) struct FailingSink;

impl AlertSink for FailingSink {
    fn notify(&self, _alert: &Alert) -> Result<(), AlarmError> {
        Err(AlarmError::SinkFailed {
            sink: "failing".to_string(),
            message: "unreachable endpoint".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}
