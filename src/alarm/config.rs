//! Alarm configuration

use crate::core::validation::{validate_name, validate_positive, ValidationError};
use serde::Deserialize;
use std::time::Duration;

/// What happens once a fired alarm's failure count drops below threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Return to OK on the next evaluation, optionally announcing it
    AutoResolve { notify: bool },
    /// Stay fired until an operator calls `reset`
    Manual,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        ResolutionPolicy::AutoResolve { notify: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResolutionMode {
    #[default]
    Auto,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlarmConfig {
    /// Failures in the window that fire the alarm
    pub threshold: u64,
    /// Number of tick buckets in the evaluation window
    pub window_ticks: usize,
    #[serde(rename = "tick_interval_ms", with = "crate::core::time::millis")]
    pub tick_interval: Duration,
    pub resolution: ResolutionMode,
    /// Send a resolved alert when auto-resolving
    pub notify_on_resolve: bool,
    pub alert_channel: String,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            threshold: 1,
            window_ticks: 1,
            tick_interval: Duration::from_secs(60),
            resolution: ResolutionMode::Auto,
            notify_on_resolve: false,
            alert_channel: "AlarmTopic".to_string(),
        }
    }
}

impl AlarmConfig {
    pub fn resolution_policy(&self) -> ResolutionPolicy {
        match self.resolution {
            ResolutionMode::Auto => ResolutionPolicy::AutoResolve {
                notify: self.notify_on_resolve,
            },
            ResolutionMode::Manual => ResolutionPolicy::Manual,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_positive("alarm.threshold", self.threshold)?;
        validate_positive("alarm.window_ticks", self.window_ticks)?;
        if self.tick_interval.is_zero() {
            return Err(ValidationError::new(
                "'alarm.tick_interval_ms' must be greater than 0",
            ));
        }
        validate_name("alarm.alert_channel", &self.alert_channel)?;
        Ok(())
    }
}
