//! Bounded exponential backoff
//!
//! Used by consumer runners between empty polls. The delay doubles (by the
//! configured multiplier) on every consecutive empty poll and is capped at
//! `max_delay`; a non-empty poll resets it.

use serde::Deserialize;
use std::time::Duration;

/// Configurable backoff policy
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    #[serde(rename = "initial_delay_ms", with = "crate::core::time::millis")]
    pub initial_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "crate::core::time::millis")]
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next poll after `attempt` consecutive empty polls
    ///
    /// `attempt` starts at 0. The result never exceeds `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Create stateful backoff tracker for one polling loop
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            attempt: 0,
        }
    }
}

/// Consecutive-empty-poll tracker
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    /// Return the delay for the current attempt and step forward
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Forget consecutive empty polls
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
