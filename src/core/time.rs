//! Time provider abstraction for testable time-dependent logic
//!
//! Queue visibility deadlines are computed from a [`TimeProvider`] so that
//! redelivery can be exercised without waiting on the wall clock.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

/// Abstraction over system time for testable time-dependent logic
pub trait TimeProvider: Send + Sync {
    /// Get the current monotonic time (for measuring intervals)
    fn now(&self) -> Instant;

    /// Get the current system time (for timestamps)
    fn system_time(&self) -> SystemTime;
}

/// Production time provider using actual system time
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock
///
/// Time only moves when [`ManualTimeProvider::advance_time`] is called. Clones
/// share the same underlying clock, so a test can keep one handle and inject
/// another into the component under test.
#[derive(Debug, Clone)]
pub struct ManualTimeProvider {
    current_instant: Arc<Mutex<Instant>>,
    current_system_time: Arc<Mutex<SystemTime>>,
}

impl Default for ManualTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTimeProvider {
    /// Create a new manual clock frozen at the current time
    pub fn new() -> Self {
        Self {
            current_instant: Arc::new(Mutex::new(Instant::now())),
            current_system_time: Arc::new(Mutex::new(SystemTime::now())),
        }
    }

    /// Advance both monotonic and system time by the given duration
    pub fn advance_time(&self, duration: Duration) {
        if let Ok(mut instant) = self.current_instant.lock() {
            *instant += duration;
        }
        if let Ok(mut system_time) = self.current_system_time.lock() {
            *system_time += duration;
        }
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> Instant {
        match self.current_instant.lock() {
            Ok(instant) => *instant,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn system_time(&self) -> SystemTime {
        match self.current_system_time.lock() {
            Ok(time) => *time,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Shared handle to the system clock
pub fn system_clock() -> Arc<dyn TimeProvider> {
    Arc::new(SystemTimeProvider)
}

/// Deserialize a `Duration` from an integer number of milliseconds
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
