//! Rolling-window failure alarms per consumer group
//!
//! Failures land in the open bucket of their group. `tick` closes the open
//! bucket into a ring that holds the previous `window_ticks - 1` buckets,
//! so the window always spans `window_ticks` tick periods including the
//! current one. `evaluate` compares the window sum to the threshold and
//! emits an alert on every state change it is configured to announce.
//!
//! Counters are atomics. The open bucket is closed with an atomic swap, so
//! a failure recorded concurrently with a tick is counted in exactly one
//! bucket.

use crate::alarm::config::{AlarmConfig, ResolutionPolicy};
use crate::alarm::error::AlarmError;
use crate::alarm::sink::{Alert, AlertKind, AlertSink};
use crate::core::sync::{handle_mutex_poison, handle_rwlock_read, handle_rwlock_write};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AlarmStatus {
    Ok,
    Fired,
}

/// Read-only view of one group's alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSnapshot {
    pub consumer_group: String,
    pub status: AlarmStatus,
    pub failures_in_window: u64,
    pub threshold: u64,
    pub total_failures: u64,
    pub total_successes: u64,
}

#[derive(Default)]
struct GroupState {
    open_bucket: AtomicU64,
    closed_buckets: Mutex<VecDeque<u64>>,
    fired: AtomicBool,
    total_failures: AtomicU64,
    total_successes: AtomicU64,
}

impl GroupState {
    fn failures_in_window(&self) -> Result<u64, AlarmError> {
        let closed = handle_mutex_poison(self.closed_buckets.lock(), AlarmError::operation_failed)?;
        Ok(self.open_bucket.load(Ordering::Acquire) + closed.iter().sum::<u64>())
    }

    fn status(&self) -> AlarmStatus {
        if self.fired.load(Ordering::Acquire) {
            AlarmStatus::Fired
        } else {
            AlarmStatus::Ok
        }
    }
}

pub struct AlarmEvaluator {
    threshold: u64,
    window_ticks: usize,
    channel: String,
    resolution: ResolutionPolicy,
    groups: RwLock<HashMap<String, Arc<GroupState>>>,
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlarmEvaluator {
    /// Create an evaluator; a configuration that fails validation is rejected
    pub fn new(config: &AlarmConfig) -> Result<Self, AlarmError> {
        config
            .validate()
            .map_err(|e| AlarmError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        Ok(Self {
            threshold: config.threshold,
            window_ticks: config.window_ticks,
            channel: config.alert_channel.clone(),
            resolution: config.resolution_policy(),
            groups: RwLock::new(HashMap::new()),
            sinks: Vec::new(),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn resolution(&self) -> ResolutionPolicy {
        self.resolution
    }

    /// Make a group visible in snapshots before it reports anything
    pub fn register_group(&self, group: &str) -> Result<(), AlarmError> {
        self.group(group).map(|_| ())
    }

    fn group(&self, group: &str) -> Result<Arc<GroupState>, AlarmError> {
        {
            let groups = handle_rwlock_read(self.groups.read(), AlarmError::operation_failed)?;
            if let Some(state) = groups.get(group) {
                return Ok(Arc::clone(state));
            }
        }
        let mut groups = handle_rwlock_write(self.groups.write(), AlarmError::operation_failed)?;
        Ok(Arc::clone(groups.entry(group.to_string()).or_default()))
    }

    fn existing_group(&self, group: &str) -> Result<Arc<GroupState>, AlarmError> {
        let groups = handle_rwlock_read(self.groups.read(), AlarmError::operation_failed)?;
        groups
            .get(group)
            .cloned()
            .ok_or_else(|| AlarmError::UnknownGroup {
                group: group.to_string(),
            })
    }

    pub fn record_failure(&self, group: &str) -> Result<(), AlarmError> {
        let state = self.group(group)?;
        state.open_bucket.fetch_add(1, Ordering::AcqRel);
        state.total_failures.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_success(&self, group: &str) -> Result<(), AlarmError> {
        let state = self.group(group)?;
        state.total_successes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the open bucket of every group and drop buckets that left the window
    pub fn tick(&self) -> Result<(), AlarmError> {
        let groups: Vec<Arc<GroupState>> = {
            let groups = handle_rwlock_read(self.groups.read(), AlarmError::operation_failed)?;
            groups.values().cloned().collect()
        };

        let retained = self.window_ticks - 1;
        for state in groups {
            let mut closed =
                handle_mutex_poison(state.closed_buckets.lock(), AlarmError::operation_failed)?;
            let bucket = state.open_bucket.swap(0, Ordering::AcqRel);
            closed.push_back(bucket);
            while closed.len() > retained {
                closed.pop_front();
            }
        }
        Ok(())
    }

    /// Compare every group's window to the threshold and announce changes
    ///
    /// Returns the alerts that were sent.
    pub fn evaluate(&self) -> Result<Vec<Alert>, AlarmError> {
        let mut groups: Vec<(String, Arc<GroupState>)> = {
            let groups = handle_rwlock_read(self.groups.read(), AlarmError::operation_failed)?;
            groups
                .iter()
                .map(|(name, state)| (name.clone(), Arc::clone(state)))
                .collect()
        };
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let mut alerts = Vec::new();
        for (name, state) in groups {
            let failures = state.failures_in_window()?;

            if failures >= self.threshold {
                if state
                    .fired
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    alerts.push(self.alert(&name, failures, AlertKind::Fired));
                }
                continue;
            }

            if let ResolutionPolicy::AutoResolve { notify } = self.resolution {
                let was_fired = state
                    .fired
                    .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if was_fired {
                    log::debug!("Alarm for '{}' returned to OK", name);
                    if notify {
                        alerts.push(self.alert(&name, failures, AlertKind::Resolved));
                    }
                }
            }
        }

        for alert in &alerts {
            self.dispatch(alert);
        }
        Ok(alerts)
    }

    /// Clear a fired alarm by hand; returns whether it was fired
    pub fn reset(&self, group: &str) -> Result<bool, AlarmError> {
        let state = self.existing_group(group)?;
        let was_fired = state.fired.swap(false, Ordering::AcqRel);
        if was_fired {
            log::info!("Alarm for consumer group '{}' reset", group);
        }
        Ok(was_fired)
    }

    pub fn snapshot(&self, group: &str) -> Result<AlarmSnapshot, AlarmError> {
        let state = self.existing_group(group)?;
        self.snapshot_of(group, &state)
    }

    /// Snapshots of every known group, sorted by group name
    pub fn snapshots(&self) -> Result<Vec<AlarmSnapshot>, AlarmError> {
        let groups: Vec<(String, Arc<GroupState>)> = {
            let groups = handle_rwlock_read(self.groups.read(), AlarmError::operation_failed)?;
            groups
                .iter()
                .map(|(name, state)| (name.clone(), Arc::clone(state)))
                .collect()
        };
        let mut snapshots = groups
            .iter()
            .map(|(name, state)| self.snapshot_of(name, state))
            .collect::<Result<Vec<_>, _>>()?;
        snapshots.sort_by(|a, b| a.consumer_group.cmp(&b.consumer_group));
        Ok(snapshots)
    }

    fn snapshot_of(&self, group: &str, state: &GroupState) -> Result<AlarmSnapshot, AlarmError> {
        Ok(AlarmSnapshot {
            consumer_group: group.to_string(),
            status: state.status(),
            failures_in_window: state.failures_in_window()?,
            threshold: self.threshold,
            total_failures: state.total_failures.load(Ordering::Relaxed),
            total_successes: state.total_successes.load(Ordering::Relaxed),
        })
    }

    fn alert(&self, group: &str, failure_count: u64, kind: AlertKind) -> Alert {
        Alert {
            channel: self.channel.clone(),
            consumer_group: group.to_string(),
            failure_count,
            threshold: self.threshold,
            kind,
            timestamp: SystemTime::now(),
        }
    }

    fn dispatch(&self, alert: &Alert) {
        for sink in &self.sinks {
            if let Err(e) = sink.notify(alert) {
                log::error!(
                    "Failed to deliver {} alert for '{}' to sink '{}': {}",
                    alert.kind,
                    alert.consumer_group,
                    sink.name(),
                    e
                );
            }
        }
    }

    /// Evaluate and tick every `period` until shutdown is signalled
    pub async fn run_periodic(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately
        interval.tick().await;

        log::debug!("Alarm ticker started (period {:?})", period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.evaluate() {
                        log::error!("Alarm evaluation failed: {}", e);
                    }
                    if let Err(e) = self.tick() {
                        log::error!("Alarm window rollover failed: {}", e);
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        log::debug!("Alarm ticker stopped");
    }
}
