//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use orchestrator::alarm::api::{AlarmError, Alert, AlertSink};
use orchestrator::consumer::api::{HandlerOutcome, MessageHandler, RunnerConfig};
use orchestrator::core::backoff::BackoffPolicy;
use orchestrator::queue::api::Message;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Sink that keeps every alert it is given
#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingSink {
    pub fn alerts(&self) -> Vec<Alert> {
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

/// Handler that fails every message whose body contains "fail"
#[derive(Default)]
pub struct BodyDrivenHandler {
    calls: AtomicUsize,
}

impl BodyDrivenHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageHandler for BodyDrivenHandler {
    async fn handle(&self, message: &Message) -> HandlerOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match message.body_str() {
            Some(body) if body.contains("fail") => HandlerOutcome::failure("payload asked to fail"),
            _ => HandlerOutcome::Success,
        }
    }
}

/// Runner settings that poll quickly and time out early
pub fn fast_runner_config() -> RunnerConfig {
    RunnerConfig {
        batch_size: 10,
        handler_timeout: Duration::from_millis(200),
        backoff: BackoffPolicy {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2,
        },
    }
}

/// Poll `condition` until it holds, panicking after `limit`
pub async fn wait_for<F>(limit: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {limit:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
