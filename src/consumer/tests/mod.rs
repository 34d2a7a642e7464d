//! Test modules for consumer runners

mod processing;

use crate::consumer::api::{HandlerOutcome, MessageHandler, RunnerConfig};
use crate::core::backoff::BackoffPolicy;
use crate::queue::api::Message;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a [`ScriptedHandler`] does with a message
#[derive(Clone, Copy)]
pub(crate) enum Behaviour {
    Succeed,
    Fail,
    Panic,
    Hang,
}

/// Handler that behaves according to the message's `behaviour` attribute
#[derive(Default)]
pub(crate) struct ScriptedHandler {
    pub(crate) calls: AtomicUsize,
}

impl ScriptedHandler {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub(crate) fn scripted(behaviour: Behaviour) -> Message {
    let name = match behaviour {
        Behaviour::Succeed => "succeed",
        Behaviour::Fail => "fail",
        Behaviour::Panic => "panic",
        Behaviour::Hang => "hang",
    };
    Message::new(name).with_attribute("behaviour", name)
}

#[async_trait]
impl MessageHandler for ScriptedHandler {
    async fn handle(&self, message: &Message) -> HandlerOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match message.attribute("behaviour").and_then(|v| v.as_str()) {
            Some("fail") => HandlerOutcome::failure("scripted failure"),
            Some("panic") => panic!("scripted panic"),
            Some("hang") => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                HandlerOutcome::Success
            }
            _ => HandlerOutcome::Success,
        }
    }
}

pub(crate) fn fast_config() -> RunnerConfig {
    RunnerConfig {
        batch_size: 10,
        handler_timeout: Duration::from_millis(100),
        backoff: BackoffPolicy {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2,
        },
    }
}
