//! Event types for the notification system

use crate::queue::MessageId;
use std::time::SystemTime;

#[derive(Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum QueueEventType {
    /// Message moved to the dead-letter queue after exhausting its receives
    DeadLettered,
    /// Message dropped: receives exhausted and nowhere to redirect it
    Undeliverable,
    /// Enqueue rejected because the queue is at capacity
    CapacityExceeded,
}

#[derive(Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum AlarmEventType {
    Fired,
    Resolved,
}

#[derive(Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum RunnerEventType {
    Started,
    Stopped,
}

#[derive(Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum SystemEventType {
    Startup,
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct QueueEvent {
    pub event_type: QueueEventType,
    pub timestamp: SystemTime,
    pub queue_id: String,
    pub message_id: Option<MessageId>,
    pub receive_count: Option<u32>,
    pub message: Option<String>,
}

impl QueueEvent {
    pub fn new(event_type: QueueEventType, queue_id: String) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            queue_id,
            message_id: None,
            receive_count: None,
            message: None,
        }
    }

    /// Event about one specific message
    pub fn for_message(
        event_type: QueueEventType,
        queue_id: String,
        message_id: MessageId,
        receive_count: u32,
    ) -> Self {
        Self {
            message_id: Some(message_id),
            receive_count: Some(receive_count),
            ..Self::new(event_type, queue_id)
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

#[derive(Clone, Debug)]
pub struct AlarmEvent {
    pub event_type: AlarmEventType,
    pub timestamp: SystemTime,
    /// Alert channel the alarm is wired to
    pub channel: String,
    pub consumer_group: String,
    pub failure_count: u64,
    pub threshold: u64,
}

#[derive(Clone, Debug)]
pub struct RunnerEvent {
    pub event_type: RunnerEventType,
    pub timestamp: SystemTime,
    pub consumer_group: String,
    pub queue_id: String,
    pub message: Option<String>,
}

impl RunnerEvent {
    pub fn new(event_type: RunnerEventType, consumer_group: String, queue_id: String) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            consumer_group,
            queue_id,
            message: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

#[derive(Clone, Debug)]
pub struct SystemEvent {
    pub event_type: SystemEventType,
    pub timestamp: SystemTime,
    pub message: Option<String>,
}

impl SystemEvent {
    pub fn new(event_type: SystemEventType) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            message: None,
        }
    }

    pub fn with_message(event_type: SystemEventType, message: String) -> Self {
        Self {
            message: Some(message),
            ..Self::new(event_type)
        }
    }
}

/// Unified event enum that encompasses all event types
#[derive(Clone, Debug)]
pub enum Event {
    Queue(QueueEvent),
    Alarm(AlarmEvent),
    Runner(RunnerEvent),
    System(SystemEvent),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Queue(_) => "Queue",
            Event::Alarm(_) => "Alarm",
            Event::Runner(_) => "Runner",
            Event::System(_) => "System",
        }
    }
}

/// Event filtering options for subscribers
#[derive(Clone, Debug, PartialEq)]
pub enum EventFilter {
    QueueOnly,
    AlarmOnly,
    RunnerOnly,
    SystemOnly,
    /// Everything an operator would page on
    QueueAndAlarm,
    All,
}

impl EventFilter {
    /// Check if an event should be accepted by this filter
    pub fn accepts(&self, event: &Event) -> bool {
        matches!(
            (self, event),
            (EventFilter::QueueOnly, Event::Queue(_))
                | (EventFilter::AlarmOnly, Event::Alarm(_))
                | (EventFilter::RunnerOnly, Event::Runner(_))
                | (EventFilter::SystemOnly, Event::System(_))
                | (EventFilter::QueueAndAlarm, Event::Queue(_))
                | (EventFilter::QueueAndAlarm, Event::Alarm(_))
                | (EventFilter::All, _)
        )
    }
}
