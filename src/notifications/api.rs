//! Public API for the notification system
//!
//! External modules should import from here rather than directly from
//! internal modules. There is no global instance: the application creates
//! one [`NotificationManager`] and hands an `Arc` of it to every component
//! that reports lifecycle events.

pub use crate::notifications::error::NotificationError;
pub use crate::notifications::event::{
    AlarmEvent, AlarmEventType, Event, EventFilter, QueueEvent, QueueEventType, RunnerEvent,
    RunnerEventType, SystemEvent, SystemEventType,
};
pub use crate::notifications::manager::{EventReceiver, NotificationManager};

use std::sync::Arc;

/// Publish an event if a manager is attached, logging rather than failing
///
/// Lifecycle events are best-effort: a subscriber that went away must never
/// turn a queue or runner operation into an error.
pub fn publish_best_effort(manager: Option<&Arc<NotificationManager>>, event: Event) {
    if let Some(manager) = manager {
        if let Err(e) = manager.publish(event) {
            log::debug!("Notification not fully delivered: {}", e);
        }
    }
}
