//! Dead-letter redirection
//!
//! A message that has been received `max_receive_count` times without being
//! acknowledged leaves its source queue for good. If the source queue has a
//! dead-letter queue attached the message is appended there with its receive
//! count intact; otherwise it is undeliverable.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::internal::DeliveryQueue;
use crate::queue::message::Message;

/// Move an exhausted message into `from_queue`'s dead-letter queue
///
/// Returns the name of the queue that took the message. Fails with
/// [`QueueError::Undeliverable`] when no dead-letter queue is attached or
/// the dead-letter queue refuses the message.
pub fn redirect(message: Message, from_queue: &DeliveryQueue) -> QueueResult<String> {
    let message_id = message.id();
    let Some(dead_letter_queue) = from_queue.dead_letter_queue() else {
        return Err(QueueError::Undeliverable {
            queue_id: from_queue.name().to_string(),
            message_id,
            reason: format!(
                "no dead-letter queue configured after {} receive(s)",
                message.receive_count()
            ),
        });
    };

    dead_letter_queue
        .accept_dead_letter(message)
        .map(|_| dead_letter_queue.name().to_string())
        .map_err(|e| QueueError::Undeliverable {
            queue_id: from_queue.name().to_string(),
            message_id,
            reason: format!(
                "dead-letter queue '{}' refused it: {}",
                dead_letter_queue.name(),
                e
            ),
        })
}
