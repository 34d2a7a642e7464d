//! Delivery Queue Component
//!
//! Named, at-least-once delivery queues with visibility timeouts, bounded
//! redelivery and dead-letter redirection.
//!
//! # Overview
//!
//! - **FIFO delivery**: visible messages are handed out oldest first
//! - **Visibility timeout**: a received message is hidden until it is
//!   acknowledged, requeued or its deadline passes
//! - **Bounded redelivery**: every receive increments the message's receive
//!   count; once it reaches `max_receive_count` a failed message leaves the
//!   queue
//! - **Dead-letter queues**: exhausted messages move to the configured
//!   dead-letter queue with their receive count intact, or are reported as
//!   undeliverable when there is none
//! - **Event Integration**: dead-lettering, undeliverable drops and capacity
//!   rejections are published to the notification system
//!
//! # Message lifecycle
//!
//! ```text
//!   enqueue            receive                 ack
//! ──────────▶ Visible ─────────▶ InFlight ─────────────▶ (removed)
//!               ▲                  │  │
//!               │   requeue /      │  │ requeue with
//!               │   timeout        │  │ receives exhausted
//!               └──────────────────┘  ▼
//!                            DeadLetterQueue / Undeliverable
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use orchestrator::core::time::system_clock;
//! use orchestrator::queue::api::{Message, QueueConfig, QueueManager, RequeueOutcome};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = QueueManager::new(system_clock());
//! manager.create_queue(QueueConfig::new("DeadLetterQueue"))?;
//! let queue = manager.create_queue(
//!     QueueConfig::new("QueueA")
//!         .with_max_receive_count(2)
//!         .with_dead_letter_queue("DeadLetterQueue"),
//! )?;
//!
//! queue.enqueue(Message::new("payload").with_attribute("eventType", "typeA"))?;
//! for message in queue.receive(10)? {
//!     match queue.requeue(message.id())? {
//!         RequeueOutcome::Requeued => println!("will retry {}", message.id()),
//!         other => println!("{}: {:?}", message.id(), other),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub(crate) mod dead_letter;
pub(crate) mod error;
pub(crate) mod internal;
pub(crate) mod manager;
pub(crate) mod message;
pub(crate) mod types;

pub mod api;

pub use error::{QueueError, QueueResult};
pub use internal::DeliveryQueue;
pub use manager::QueueManager;
pub use message::{AttributeValue, Attributes, Message, MessageHeader, MessageId};
pub use types::{QueueConfig, QueueStats, RequeueOutcome};

#[cfg(test)]
mod tests;
