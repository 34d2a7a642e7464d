//! Topic fan-out with attribute filtering
//!
//! A [`Topic`](api::Topic) holds an ordered list of subscriptions, each
//! binding one delivery queue to an optional [`FilterPolicy`](api::FilterPolicy).
//! Publishing enqueues an independent copy of the message into every queue
//! whose filter accepts it.
//!
//! ```text
//!                     ┌──────────── Topic ────────────┐
//!   publish(msg) ───▶ │ sub-1  eventType in [typeA] ──┼──▶ QueueA
//!                     │ sub-2  eventType in [typeB] ──┼──▶ QueueB
//!                     │ sub-3  eventType in [typeC] ──┼──▶ QueueC
//!                     └───────────────────────────────┘
//! ```

pub(crate) mod error;
pub(crate) mod filter;
pub(crate) mod router;
pub(crate) mod subscription;

pub mod api;

#[cfg(test)]
mod tests;
