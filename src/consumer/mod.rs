//! Consumer runners
//!
//! A [`ConsumerRunner`](api::ConsumerRunner) pulls batches from one delivery
//! queue, hands each message to a [`MessageHandler`](api::MessageHandler) and
//! reports the outcome back to the queue and to the alarm evaluator.

pub(crate) mod error;
pub(crate) mod handler;
pub(crate) mod runner;

pub mod api;

#[cfg(test)]
mod tests;
