//! Consumer-group failure alarms
//!
//! Consumer runners report every handler outcome to a shared
//! [`AlarmEvaluator`](api::AlarmEvaluator). A periodic ticker evaluates the
//! rolling failure window of each group and sends alerts to the configured
//! [`AlertSink`](api::AlertSink)s when a group crosses its threshold.

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod evaluator;
pub(crate) mod sink;

pub mod api;

#[cfg(test)]
mod tests;
