pub mod alarm;
pub mod app;
pub mod consumer;
pub mod core;
pub mod notifications;
pub mod producer;
pub mod queue;
pub mod topic;

include!(concat!(env!("OUT_DIR"), "/version.rs"));
