//! Integration scenario modules

pub mod alarms;
pub mod binary;
pub mod concurrency;
pub mod dead_letter;
pub mod fan_out;
pub mod pipeline;
