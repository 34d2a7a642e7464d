//! Core services and infrastructure

pub mod backoff;
pub mod error_handling;
pub mod logging;
pub mod shutdown;
pub mod sync;
pub mod time;
pub mod validation;
