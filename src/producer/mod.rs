//! Producer adapter
//!
//! Accepts external JSON events and publishes them to the topic, answering
//! with a coarse HTTP-style status.

pub(crate) mod adapter;

pub mod api;
