//! Application layer: configuration, assembly and the binary's entry point

pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod startup;
