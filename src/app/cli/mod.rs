//! Command-line surface: argument parsing and output formatting

pub mod args;
pub mod display;

pub use args::Args;
