//! Command-line arguments

use clap::{ArgAction, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "orchestrator")]
#[command(about = "Publish events to a filtered topic fan-out and run its consumers")]
#[command(version)]
#[command(after_help = " * can be specified multiple times")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Force coloured output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// JSON event to publish*
    #[arg(short = 'e', long = "event", value_name = "JSON", action = ArgAction::Append)]
    pub events: Vec<String>,

    /// File of JSON events, one per line ('-' reads stdin)
    #[arg(short = 'i', long = "events-file", value_name = "FILE")]
    pub events_file: Option<PathBuf>,

    /// Keep consumers running for this many seconds instead of stopping once drained
    #[arg(short = 't', long = "run-for", value_name = "SECS")]
    pub run_for: Option<u64>,
}

impl Args {
    pub fn parse_from_env() -> Self {
        Self::parse()
    }

    /// Colour is on when forced, off when disabled, otherwise follows the TTY
    pub fn use_color(&self) -> bool {
        if self.no_color {
            false
        } else if self.color {
            true
        } else {
            std::io::stdout().is_terminal()
        }
    }

    /// Log file unless disabled with 'none'
    pub fn log_file_path(&self) -> Option<String> {
        self.log_file
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
            .filter(|path| !path.eq_ignore_ascii_case("none"))
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for.map(Duration::from_secs)
    }

    /// True when events come from stdin
    pub fn reads_stdin(&self) -> bool {
        self.events_file
            .as_ref()
            .is_some_and(|path| path.as_os_str() == "-")
    }
}
