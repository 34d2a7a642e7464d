//! Application startup
//!
//! Parses arguments, initialises logging, loads configuration, builds the
//! orchestrator and feeds it the events given on the command line or in an
//! events file. Consumers then run until the consumed queues are drained,
//! `--run-for` elapses or a shutdown signal arrives, after which the runners
//! are drained and a summary is printed.

use crate::app::cli::display::{
    format_response, render_alarms, render_dead_letters, render_runner_reports,
};
use crate::app::cli::Args;
use crate::app::config::OrchestratorConfig;
use crate::app::orchestrator::Orchestrator;
use crate::core::error_handling::{log_error_with_context, render_error_for_operator, ContextualError};
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::time::system_clock;
use crate::notifications::api::{publish_best_effort, Event, SystemEvent, SystemEventType};
use crate::producer::api::{ProducerAdapter, ProducerResponse};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// How often drained-ness is checked when no `--run-for` is given
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
#[error("Failed to read events from {}: {source}", path.display())]
pub struct EventInputError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

impl ContextualError for EventInputError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Producer responses seen while feeding events
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    pub accepted: usize,
    pub rejected: usize,
}

impl FeedSummary {
    fn record(&mut self, response: &ProducerResponse) {
        println!("{}", format_response(response));
        if response.is_success() {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }
}

fn fail<E>(error: &E, context: &str) -> i32
where
    E: ContextualError + std::fmt::Debug,
{
    log_error_with_context(error, &render_error_for_operator(error, context));
    1
}

/// Run the application and return the process exit code
pub async fn startup() -> i32 {
    let args = Args::parse_from_env();
    let use_color = args.use_color();
    colored::control::set_override(use_color);

    let log_file = args.log_file_path();
    if let Err(e) = init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        log_file.as_deref(),
        use_color,
    ) {
        eprintln!("Failed to initialise logging: {e}");
        return 1;
    }
    log::info!(
        "orchestrator {} ({}, built {}) starting",
        env!("CARGO_PKG_VERSION"),
        crate::GIT_HASH,
        crate::BUILD_TIME
    );

    let (config, source) = match OrchestratorConfig::load(args.config_file.as_deref()).await {
        Ok(loaded) => loaded,
        Err(e) => return fail(&e, "Failed to load configuration"),
    };
    match &source {
        Some(path) => log::info!("Configuration loaded from {}", path.display()),
        None => log::info!("Using the built-in topology"),
    }

    let orchestrator = match Orchestrator::build(config, system_clock()) {
        Ok(orchestrator) => orchestrator,
        Err(e) => return fail(&e, "Failed to build orchestrator"),
    };

    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();
    publish_best_effort(
        Some(orchestrator.notifications()),
        Event::System(SystemEvent::new(SystemEventType::Startup)),
    );

    let running = orchestrator.start(&shutdown);

    let mut exit_code = 0;
    match feed_events(orchestrator.producer(), &args, &shutdown).await {
        Ok(summary) => log::info!(
            "Published {} event(s): {} accepted, {} rejected",
            summary.accepted + summary.rejected,
            summary.accepted,
            summary.rejected
        ),
        Err(e) => {
            exit_code = fail(&e, "Failed to read events");
            shutdown.trigger_shutdown();
        }
    }

    match args.run_for() {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => log::info!("Run time of {:?} elapsed", duration),
                _ = shutdown.wait() => {}
            }
        }
        None => {
            tokio::select! {
                _ = orchestrator.wait_until_idle(IDLE_POLL_INTERVAL) => log::info!("All consumed queues drained"),
                _ = shutdown.wait() => {}
            }
        }
    }

    shutdown.trigger_shutdown();
    let reports = running.join().await;

    // Failures from the last partial period still count
    if let Err(e) = orchestrator.alarms().evaluate() {
        log::error!("Final alarm evaluation failed: {}", e);
    }

    print!("{}", render_runner_reports(&reports, use_color));
    match orchestrator.dead_letter_report() {
        Ok(dead_letters) => print!("{}", render_dead_letters(&dead_letters, use_color)),
        Err(e) => log::error!("Failed to inspect dead-letter queues: {}", e),
    }
    match orchestrator.alarms().snapshots() {
        Ok(snapshots) => print!("{}", render_alarms(&snapshots, use_color)),
        Err(e) => log::error!("Failed to read alarm state: {}", e),
    }

    publish_best_effort(
        Some(orchestrator.notifications()),
        Event::System(SystemEvent::new(SystemEventType::Shutdown)),
    );

    if reports.iter().any(|report| report.result.is_err()) {
        exit_code = 1;
    }
    log::info!("orchestrator stopped");
    exit_code
}

/// Publish `--event` arguments, then every line of `--events-file`
pub async fn feed_events(
    producer: &ProducerAdapter,
    args: &Args,
    shutdown: &ShutdownCoordinator,
) -> Result<FeedSummary, EventInputError> {
    let mut summary = FeedSummary::default();
    for raw in &args.events {
        summary.record(&producer.handle_raw(raw));
    }

    let Some(path) = &args.events_file else {
        return Ok(summary);
    };
    if args.reads_stdin() {
        publish_lines(
            BufReader::new(tokio::io::stdin()),
            path,
            producer,
            shutdown,
            &mut summary,
        )
        .await?;
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| EventInputError {
                path: path.clone(),
                source,
            })?;
        publish_lines(BufReader::new(file), path, producer, shutdown, &mut summary).await?;
    }
    Ok(summary)
}

/// Publish one event per non-blank line; lines starting with '#' are skipped
async fn publish_lines<R>(
    reader: R,
    path: &Path,
    producer: &ProducerAdapter,
    shutdown: &ShutdownCoordinator,
    summary: &mut FeedSummary,
) -> Result<(), EventInputError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|source| EventInputError {
                path: path.to_path_buf(),
                source,
            })?,
            _ = shutdown.wait() => {
                log::info!("Stopped reading events on shutdown");
                return Ok(());
            }
        };
        let Some(line) = line else {
            return Ok(());
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        summary.record(&producer.handle_raw(line));
    }
}
