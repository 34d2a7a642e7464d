//! Output formatting for producer responses and the end-of-run summary

use crate::alarm::api::{AlarmSnapshot, AlarmStatus};
use crate::app::orchestrator::{DeadLetterReport, RunnerReport};
use crate::producer::api::ProducerResponse;
use colored::{Color, Colorize};

/// Longest body excerpt shown per dead-lettered message
const BODY_PREVIEW_CHARS: usize = 80;

fn paint(text: &str, color: Color, use_color: bool) -> String {
    if use_color {
        text.color(color).to_string()
    } else {
        text.to_string()
    }
}

fn heading(text: &str, use_color: bool) -> String {
    if use_color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// One JSON line per producer response
pub fn format_response(response: &ProducerResponse) -> String {
    serde_json::json!({
        "statusCode": response.status_code,
        "body": response.body,
    })
    .to_string()
}

pub fn render_runner_reports(reports: &[RunnerReport], use_color: bool) -> String {
    let mut out = heading("Consumers", use_color);
    out.push('\n');
    if reports.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    for report in reports {
        match &report.result {
            Ok(stats) => out.push_str(&format!(
                "  {:<16} {:<16} received {:>5}  ok {:>5}  failed {:>5}  timed out {:>5}  dead-lettered {:>5}  undeliverable {:>5}\n",
                report.group,
                report.queue_id,
                stats.received,
                stats.succeeded,
                stats.failed,
                stats.timed_out,
                stats.dead_lettered,
                stats.undeliverable
            )),
            Err(e) => out.push_str(&format!(
                "  {:<16} {:<16} {}\n",
                report.group,
                report.queue_id,
                paint(&format!("stopped on error: {e}"), Color::Red, use_color)
            )),
        }
    }
    out
}

pub fn render_dead_letters(reports: &[DeadLetterReport], use_color: bool) -> String {
    let mut out = String::new();
    for report in reports {
        out.push_str(&heading(
            &format!("Dead-letter queue '{}' ({} message(s))", report.queue_id, report.messages.len()),
            use_color,
        ));
        out.push('\n');
        for message in &report.messages {
            let body = message
                .body_str()
                .map(preview)
                .unwrap_or_else(|| format!("<{} bytes>", message.body.len()));
            out.push_str(&format!(
                "  {}  receives {:>3}  {}\n",
                paint(&message.id().to_string(), Color::Yellow, use_color),
                message.receive_count(),
                body
            ));
        }
    }
    out
}

pub fn render_alarms(snapshots: &[AlarmSnapshot], use_color: bool) -> String {
    let mut out = heading("Alarms", use_color);
    out.push('\n');
    for snapshot in snapshots {
        let status = match snapshot.status {
            AlarmStatus::Ok => paint("OK", Color::Green, use_color),
            AlarmStatus::Fired => paint("ALARM", Color::Red, use_color),
        };
        out.push_str(&format!(
            "  {:<16} {:<5}  window {:>5}/{:<5} total failures {:>5}  successes {:>5}\n",
            snapshot.consumer_group,
            status,
            snapshot.failures_in_window,
            snapshot.threshold,
            snapshot.total_failures,
            snapshot.total_successes
        ));
    }
    out
}

fn preview(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(BODY_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
