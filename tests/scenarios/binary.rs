//! The command-line binary

use std::io::Write;
use std::process::Command;

fn orchestrator_command(config: &tempfile::NamedTempFile) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_orchestrator"));
    command
        .arg("--config-file")
        .arg(config.path())
        .args(["--no-color", "--log-level", "off", "--log-file", "none"]);
    command
}

fn default_config_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[runner.backoff]\ninitial_delay_ms = 5\nmax_delay_ms = 20").unwrap();
    file
}

#[test]
fn test_events_are_published_and_drained() {
    let config = default_config_file();

    let output = orchestrator_command(&config)
        .args(["--event", r#"{"eventType":"typeA"}"#])
        .args(["--event", "not json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let responses: Vec<serde_json::Value> = stdout
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["statusCode"], 200);
    assert_eq!(responses[1]["statusCode"], 500);
    assert!(stdout.contains("Consumers"));
    assert!(stdout.contains("ConsumerA"));
    assert!(stdout.contains("Dead-letter queue 'DeadLetterQueue' (0 message(s))"));
}

#[test]
fn test_missing_config_file_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_orchestrator"))
        .args(["--config-file", "/nonexistent/orchestrator.toml"])
        .args(["--no-color", "--log-file", "none"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[test]
fn test_invalid_config_fails() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "[alarm]\nthreshold = 0").unwrap();

    let output = orchestrator_command(&config).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
}
