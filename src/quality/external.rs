//! Optional `flake8` integration

use super::models::{CodeIssue, IssueType, Severity};
use regex::Regex;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Time allowed for one external tool run
pub const EXTERNAL_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `flake8` on one file; a missing tool, failure to start or timeout
/// yields no issues
pub fn run_flake8(file: &Path) -> Vec<CodeIssue> {
    if which::which("flake8").is_err() {
        tracing::debug!("flake8 not installed, skipping external checks");
        return Vec::new();
    }

    let mut command = Command::new("flake8");
    command.arg(file);

    match run_with_timeout(command, EXTERNAL_TOOL_TIMEOUT) {
        Some(output) if output.status.success() => Vec::new(),
        Some(output) => parse_flake8_output(&String::from_utf8_lossy(&output.stdout)),
        None => Vec::new(),
    }
}

/// Spawn a command and collect its output, killing it after `timeout`
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Option<Output> {
    let mut child = match command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!("Cannot start {:?}: {}", command.get_program(), e);
            return None;
        }
    };

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return child.wait_with_output().ok(),
            Ok(None) if Instant::now() >= deadline => {
                tracing::warn!(
                    "{:?} timed out after {}s",
                    command.get_program(),
                    timeout.as_secs()
                );
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Err(e) => {
                tracing::debug!("Waiting on {:?} failed: {}", command.get_program(), e);
                return None;
            }
        }
    }
}

fn flake8_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<path>.+?):(?P<line>\d+):(?P<col>\d+): (?P<code>[A-Z]+\d+) (?P<text>.*)$")
            .expect("flake8 pattern is valid")
    })
}

/// Parse `path:line:col: CODE message` lines; `W` codes are warnings,
/// everything else is an error
pub fn parse_flake8_output(stdout: &str) -> Vec<CodeIssue> {
    stdout
        .lines()
        .filter_map(|line| {
            let caps = flake8_line().captures(line.trim_end())?;
            let code = &caps["code"];
            let severity = if code.starts_with('W') {
                Severity::Warning
            } else {
                Severity::Error
            };
            Some(CodeIssue::new(
                &caps["path"],
                caps["line"].parse().unwrap_or(0),
                IssueType::Flake8,
                severity,
                format!("{}: {}", code, &caps["text"]),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flake8_output() {
        let stdout = "\
src/app.py:3:1: E302 expected 2 blank lines, found 1
src/app.py:10:80: W291 trailing whitespace
not a flake8 line
";
        let issues = parse_flake8_output(stdout);
        assert_eq!(issues.len(), 2);

        assert_eq!(issues[0].file_path, "src/app.py");
        assert_eq!(issues[0].line_number, 3);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].message, "E302: expected 2 blank lines, found 1");

        assert_eq!(issues[1].severity, Severity::Warning);
        assert_eq!(issues[1].issue_type, IssueType::Flake8);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_kills_slow_command() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let started = Instant::now();
        assert!(run_with_timeout(command, Duration::from_millis(100)).is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_collects_output() {
        let mut command = Command::new("echo");
        command.arg("hello");
        let output = run_with_timeout(command, Duration::from_secs(5)).unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn test_missing_program() {
        let command = Command::new("definitely-not-a-real-tool-xyz");
        assert!(run_with_timeout(command, Duration::from_secs(1)).is_none());
    }
}
