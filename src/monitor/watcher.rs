//! Log file change detection
//!
//! Polls one file's modification time and produces a [`LogSnapshot`]
//! whenever it advances. Only the first `.log` file discovered at startup
//! is watched; files created later are ignored.

use super::summary::{tail_lines, LogKeyword, LogSummary};
use crate::error::{IoResultExt, OpsError, Result};
use crate::fs::{ScanConfig, Scanner};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of trailing lines shown per snapshot
pub const DEFAULT_TAIL_LINES: usize = 10;

/// Find the file to watch: the first `*.log` under `logs_dir` in path order
pub fn discover_log_file(logs_dir: &Path) -> Result<PathBuf> {
    if !logs_dir.is_dir() {
        return Err(OpsError::NotFound(logs_dir.to_path_buf()));
    }

    let scanner = Scanner::new(ScanConfig::with_extension("log"))?;
    let result = scanner.scan(logs_dir)?;

    for err in &result.errors {
        tracing::warn!("Skipped entry while scanning {}: {}", logs_dir.display(), err);
    }

    let first = result
        .files
        .into_iter()
        .next()
        .ok_or_else(|| OpsError::NoLogFiles(logs_dir.to_path_buf()))?;

    tracing::info!("Watching {}", first.path.display());
    Ok(first.path)
}

/// State of the watched file at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct LogSnapshot {
    /// Watched file
    pub path: PathBuf,
    /// Modification time that triggered this snapshot
    pub modified: DateTime<Local>,
    /// Trailing lines of the file
    pub tail: Vec<String>,
    /// Keyword and line counts
    pub summary: LogSummary,
}

impl LogSnapshot {
    /// Print the snapshot as styled text
    pub fn print_text(&self) {
        println!(
            "\n==> {} (modified {}) <==",
            self.path.display(),
            self.modified.format("%Y-%m-%d %H:%M:%S")
        );

        for line in &self.tail {
            println!("{}", highlight(line));
        }

        println!("\n--- Summary ---");
        println!("Errors:      {}", console::style(self.summary.errors).red().bold());
        println!("Failed:      {}", console::style(self.summary.failures).magenta().bold());
        println!("Warnings:    {}", console::style(self.summary.warnings).yellow().bold());
        println!("Total lines: {}", self.summary.total_lines);
    }

    /// Print the snapshot as one JSON object per line
    pub fn print_json(&self) -> Result<()> {
        println!("{}", serde_json::to_string(self)?);
        Ok(())
    }
}

fn highlight(line: &str) -> String {
    if LogKeyword::Error.matches(line) {
        console::style(line).red().to_string()
    } else if LogKeyword::Failed.matches(line) {
        console::style(line).magenta().to_string()
    } else if LogKeyword::Warning.matches(line) {
        console::style(line).yellow().to_string()
    } else {
        line.to_string()
    }
}

/// Outcome of a watch session
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOutcome {
    /// Snapshots emitted, including the initial one
    pub snapshots: u64,
    /// Polls that failed to stat or read the file
    pub failed_polls: u64,
}

/// Watches one file for modification-time changes
pub struct LogWatcher {
    path: PathBuf,
    tail: usize,
    last_modified: Option<SystemTime>,
}

impl LogWatcher {
    /// Create a watcher for an existing file
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(OpsError::NotFound(path));
        }

        Ok(Self {
            path,
            tail: DEFAULT_TAIL_LINES,
            last_modified: None,
        })
    }

    /// Set number of trailing lines per snapshot
    pub fn with_tail(mut self, lines: usize) -> Self {
        self.tail = lines;
        self
    }

    /// Path being watched
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file now and record its modification time
    pub fn snapshot(&mut self) -> Result<LogSnapshot> {
        let modified = self.modified_time()?;
        let bytes = std::fs::read(&self.path).with_path(&self.path)?;
        let content = String::from_utf8_lossy(&bytes);

        self.last_modified = Some(modified);

        Ok(LogSnapshot {
            path: self.path.clone(),
            modified: DateTime::<Local>::from(modified),
            tail: tail_lines(&content, self.tail),
            summary: LogSummary::from_content(&content),
        })
    }

    /// Return a snapshot if the file changed since the last one
    pub fn poll(&mut self) -> Result<Option<LogSnapshot>> {
        let modified = self.modified_time()?;

        match self.last_modified {
            Some(last) if modified <= last => Ok(None),
            _ => self.snapshot().map(Some),
        }
    }

    fn modified_time(&self) -> Result<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .with_path(&self.path)
    }

    /// Emit an initial snapshot, then poll every `interval` until `shutdown`
    /// resolves
    pub async fn run<F, S>(
        &mut self,
        interval: Duration,
        shutdown: F,
        mut on_snapshot: S,
    ) -> Result<WatchOutcome>
    where
        F: Future<Output = ()>,
        S: FnMut(&LogSnapshot),
    {
        let mut outcome = WatchOutcome::default();

        let initial = self.snapshot()?;
        on_snapshot(&initial);
        outcome.snapshots += 1;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::debug!("Shutdown requested, stopping watcher");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll() {
                        Ok(Some(snapshot)) => {
                            on_snapshot(&snapshot);
                            outcome.snapshots += 1;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            outcome.failed_polls += 1;
                            tracing::warn!("Cannot read {}: {}", self.path.display(), e);
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::io::Write;
    use tempfile::TempDir;

    fn bump_mtime(path: &Path, secs: i64) {
        let meta = std::fs::metadata(path).unwrap();
        let current = FileTime::from_last_modification_time(&meta);
        let next = FileTime::from_unix_time(current.unix_seconds() + secs, 0);
        filetime::set_file_mtime(path, next).unwrap();
    }

    #[test]
    fn test_discover_first_log_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("zeta.log"), "z\n").unwrap();
        std::fs::write(dir.path().join("alpha.log"), "a\n").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "r\n").unwrap();

        let found = discover_log_file(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "alpha.log");
    }

    #[test]
    fn test_discover_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_log_file(dir.path()),
            Err(OpsError::NoLogFiles(_))
        ));
        assert!(matches!(
            discover_log_file(&dir.path().join("missing")),
            Err(OpsError::NotFound(_))
        ));
    }

    #[test]
    fn test_watcher_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        assert!(LogWatcher::new(dir.path().join("nope.log")).is_err());
    }

    #[test]
    fn test_poll_detects_mtime_advance() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("app.log");
        std::fs::write(&log, "INFO start\n").unwrap();

        let mut watcher = LogWatcher::new(&log).unwrap().with_tail(5);

        // First poll always reports
        let first = watcher.poll().unwrap().expect("initial snapshot");
        assert_eq!(first.summary.total_lines, 1);

        // Unchanged file
        assert!(watcher.poll().unwrap().is_none());

        let mut f = std::fs::OpenOptions::new().append(true).open(&log).unwrap();
        writeln!(f, "ERROR boom").unwrap();
        writeln!(f, "warning: low disk").unwrap();
        drop(f);
        bump_mtime(&log, 5);

        let next = watcher.poll().unwrap().expect("change detected");
        assert_eq!(next.summary.errors, 1);
        assert_eq!(next.summary.warnings, 1);
        assert_eq!(next.summary.total_lines, 3);
        assert_eq!(next.tail.last().unwrap(), "warning: low disk");

        assert!(watcher.poll().unwrap().is_none());
    }

    #[test]
    fn test_same_size_rewrite_is_detected() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("app.log");
        std::fs::write(&log, "ok ok\n").unwrap();

        let mut watcher = LogWatcher::new(&log).unwrap();
        watcher.snapshot().unwrap();

        std::fs::write(&log, "error\n").unwrap();
        bump_mtime(&log, 10);

        let snap = watcher.poll().unwrap().expect("rewrite detected");
        assert_eq!(snap.summary.errors, 1);
    }

    #[test]
    fn test_poll_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("app.log");
        std::fs::write(&log, "x\n").unwrap();

        let mut watcher = LogWatcher::new(&log).unwrap();
        std::fs::remove_file(&log).unwrap();
        assert!(watcher.poll().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("app.log");
        std::fs::write(&log, "failed once\n").unwrap();

        let mut watcher = LogWatcher::new(&log).unwrap();
        let mut seen = Vec::new();
        let outcome = watcher
            .run(Duration::from_millis(10), async {}, |s| seen.push(s.summary))
            .await
            .unwrap();

        assert_eq!(outcome.snapshots, 1);
        assert_eq!(seen[0].failures, 1);
    }

    #[tokio::test]
    async fn test_run_reports_changes() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("app.log");
        std::fs::write(&log, "INFO\n").unwrap();

        // Stage the new content with its final mtime, then swap it in
        let staged = dir.path().join("app.log.new");
        let target = log.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            std::fs::write(&staged, "INFO\nERROR late\n").unwrap();
            bump_mtime(&staged, 30);
            std::fs::rename(&staged, &target).unwrap();
        });

        let mut watcher = LogWatcher::new(&log).unwrap();
        let mut last = LogSummary::default();
        let outcome = watcher
            .run(
                Duration::from_millis(10),
                tokio::time::sleep(Duration::from_millis(400)),
                |s| last = s.summary,
            )
            .await
            .unwrap();
        writer.join().unwrap();

        assert_eq!(outcome.snapshots, 2);
        assert_eq!(last.errors, 1);
        assert_eq!(last.total_lines, 2);
    }
}
