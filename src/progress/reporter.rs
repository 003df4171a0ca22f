//! Step progress reporter
//!
//! Uses an indicatif spinner for the step currently running and leaves a
//! one-line outcome per finished step:
//! - ✓ success
//! - ! completed with a warning
//! - ✗ failed

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress reporter for sequential, long-running steps
pub struct StepReporter {
    /// Spinner for the current step
    spinner: ProgressBar,
    /// Start time
    start_time: Instant,
    /// Steps finished successfully
    succeeded: AtomicU64,
    /// Steps finished with a warning
    warned: AtomicU64,
    /// Steps that failed
    failed: AtomicU64,
    /// Is output enabled
    enabled: AtomicBool,
}

impl StepReporter {
    /// Create a reporter drawing to stderr
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        Self {
            spinner,
            start_time: Instant::now(),
            succeeded: AtomicU64::new(0),
            warned: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a reporter that draws nothing (quiet mode, tests)
    pub fn disabled() -> Self {
        let reporter = Self::new();
        reporter.enabled.store(false, Ordering::SeqCst);
        reporter.spinner.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Enabled on an attended terminal, disabled otherwise
    pub fn for_terminal() -> Self {
        if console::user_attended_stderr() {
            Self::new()
        } else {
            Self::disabled()
        }
    }

    /// Begin a step
    pub fn start_step(&self, message: &str) {
        self.spinner.reset_elapsed();
        self.spinner.set_message(message.to_string());
        if self.is_enabled() {
            self.spinner.enable_steady_tick(Duration::from_millis(100));
        }
    }

    /// Update the running step's message
    pub fn set_status(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    /// Print a line above the spinner without breaking it
    pub fn println(&self, line: &str) {
        if self.is_enabled() {
            self.spinner.println(line);
        }
    }

    /// Finish the current step successfully
    pub fn finish_success(&self, message: &str) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.finish_line(format!("{} {}", console::style("✓").green(), message));
    }

    /// Finish the current step with a warning
    pub fn finish_warning(&self, message: &str) {
        self.warned.fetch_add(1, Ordering::Relaxed);
        self.finish_line(format!("{} {}", console::style("!").yellow(), message));
    }

    /// Finish the current step as failed
    pub fn finish_error(&self, message: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.finish_line(format!("{} {}", console::style("✗").red(), message));
    }

    fn finish_line(&self, line: String) {
        self.spinner.disable_steady_tick();
        if self.is_enabled() {
            self.spinner.println(line);
        }
        self.spinner.set_message(String::new());
    }

    /// Remove the spinner from the terminal
    pub fn clear(&self) {
        self.spinner.finish_and_clear();
    }

    /// Get elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check if output is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Outcome counts so far
    pub fn summary(&self) -> StepSummary {
        StepSummary {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            warned: self.warned.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }
}

impl Default for StepReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Step outcome counts
#[derive(Debug, Clone, Copy)]
pub struct StepSummary {
    pub succeeded: u64,
    pub warned: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

impl StepSummary {
    /// Total finished steps
    pub fn total(&self) -> u64 {
        self.succeeded + self.warned + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_counts() {
        let reporter = StepReporter::disabled();
        assert!(!reporter.is_enabled());

        reporter.start_step("one");
        reporter.finish_success("one done");
        reporter.start_step("two");
        reporter.finish_warning("two partly done");
        reporter.start_step("three");
        reporter.finish_error("three failed");
        reporter.clear();

        let summary = reporter.summary();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.warned, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
    }
}
