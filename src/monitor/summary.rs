//! Keyword counting and tail extraction for log content

use serde::{Deserialize, Serialize};

/// Keywords counted in each log snapshot, matched case-insensitively
pub const KEYWORDS: [LogKeyword; 3] = [LogKeyword::Error, LogKeyword::Failed, LogKeyword::Warning];

/// A keyword tracked by the log monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKeyword {
    /// `error`
    Error,
    /// `failed`
    Failed,
    /// `warning`
    Warning,
}

impl LogKeyword {
    /// Lowercase needle searched for in each line
    pub fn needle(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Failed => "failed",
            Self::Warning => "warning",
        }
    }

    /// Find the keyword in a line, case-insensitively
    pub fn matches(&self, line: &str) -> bool {
        line.to_lowercase().contains(self.needle())
    }
}

/// Line counts for one log snapshot
///
/// Keyword counts are the number of lines containing the keyword, like
/// `grep -ci`; a line with two occurrences counts once. `total_lines`
/// follows `wc -l` and counts newline characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    /// Lines containing `error`
    pub errors: usize,
    /// Lines containing `failed`
    pub failures: usize,
    /// Lines containing `warning`
    pub warnings: usize,
    /// Newline-terminated lines in the file
    pub total_lines: usize,
}

impl LogSummary {
    /// Compute counts for the full text of a log file
    pub fn from_content(content: &str) -> Self {
        let mut summary = LogSummary {
            total_lines: content.bytes().filter(|b| *b == b'\n').count(),
            ..Default::default()
        };

        for line in content.lines() {
            let lower = line.to_lowercase();
            if lower.contains(LogKeyword::Error.needle()) {
                summary.errors += 1;
            }
            if lower.contains(LogKeyword::Failed.needle()) {
                summary.failures += 1;
            }
            if lower.contains(LogKeyword::Warning.needle()) {
                summary.warnings += 1;
            }
        }

        summary
    }

    /// Count for a single keyword
    pub fn count(&self, keyword: LogKeyword) -> usize {
        match keyword {
            LogKeyword::Error => self.errors,
            LogKeyword::Failed => self.failures,
            LogKeyword::Warning => self.warnings,
        }
    }

    /// True when no keyword matched
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.failures == 0 && self.warnings == 0
    }
}

/// Return the last `n` lines of `content`, like `tail -n`
pub fn tail_lines(content: &str, n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FIXTURE: &str = "\
2024-01-01 10:00:00 INFO service started
2024-01-01 10:00:01 ERROR database connection failed
2024-01-01 10:00:02 WARNING disk almost full
2024-01-01 10:00:03 error: retry Failed again, error persists
2024-01-01 10:00:04 Warning: warnings ignored
2024-01-01 10:00:05 job FAILED with exit code 2
2024-01-01 10:00:06 INFO done
";

    #[test]
    fn test_fixture_matches_grep_ci() {
        // grep -ci error / failed / warning, wc -l
        let summary = LogSummary::from_content(FIXTURE);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.failures, 3);
        assert_eq!(summary.warnings, 2);
        assert_eq!(summary.total_lines, 7);
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_unterminated_last_line() {
        let summary = LogSummary::from_content("ok\nlast error");
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.total_lines, 1);
    }

    #[test]
    fn test_empty_content() {
        let summary = LogSummary::from_content("");
        assert_eq!(summary, LogSummary::default());
        assert!(summary.is_clean());
        assert!(tail_lines("", 10).is_empty());
    }

    #[test]
    fn test_tail_lines() {
        let tail = tail_lines(FIXTURE, 2);
        assert_eq!(tail.len(), 2);
        assert!(tail[0].contains("FAILED"));
        assert!(tail[1].ends_with("INFO done"));

        assert_eq!(tail_lines("a\nb\n", 10), vec!["a", "b"]);
        assert!(tail_lines("a\nb\n", 0).is_empty());
    }

    #[test]
    fn test_keyword_count_accessor() {
        let summary = LogSummary::from_content(FIXTURE);
        for keyword in KEYWORDS {
            let expected = FIXTURE.lines().filter(|l| keyword.matches(l)).count();
            assert_eq!(summary.count(keyword), expected);
        }
    }

    proptest! {
        #[test]
        fn prop_counts_match_line_scan(lines in proptest::collection::vec("[a-zA-Z :]{0,40}", 0..40)) {
            let content: String = lines.iter().map(|l| format!("{}\n", l)).collect();
            let summary = LogSummary::from_content(&content);

            prop_assert_eq!(summary.total_lines, lines.len());
            for keyword in KEYWORDS {
                let naive = lines
                    .iter()
                    .filter(|l| l.to_ascii_lowercase().contains(keyword.needle()))
                    .count();
                prop_assert_eq!(summary.count(keyword), naive);
            }
        }
    }
}
