//! Issue, metric and report types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a reported issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    SyntaxError,
    FileReadError,
    LineTooLong,
    NamingConvention,
    HighComplexity,
    HighClassComplexity,
    Flake8,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::SyntaxError => "syntax_error",
            IssueType::FileReadError => "file_read_error",
            IssueType::LineTooLong => "line_too_long",
            IssueType::NamingConvention => "naming_convention",
            IssueType::HighComplexity => "high_complexity",
            IssueType::HighClassComplexity => "high_class_complexity",
            IssueType::Flake8 => "flake8",
        }
    }

    /// Human-readable title, e.g. `Line Too Long`
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding in one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeIssue {
    pub file_path: String,
    /// 1-based line, 0 when the issue concerns the whole file
    pub line_number: usize,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
}

impl CodeIssue {
    pub fn new(
        file_path: impl Into<String>,
        line_number: usize,
        issue_type: IssueType,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
            issue_type,
            severity,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Size and complexity figures for one file, or summed over a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeMetrics {
    /// Lines that are neither blank nor comment-only
    pub lines_of_code: usize,
    pub comment_lines: usize,
    pub blank_lines: usize,
    pub function_count: usize,
    pub class_count: usize,
    /// Sum of function complexities
    pub complexity: u32,
    pub maintainability_index: f64,
}

impl CodeMetrics {
    /// `max(0, 171 - 5.2 * complexity - 0.23 * loc - 16.2 * functions)`
    pub fn compute_maintainability(complexity: u32, lines_of_code: usize, function_count: usize) -> f64 {
        let mi = 171.0
            - 5.2 * complexity as f64
            - 0.23 * lines_of_code as f64
            - 16.2 * function_count as f64;
        mi.max(0.0)
    }
}

/// Aggregate counts and score for a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total_files: usize,
    pub total_issues: usize,
    pub issues_by_severity: BTreeMap<Severity, usize>,
    pub issues_by_type: BTreeMap<IssueType, usize>,
    pub quality_score: f64,
}

/// Complete result of analyzing a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub project_path: String,
    pub total_files: usize,
    pub total_issues: usize,
    pub metrics: CodeMetrics,
    pub issues: Vec<CodeIssue>,
    pub summary: QualitySummary,
}
