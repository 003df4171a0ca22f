//! Report rendering

use super::models::{CodeIssue, QualityReport};
use crate::error::Result;
use std::collections::BTreeMap;

impl QualityReport {
    /// Process exit status: 0 without issues, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.total_issues == 0 {
            0
        } else {
            1
        }
    }

    /// Print as pretty JSON
    pub fn print_json(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }

    /// Print the text report
    pub fn print_summary(&self) {
        let rule = "=".repeat(60);
        let thin = "-".repeat(40);

        println!("\n{}", rule);
        println!("CODE QUALITY REPORT");
        println!("{}", rule);
        println!("Project: {}", self.project_path);
        println!(
            "Analysis Date: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        println!("Total Files: {}", self.total_files);
        println!("Total Issues: {}", self.total_issues);
        println!("Quality Score: {}/100", score_style(self.summary.quality_score));

        println!("\n{}\nMETRICS\n{}", thin, thin);
        println!("Lines of Code: {}", self.metrics.lines_of_code);
        println!("Comment Lines: {}", self.metrics.comment_lines);
        println!("Blank Lines: {}", self.metrics.blank_lines);
        println!("Functions: {}", self.metrics.function_count);
        println!("Classes: {}", self.metrics.class_count);
        println!("Total Complexity: {}", self.metrics.complexity);
        println!(
            "Avg Maintainability Index: {:.2}",
            self.metrics.maintainability_index
        );

        println!("\n{}\nISSUES BY SEVERITY\n{}", thin, thin);
        for (severity, count) in &self.summary.issues_by_severity {
            let label = capitalize(severity.as_str());
            println!("{}: {}", label, count);
        }

        println!("\n{}\nISSUES BY TYPE\n{}", thin, thin);
        for (issue_type, count) in &self.summary.issues_by_type {
            println!("{}: {}", issue_type.title(), count);
        }

        if self.issues.is_empty() {
            return;
        }

        println!("\n{}\nDETAILED ISSUES\n{}", thin, thin);
        for (file, issues) in group_by_file(&self.issues) {
            println!("\n{}:", console::style(file).bold());
            for issue in issues {
                println!(
                    "  Line {}: [{}] {}",
                    issue.line_number,
                    issue.severity.as_str().to_uppercase(),
                    issue.message
                );
                if let Some(suggestion) = &issue.suggestion {
                    println!("    Suggestion: {}", suggestion);
                }
            }
        }
    }
}

/// Issues grouped per file, each group sorted by line
pub fn group_by_file(issues: &[CodeIssue]) -> BTreeMap<&str, Vec<&CodeIssue>> {
    let mut groups: BTreeMap<&str, Vec<&CodeIssue>> = BTreeMap::new();
    for issue in issues {
        groups.entry(issue.file_path.as_str()).or_default().push(issue);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|i| i.line_number);
    }
    groups
}

fn score_style(score: f64) -> console::StyledObject<String> {
    let text = format!("{}", score);
    if score >= 80.0 {
        console::style(text).green()
    } else if score >= 50.0 {
        console::style(text).yellow()
    } else {
        console::style(text).red()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
