//! Per-file analysis and project aggregation

use super::config::QualityConfig;
use super::external::run_flake8;
use super::lexer::tokenize;
use super::models::{CodeIssue, CodeMetrics, IssueType, QualityReport, QualitySummary, Severity};
use super::structure::{analyze, ModuleStructure};
use crate::error::{OpsError, Result};
use crate::fs::{ScanConfig, Scanner};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Issues and metrics for one file
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    pub issues: Vec<CodeIssue>,
    pub metrics: CodeMetrics,
}

/// Python project analyzer
pub struct QualityChecker {
    project_path: PathBuf,
    config: QualityConfig,
}

impl QualityChecker {
    pub fn new(project_path: impl Into<PathBuf>, config: QualityConfig) -> Self {
        Self {
            project_path: project_path.into(),
            config,
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// All `.py` files under the project, ignored paths excluded, sorted
    pub fn find_python_files(&self) -> Result<Vec<PathBuf>> {
        let scanner = Scanner::new(ScanConfig {
            ignore_patterns: self.config.ignore_patterns.clone(),
            ..ScanConfig::with_extension("py")
        })?;

        let result = scanner.scan(&self.project_path)?;
        for err in &result.errors {
            tracing::warn!("Skipped entry: {}", err);
        }
        tracing::debug!(
            "Scanned {} in {:?}, pruned {} directories",
            self.project_path.display(),
            result.scan_duration,
            result.pruned_dirs
        );

        Ok(result.files.into_iter().map(|f| f.path).collect())
    }

    /// Analyze one file from disk
    pub fn analyze_file(&self, path: &Path) -> FileAnalysis {
        let display = path.display().to_string();

        let source = match std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
        {
            Ok(source) => source,
            Err(e) => {
                return FileAnalysis {
                    issues: vec![CodeIssue::new(
                        display,
                        0,
                        IssueType::FileReadError,
                        Severity::Error,
                        format!("Could not read file: {}", e),
                    )
                    .with_suggestion("Check file encoding and content")],
                    metrics: CodeMetrics::default(),
                };
            }
        };

        let mut analysis = self.analyze_source(&display, &source);
        if self.config.run_external_tools {
            analysis.issues.extend(run_flake8(path));
        }
        analysis
    }

    /// Analyze source text; `file_path` is only used in issue records
    pub fn analyze_source(&self, file_path: &str, source: &str) -> FileAnalysis {
        let mut issues = Vec::new();
        let parsed = tokenize(source).and_then(|lines| analyze(&lines));

        if let Err(problem) = &parsed {
            issues.push(
                CodeIssue::new(
                    file_path,
                    problem.line,
                    IssueType::SyntaxError,
                    Severity::Error,
                    format!("Syntax error: {}", problem.message),
                )
                .with_suggestion("Fix the syntax error to make the code valid Python"),
            );
        }

        issues.extend(self.check_line_length(file_path, source));

        // Unparseable files contribute zeroed metrics
        let metrics = match parsed {
            Ok(module) => {
                issues.extend(check_naming(file_path, &module));
                issues.extend(self.check_complexity(file_path, &module));
                line_metrics(source, &module)
            }
            Err(_) => CodeMetrics::default(),
        };

        FileAnalysis { issues, metrics }
    }

    fn check_line_length(&self, file_path: &str, source: &str) -> Vec<CodeIssue> {
        let max = self.config.max_line_length;
        source
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let length = line.trim_end_matches('\r').chars().count();
                (length > max).then(|| {
                    CodeIssue::new(
                        file_path,
                        i + 1,
                        IssueType::LineTooLong,
                        Severity::Warning,
                        format!("Line {} is {} characters long (max {})", i + 1, length, max),
                    )
                    .with_suggestion("Break the line into multiple lines or use line continuation")
                })
            })
            .collect()
    }

    fn check_complexity(&self, file_path: &str, module: &ModuleStructure) -> Vec<CodeIssue> {
        let mut issues = Vec::new();
        let max_fn = self.config.max_function_complexity;
        let max_class = self.config.max_class_complexity;

        for function in &module.functions {
            if function.complexity > max_fn {
                issues.push(
                    CodeIssue::new(
                        file_path,
                        function.line,
                        IssueType::HighComplexity,
                        Severity::Warning,
                        format!(
                            "Function '{}' has complexity {} (max {})",
                            function.name, function.complexity, max_fn
                        ),
                    )
                    .with_suggestion(
                        "Consider breaking down the function into smaller, simpler functions",
                    ),
                );
            }
        }

        for class in &module.classes {
            let complexity = module.class_complexity(class);
            if complexity > max_class {
                issues.push(
                    CodeIssue::new(
                        file_path,
                        class.line,
                        IssueType::HighClassComplexity,
                        Severity::Warning,
                        format!(
                            "Class '{}' has complexity {} (max {})",
                            class.name, complexity, max_class
                        ),
                    )
                    .with_suggestion("Consider splitting the class into multiple classes"),
                );
            }
        }

        issues
    }

    /// Analyze every file in the project and build the report
    pub fn run_analysis(&self) -> Result<QualityReport> {
        if !self.project_path.is_dir() {
            return Err(OpsError::NotFound(self.project_path.clone()));
        }

        tracing::info!("Analyzing code quality in: {}", self.project_path.display());
        let files = self.find_python_files()?;
        tracing::info!("Found {} Python files to analyze", files.len());

        let analyses: Vec<FileAnalysis> = files
            .par_iter()
            .map(|path| {
                tracing::debug!("Analyzing: {}", path.display());
                self.analyze_file(path)
            })
            .collect();

        Ok(self.build_report(files.len(), analyses))
    }

    fn build_report(&self, total_files: usize, analyses: Vec<FileAnalysis>) -> QualityReport {
        let mut metrics = CodeMetrics::default();
        let mut maintainability_sum = 0.0;
        let mut issues = Vec::new();

        for analysis in &analyses {
            let m = &analysis.metrics;
            metrics.lines_of_code += m.lines_of_code;
            metrics.comment_lines += m.comment_lines;
            metrics.blank_lines += m.blank_lines;
            metrics.function_count += m.function_count;
            metrics.class_count += m.class_count;
            metrics.complexity += m.complexity;
            maintainability_sum += m.maintainability_index;
        }
        if !analyses.is_empty() {
            metrics.maintainability_index = maintainability_sum / analyses.len() as f64;
        }

        for analysis in analyses {
            issues.extend(analysis.issues);
        }

        let mut issues_by_severity = BTreeMap::new();
        let mut issues_by_type = BTreeMap::new();
        for issue in &issues {
            *issues_by_severity.entry(issue.severity).or_insert(0) += 1;
            *issues_by_type.entry(issue.issue_type).or_insert(0) += 1;
        }

        let quality_score = quality_score(&self.config, &issues, &metrics);

        QualityReport {
            project_path: self.project_path.display().to_string(),
            total_files,
            total_issues: issues.len(),
            metrics,
            summary: QualitySummary {
                total_files,
                total_issues: issues.len(),
                issues_by_severity,
                issues_by_type,
                quality_score,
            },
            issues,
        }
    }
}

/// Score in `[0, 100]`, rounded to 2 decimals
///
/// 100 with no issues; otherwise 100 minus the summed severity weights,
/// `min(2 * complexity, 20)` and `max(0, 50 - maintainability)`.
pub fn quality_score(config: &QualityConfig, issues: &[CodeIssue], metrics: &CodeMetrics) -> f64 {
    if issues.is_empty() {
        return 100.0;
    }

    let issue_penalty: f64 = issues
        .iter()
        .map(|i| config.severity_weights.weight(i.severity))
        .sum();
    let complexity_penalty = (metrics.complexity as f64 * 2.0).min(20.0);
    let maintainability_penalty = (50.0 - metrics.maintainability_index).max(0.0);

    let score = (100.0 - (issue_penalty + complexity_penalty + maintainability_penalty)).max(0.0);
    (score * 100.0).round() / 100.0
}

fn check_naming(file_path: &str, module: &ModuleStructure) -> Vec<CodeIssue> {
    let mut issues = Vec::new();

    for function in &module.functions {
        if !is_lower(&function.name) && !function.name.contains('_') {
            issues.push(
                CodeIssue::new(
                    file_path,
                    function.line,
                    IssueType::NamingConvention,
                    Severity::Warning,
                    format!("Function '{}' should use snake_case naming", function.name),
                )
                .with_suggestion("Rename function to use snake_case (e.g., 'my_function')"),
            );
        }
    }

    for class in &module.classes {
        let starts_upper = class.name.chars().next().map_or(false, char::is_uppercase);
        if !starts_upper || class.name.contains('_') {
            issues.push(
                CodeIssue::new(
                    file_path,
                    class.line,
                    IssueType::NamingConvention,
                    Severity::Warning,
                    format!("Class '{}' should use PascalCase naming", class.name),
                )
                .with_suggestion("Rename class to use PascalCase (e.g., 'MyClass')"),
            );
        }
    }

    for binding in &module.bindings {
        let name = &binding.name;
        if !is_lower(name) && !name.contains('_') && !is_upper(name) {
            issues.push(
                CodeIssue::new(
                    file_path,
                    binding.line,
                    IssueType::NamingConvention,
                    Severity::Info,
                    format!("Variable '{}' should use snake_case naming", name),
                )
                .with_suggestion("Rename variable to use snake_case (e.g., 'my_variable')"),
            );
        }
    }

    issues.sort_by_key(|i| i.line_number);
    issues
}

/// At least one cased character and no uppercase ones
fn is_lower(name: &str) -> bool {
    name.chars().any(char::is_lowercase) && !name.chars().any(char::is_uppercase)
}

/// At least one cased character and no lowercase ones
fn is_upper(name: &str) -> bool {
    name.chars().any(char::is_uppercase) && !name.chars().any(char::is_lowercase)
}

fn line_metrics(source: &str, module: &ModuleStructure) -> CodeMetrics {
    let mut total = 0usize;
    let mut comment_lines = 0usize;
    let mut blank_lines = 0usize;

    for line in source.lines() {
        total += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            blank_lines += 1;
        } else if trimmed.starts_with('#') {
            comment_lines += 1;
        }
    }

    let lines_of_code = total - comment_lines - blank_lines;
    let complexity = module.total_complexity();
    let function_count = module.functions.len();

    CodeMetrics {
        lines_of_code,
        comment_lines,
        blank_lines,
        function_count,
        class_count: module.classes.len(),
        complexity,
        maintainability_index: CodeMetrics::compute_maintainability(
            complexity,
            lines_of_code,
            function_count,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn checker() -> QualityChecker {
        QualityChecker::new(".", QualityConfig::default())
    }

    fn types(analysis: &FileAnalysis) -> Vec<IssueType> {
        analysis.issues.iter().map(|i| i.issue_type).collect()
    }

    #[test]
    fn test_empty_file_has_no_issues() {
        let analysis = checker().analyze_source("empty.py", "");
        assert!(analysis.issues.is_empty());
        assert_eq!(analysis.metrics.maintainability_index, 171.0);
    }

    #[test]
    fn test_clean_module_has_no_issues() {
        let src = "\
\"\"\"Small, tidy module.\"\"\"

MAX_RETRIES = 3


class Greeter:
    def greet(self, name):
        message = f\"hello {name}\"
        return message


def main():
    greeter = Greeter()
    return greeter.greet(\"world\")
";
        let analysis = checker().analyze_source("clean.py", src);
        assert!(analysis.issues.is_empty(), "{:?}", analysis.issues);
        assert_eq!(analysis.metrics.function_count, 2);
        assert_eq!(analysis.metrics.class_count, 1);
        assert_eq!(analysis.metrics.complexity, 2);
        assert_eq!(analysis.metrics.blank_lines, 5);
    }

    #[test]
    fn test_line_too_long() {
        let long = format!("x = '{}'\n", "a".repeat(90));
        let analysis = checker().analyze_source("long.py", &long);
        assert_eq!(types(&analysis), vec![IssueType::LineTooLong]);
        assert_eq!(analysis.issues[0].line_number, 1);
        assert!(analysis.issues[0].message.contains("96 characters"));
    }

    #[test]
    fn test_naming_rules() {
        let src = "\
def doThing():
    pass

def Run():
    pass

def run_Fast():
    pass

class lower_case:
    pass

class _Private:
    pass

myValue = 1
CONSTANT = 2
snake_case = 3
";
        let analysis = checker().analyze_source("names.py", src);
        let flagged: Vec<(usize, Severity)> = analysis
            .issues
            .iter()
            .map(|i| (i.line_number, i.severity))
            .collect();
        assert_eq!(
            flagged,
            vec![
                (1, Severity::Warning),
                (4, Severity::Warning),
                (10, Severity::Warning),
                (13, Severity::Warning),
                (16, Severity::Info),
            ]
        );
    }

    #[test]
    fn test_complexity_limits() {
        let config = QualityConfig {
            max_function_complexity: 2,
            max_class_complexity: 3,
            ..Default::default()
        };
        let src = "\
class Busy:
    def one(self, a):
        if a:
            return 1
        return 2

    def two(self, a, b):
        if a or b:
            return 1
        return 0
";
        let analysis = QualityChecker::new(".", config).analyze_source("busy.py", src);
        let issues: Vec<(IssueType, usize)> = analysis
            .issues
            .iter()
            .map(|i| (i.issue_type, i.line_number))
            .collect();
        assert_eq!(
            issues,
            vec![
                (IssueType::HighComplexity, 7),
                (IssueType::HighClassComplexity, 1),
            ]
        );
        assert!(analysis.issues[0].message.contains("'two' has complexity 3 (max 2)"));
    }

    #[test]
    fn test_syntax_error_skips_structure_checks() {
        let src = "def Bad(:\n    pass\n";
        let analysis = checker().analyze_source("bad.py", src);
        assert_eq!(types(&analysis), vec![IssueType::SyntaxError]);
        assert_eq!(analysis.metrics, CodeMetrics::default());
    }

    #[test]
    fn test_syntax_error_zeroes_metrics() {
        let src = "x = 1\ndef f(:\n    pass\n";
        let analysis = checker().analyze_source("bad.py", src);
        assert_eq!(analysis.metrics.lines_of_code, 0);
        assert_eq!(analysis.metrics.maintainability_index, 0.0);
        assert_eq!(analysis.metrics.complexity, 0);
    }

    #[test]
    fn test_quality_score() {
        let config = QualityConfig::default();
        let metrics = CodeMetrics {
            complexity: 3,
            maintainability_index: 40.0,
            ..Default::default()
        };
        assert_eq!(quality_score(&config, &[], &metrics), 100.0);

        let issues = vec![
            CodeIssue::new("a.py", 1, IssueType::SyntaxError, Severity::Error, "x"),
            CodeIssue::new("a.py", 2, IssueType::NamingConvention, Severity::Info, "y"),
        ];
        // 100 - (3 + 1 + 6 + 10)
        assert_eq!(quality_score(&config, &issues, &metrics), 80.0);

        let heavy = CodeMetrics {
            complexity: 50,
            maintainability_index: 0.0,
            ..Default::default()
        };
        assert_eq!(quality_score(&config, &issues, &heavy), 26.0);
    }

    #[test]
    fn test_run_analysis_on_project() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ok.py"), "value = 1\n").unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/bad.py"), "camelCase = (1,\n").unwrap();
        std::fs::create_dir_all(dir.path().join("venv/lib")).unwrap();
        std::fs::write(dir.path().join("venv/lib/skip.py"), "x = (\n").unwrap();
        std::fs::write(dir.path().join("pkg/latin1.py"), [0x78, 0x3d, 0xe9, 0x0a]).unwrap();

        let report = QualityChecker::new(dir.path(), QualityConfig::default())
            .run_analysis()
            .unwrap();

        assert_eq!(report.total_files, 3);
        assert_eq!(report.total_issues, 2);
        assert_eq!(report.summary.issues_by_severity.get(&Severity::Error), Some(&2));
        assert_eq!(report.summary.issues_by_type.get(&IssueType::SyntaxError), Some(&1));
        assert_eq!(report.summary.issues_by_type.get(&IssueType::FileReadError), Some(&1));
        assert!(report.summary.quality_score < 100.0);
    }

    #[test]
    fn test_missing_project() {
        let checker = QualityChecker::new("/no/such/project", QualityConfig::default());
        assert!(matches!(checker.run_analysis(), Err(OpsError::NotFound(_))));
    }
}
