//! Quality checker configuration

use super::models::Severity;
use crate::config::load_json;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Penalty weight per issue severity, used by the quality score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub error: f64,
    pub warning: f64,
    pub info: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            error: 3.0,
            warning: 2.0,
            info: 1.0,
        }
    }
}

impl SeverityWeights {
    /// Weight for one severity
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Error => self.error,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }
}

/// Settings for a quality run; missing JSON keys take their defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Longest allowed physical line, in characters
    pub max_line_length: usize,
    /// Highest allowed cyclomatic complexity per function
    pub max_function_complexity: u32,
    /// Highest allowed sum of method complexities per class
    pub max_class_complexity: u32,
    /// Directory and file patterns excluded from analysis
    pub ignore_patterns: Vec<String>,
    /// Score penalty per issue severity
    pub severity_weights: SeverityWeights,
    /// Also run `flake8` on each file when it is installed
    pub run_external_tools: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_line_length: 79,
            max_function_complexity: 10,
            max_class_complexity: 20,
            ignore_patterns: [
                "__pycache__",
                ".git",
                ".venv",
                "venv",
                "node_modules",
                "*.pyc",
                "*.pyo",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            severity_weights: SeverityWeights::default(),
            run_external_tools: false,
        }
    }
}

impl QualityConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_json(path)?;
        tracing::debug!("Loaded quality config from {}", path.display());
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn with_overrides(
        mut self,
        max_line_length: Option<usize>,
        max_function_complexity: Option<u32>,
        external: bool,
    ) -> Self {
        if let Some(len) = max_line_length {
            self.max_line_length = len;
        }
        if let Some(complexity) = max_function_complexity {
            self.max_function_complexity = complexity;
        }
        self.run_external_tools |= external;
        self
    }
}
