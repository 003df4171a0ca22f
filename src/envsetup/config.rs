//! Setup configuration file

use crate::config::{load_json, SetupArgs};
use crate::error::{IoResultExt, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File written by `--create-template`
pub const TEMPLATE_FILE: &str = "setup-config.json";

fn default_project_name() -> String {
    "MyProject".to_string()
}

fn default_python_version() -> String {
    "3.8".to_string()
}

fn default_virtual_env_name() -> String {
    "venv".to_string()
}

fn default_requirements_file() -> String {
    "requirements.txt".to_string()
}

/// Environment setup configuration
///
/// Keys are camelCase in JSON. Missing keys in a loaded file fall back to
/// empty lists, while [`SetupConfig::default`] is the full starter setup
/// used when no file is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    /// Minimum interpreter version, dotted
    #[serde(default = "default_python_version")]
    pub python_version: String,
    /// Directory name of the virtual environment inside the project
    #[serde(default = "default_virtual_env_name")]
    pub virtual_env_name: String,
    #[serde(default = "default_requirements_file")]
    pub requirements_file: String,
    #[serde(default)]
    pub dev_requirements_file: Option<String>,
    #[serde(default)]
    pub git_repo: Option<String>,
    #[serde(default)]
    pub additional_tools: Vec<String>,
    /// Shell commands run after everything else
    #[serde(default)]
    pub post_setup_commands: Vec<String>,
    /// Written to `.env` as `KEY=VALUE` lines
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            python_version: default_python_version(),
            virtual_env_name: default_virtual_env_name(),
            requirements_file: default_requirements_file(),
            dev_requirements_file: Some("requirements-dev.txt".to_string()),
            git_repo: None,
            additional_tools: ["pre-commit", "black", "flake8", "pytest"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            post_setup_commands: Vec::new(),
            environment_variables: [("PYTHONPATH", "."), ("DEBUG", "True")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl SetupConfig {
    /// Load a config file; an unreadable or invalid file falls back to the
    /// defaults with a warning
    pub fn load_or_default(path: &Path) -> Self {
        match load_json::<Self>(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Error loading config: {}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Resolve the configuration for a `setup` invocation
    pub fn from_args(args: &SetupArgs) -> Self {
        let config = match &args.config {
            Some(path) => Self::load_or_default(path),
            None => Self::default(),
        };
        config.with_overrides(args)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, args: &SetupArgs) -> Self {
        if let Some(name) = &args.project_name {
            self.project_name = name.clone();
        }
        if let Some(version) = &args.python_version {
            self.python_version = version.clone();
        }
        if let Some(venv) = &args.virtual_env_name {
            self.virtual_env_name = venv.clone();
        }
        if let Some(requirements) = &args.requirements_file {
            self.requirements_file = requirements.clone();
        }
        if let Some(tools) = &args.tools {
            self.additional_tools = tools.clone();
        }
        self
    }

    /// Example configuration written by `--create-template`
    pub fn template() -> Self {
        let mut config = Self::default();
        config.git_repo = Some("https://github.com/username/repo.git".to_string());
        config.post_setup_commands = vec![
            "echo 'Setup complete!'".to_string(),
            "python -c 'print(\"Hello, World!\")'".to_string(),
        ];
        config
            .environment_variables
            .insert("DATABASE_URL".to_string(), "sqlite:///dev.db".to_string());
        config
    }

    /// Write the template into `dir`, returning its path
    pub fn write_template(dir: &Path) -> Result<PathBuf> {
        let path = dir.join(TEMPLATE_FILE);
        let json = serde_json::to_string_pretty(&Self::template())?;
        std::fs::write(&path, json).with_path(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SetupArgs,
    }

    fn args(argv: &[&str]) -> SetupArgs {
        let mut full = vec!["setup"];
        full.extend_from_slice(argv);
        Harness::parse_from(full).args
    }

    #[test]
    fn test_defaults() {
        let config = SetupConfig::default();
        assert_eq!(config.project_name, "MyProject");
        assert_eq!(config.python_version, "3.8");
        assert_eq!(config.virtual_env_name, "venv");
        assert_eq!(config.additional_tools.len(), 4);
        assert_eq!(config.environment_variables["DEBUG"], "True");
    }

    #[test]
    fn test_file_with_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"projectName": "Demo", "additionalTools": ["black"]}"#).unwrap();

        let config = SetupConfig::load_or_default(&path);
        assert_eq!(config.project_name, "Demo");
        assert_eq!(config.python_version, "3.8");
        assert_eq!(config.additional_tools, vec!["black"]);
        assert!(config.environment_variables.is_empty());
        assert!(config.dev_requirements_file.is_none());
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert_eq!(SetupConfig::load_or_default(&path), SetupConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let config = SetupConfig::from_args(&args(&[
            "--project-name",
            "MyApp",
            "--python-version",
            "3.9",
            "--tools",
            "pytest",
            "httpie",
        ]));
        assert_eq!(config.project_name, "MyApp");
        assert_eq!(config.python_version, "3.9");
        assert_eq!(config.additional_tools, vec!["pytest", "httpie"]);
        assert_eq!(config.virtual_env_name, "venv");
    }

    #[test]
    fn test_template_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = SetupConfig::write_template(dir.path()).unwrap();
        assert!(path.ends_with(TEMPLATE_FILE));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["gitRepo"], "https://github.com/username/repo.git");
        assert_eq!(raw["environmentVariables"]["DATABASE_URL"], "sqlite:///dev.db");
        assert_eq!(raw["postSetupCommands"].as_array().unwrap().len(), 2);
    }
}
