//! Environment setup steps
//!
//! Runs the setup as a fixed sequence of steps. A step either completes
//! (appending its name to `steps_completed`), completes with warnings, or
//! fails and stops the run.

use super::config::SetupConfig;
use super::runner::CommandRunner;
use super::version::{extract_version, version_meets};
use crate::error::{IoResultExt, OpsError, Result};
use crate::progress::StepReporter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// What to do when the virtual environment directory already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenvPolicy {
    /// Prompt on an attended terminal, keep otherwise
    Ask,
    /// Delete and create again
    Recreate,
    /// Reuse as-is
    Keep,
}

impl VenvPolicy {
    /// Policy from the `--yes` / `--keep` flags
    pub fn from_flags(yes: bool, keep: bool) -> Self {
        match (yes, keep) {
            (true, _) => VenvPolicy::Recreate,
            (_, true) => VenvPolicy::Keep,
            _ => VenvPolicy::Ask,
        }
    }
}

/// Outcome of a setup run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupResult {
    pub success: bool,
    pub message: String,
    pub steps_completed: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Seconds
    pub setup_time: f64,
}

/// Python development environment setup
pub struct EnvironmentSetup {
    config: SetupConfig,
    project_dir: PathBuf,
    venv_path: PathBuf,
    python: PathBuf,
    policy: VenvPolicy,
    runner: Arc<dyn CommandRunner>,
    reporter: StepReporter,
    interpreter_version: Option<String>,
    result: SetupResult,
}

impl EnvironmentSetup {
    pub fn new(
        config: SetupConfig,
        project_dir: impl Into<PathBuf>,
        python: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let project_dir = project_dir.into();
        let venv_path = project_dir.join(&config.virtual_env_name);
        Self {
            config,
            project_dir,
            venv_path,
            python: python.into(),
            policy: VenvPolicy::Ask,
            runner,
            reporter: StepReporter::disabled(),
            interpreter_version: None,
            result: SetupResult::default(),
        }
    }

    pub fn with_policy(mut self, policy: VenvPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reporter(mut self, reporter: StepReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn venv_path(&self) -> &Path {
        &self.venv_path
    }

    /// Run every step and return the result
    pub fn run(mut self) -> SetupResult {
        let start = Instant::now();

        println!("Setting up development environment for: {}", self.config.project_name);
        println!("Project path: {}", self.project_dir.display());
        println!("Required Python version: {}", self.config.python_version);

        match self.run_steps() {
            Ok(()) => {
                self.result.success = true;
                self.result.message = "Environment setup completed successfully!".to_string();
            }
            Err(e) => {
                tracing::debug!("Setup stopped: {}", e);
                self.result.errors.push(e.to_string());
                self.result.message = "Environment setup failed!".to_string();
            }
        }

        self.reporter.clear();
        self.result.setup_time = start.elapsed().as_secs_f64();
        self.print_summary();
        self.result
    }

    fn run_steps(&mut self) -> Result<()> {
        self.check_system_requirements()?;
        self.create_virtual_environment()?;
        self.install_dependencies()?;
        self.setup_additional_tools();
        self.setup_environment_variables()?;
        self.run_post_setup_commands();
        Ok(())
    }

    fn complete(&mut self, step: &str) {
        self.result.steps_completed.push(step.to_string());
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.result.warnings.push(message);
    }

    fn venv_bin(&self, name: &str) -> PathBuf {
        if cfg!(windows) {
            self.venv_path.join("Scripts").join(format!("{}.exe", name))
        } else {
            self.venv_path.join("bin").join(name)
        }
    }

    fn check_system_requirements(&mut self) -> Result<()> {
        self.reporter.start_step("Checking system requirements");

        let output = self
            .runner
            .run(&self.python, &["--version"], &self.project_dir)
            .map_err(|_| OpsError::ToolNotFound(self.python.display().to_string()))?;
        let combined = format!("{}\n{}", output.stdout, output.stderr);
        let version = extract_version(&combined).ok_or_else(|| {
            OpsError::command(
                format!("{} --version", self.python.display()),
                "could not determine interpreter version",
            )
        })?;

        if !version_meets(&version, &self.config.python_version) {
            self.reporter.finish_error("System requirements not met");
            return Err(OpsError::VersionRequirement {
                tool: "Python".to_string(),
                found: version,
                required: self.config.python_version.clone(),
            });
        }

        self.interpreter_version = Some(version);
        self.complete("System requirements check");
        self.reporter.finish_success("System requirements met");
        Ok(())
    }

    fn create_virtual_environment(&mut self) -> Result<()> {
        self.reporter
            .start_step(&format!("Creating virtual environment: {}", self.config.virtual_env_name));

        if self.venv_path.exists() {
            if !self.should_recreate()? {
                self.warn("Using existing virtual environment".to_string());
                self.complete("Virtual environment creation");
                self.reporter.finish_warning(&format!(
                    "Virtual environment already exists at {}",
                    self.venv_path.display()
                ));
                return Ok(());
            }
            std::fs::remove_dir_all(&self.venv_path).with_path(&self.venv_path)?;
        }

        let venv = self.venv_path.display().to_string();
        self.runner
            .run(&self.python, &["-m", "venv", &venv], &self.project_dir)
            .and_then(|out| out.into_result("python -m venv"))
            .map_err(|e| {
                self.reporter.finish_error("Virtual environment creation failed");
                e.with_context("Failed to create virtual environment")
            })?;

        self.complete("Virtual environment creation");
        self.reporter.finish_success("Virtual environment created successfully");
        Ok(())
    }

    fn should_recreate(&self) -> Result<bool> {
        match self.policy {
            VenvPolicy::Recreate => Ok(true),
            VenvPolicy::Keep => Ok(false),
            VenvPolicy::Ask if console::user_attended() => {
                self.reporter.clear();
                let answer = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Virtual environment already exists at {}. Recreate it?",
                        self.venv_path.display()
                    ))
                    .default(false)
                    .interact()?;
                Ok(answer)
            }
            VenvPolicy::Ask => Ok(false),
        }
    }

    fn pip(&self, args: &[&str]) -> Result<()> {
        let pip = self.venv_bin("pip");
        let label = format!("pip {}", args.join(" "));
        self.runner
            .run(&pip, args, &self.project_dir)
            .and_then(|out| out.into_result(&label))
            .map(|_| ())
    }

    fn install_dependencies(&mut self) -> Result<()> {
        self.reporter.start_step("Installing dependencies");

        if let Err(e) = self.pip(&["install", "--upgrade", "pip"]) {
            self.warn(format!("Failed to upgrade pip: {}", e));
        }

        let requirements = self.project_dir.join(&self.config.requirements_file);
        if !self.config.requirements_file.is_empty() && requirements.exists() {
            let path = requirements.display().to_string();
            if let Err(e) = self.pip(&["install", "-r", &path]) {
                self.reporter.finish_error("Dependency installation failed");
                return Err(e.with_context("Failed to install dependencies"));
            }
            self.complete("Dependencies installation");
            self.reporter.println("Dependencies installed successfully");
        }

        if let Some(dev) = self.config.dev_requirements_file.clone() {
            let dev_path = self.project_dir.join(&dev);
            if dev_path.exists() {
                let path = dev_path.display().to_string();
                match self.pip(&["install", "-r", &path]) {
                    Ok(()) => {
                        self.complete("Development dependencies installation");
                        self.reporter.println("Development dependencies installed successfully");
                    }
                    Err(e) => self.warn(format!("Failed to install dev dependencies: {}", e)),
                }
            }
        }

        self.reporter.finish_success("Dependency step finished");
        Ok(())
    }

    fn setup_additional_tools(&mut self) {
        if self.config.additional_tools.is_empty() {
            return;
        }
        let tools = self.config.additional_tools.clone();
        self.reporter
            .start_step(&format!("Setting up additional tools: {}", tools.join(", ")));

        for tool in &tools {
            self.reporter.set_status(&format!("Installing {}", tool));
            match self.install_tool(tool) {
                Ok(note) => {
                    tracing::info!("{}", note);
                    self.reporter.println(&format!("  {}", note));
                }
                Err(e) => {
                    tracing::debug!("{} failed: {}", tool, e);
                    self.warn(format!("Failed to install tool: {}", tool));
                }
            }
        }

        self.complete("Additional tools setup");
        self.reporter.finish_success("Additional tools processed");
    }

    /// Install one tool, returning a note for the console
    fn install_tool(&self, tool: &str) -> Result<String> {
        match tool {
            "pre-commit" => {
                self.pip(&["install", "pre-commit"])?;
                if self.project_dir.join(".pre-commit-config.yaml").exists() {
                    self.runner
                        .run(&self.venv_bin("pre-commit"), &["install"], &self.project_dir)?
                        .into_result("pre-commit install")?;
                }
                Ok("pre-commit installed and configured".to_string())
            }
            "black" => {
                self.pip(&["install", "black", "isort"])?;
                Ok("Code formatters (black, isort) installed".to_string())
            }
            "flake8" => {
                self.pip(&["install", "flake8", "pylint"])?;
                Ok("Linters (flake8, pylint) installed".to_string())
            }
            "pytest" => {
                self.pip(&["install", "pytest", "pytest-cov"])?;
                Ok("Testing framework (pytest) installed".to_string())
            }
            "docker" | "nodejs" => manual_install_hint(tool, std::env::consts::OS)
                .map(str::to_string)
                .ok_or_else(|| OpsError::config(format!("No install guidance for {} on this platform", tool))),
            other => {
                self.pip(&["install", other])?;
                Ok(format!("{} installed successfully", other))
            }
        }
    }

    fn setup_environment_variables(&mut self) -> Result<()> {
        if self.config.environment_variables.is_empty() {
            return Ok(());
        }
        self.reporter.start_step("Setting up environment variables");

        let env_file = self.project_dir.join(".env");
        let content = render_env_file(&self.config);
        std::fs::write(&env_file, content)
            .with_path(&env_file)
            .map_err(|e| {
                self.reporter.finish_error("Environment variables not written");
                e.with_context("Failed to setup environment variables")
            })?;

        self.complete("Environment variables setup");
        self.reporter.finish_success("Environment variables configured");
        Ok(())
    }

    fn run_post_setup_commands(&mut self) {
        if self.config.post_setup_commands.is_empty() {
            return;
        }
        self.reporter.start_step("Running post-setup commands");

        for command in self.config.post_setup_commands.clone() {
            self.reporter.set_status(&format!("Running: {}", command));
            let outcome = self
                .runner
                .run_shell(&command, &self.project_dir)
                .and_then(|out| out.into_result(&command));
            match outcome {
                Ok(_) => self.reporter.println(&format!("  Command completed: {}", command)),
                Err(e) => self.warn(format!("Post-setup command failed: {} - {}", command, e)),
            }
        }

        self.complete("Post-setup commands");
        self.reporter.finish_success("Post-setup commands finished");
    }

    fn print_summary(&self) {
        let rule = "=".repeat(60);
        let result = &self.result;

        println!("\n{}\nSETUP SUMMARY\n{}", rule, rule);
        println!("Project: {}", self.config.project_name);
        println!("Virtual Environment: {}", self.venv_path.display());
        println!(
            "Python Version: {}",
            self.interpreter_version.as_deref().unwrap_or("unknown")
        );
        println!("Setup Time: {:.2} seconds", result.setup_time);

        println!("\nSteps Completed ({}):", result.steps_completed.len());
        for step in &result.steps_completed {
            println!("  {} {}", console::style("✓").green(), step);
        }

        if !result.warnings.is_empty() {
            println!("\nWarnings ({}):", result.warnings.len());
            for warning in &result.warnings {
                println!("  {} {}", console::style("!").yellow(), warning);
            }
        }

        if !result.errors.is_empty() {
            println!("\nErrors ({}):", result.errors.len());
            for error in &result.errors {
                println!("  {} {}", console::style("✗").red(), error);
            }
        }

        println!("\n{}\nNEXT STEPS\n{}", rule, rule);
        println!("1. Activate the virtual environment:");
        if cfg!(windows) {
            println!("   {}\\Scripts\\activate", self.venv_path.display());
        } else {
            println!("   source {}/bin/activate", self.venv_path.display());
        }
        println!("2. Verify installation:");
        println!("   python --version");
        println!("   pip list");
        let mut next = 3;
        if let Some(repo) = &self.config.git_repo {
            println!("{}. Clone the repository:", next);
            println!("   git clone {}", repo);
            next += 1;
        }
        println!("{}. Start developing!", next);
    }
}

/// `KEY=VALUE` lines for the `.env` file
pub fn render_env_file(config: &SetupConfig) -> String {
    config
        .environment_variables
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Manual install guidance for tools not installable through pip
pub fn manual_install_hint(tool: &str, os: &str) -> Option<&'static str> {
    match (tool, os) {
        ("docker", "macos") => Some("Please install Docker Desktop for macOS manually"),
        ("docker", "windows") => Some("Please install Docker Desktop for Windows manually"),
        ("docker", "linux") => Some("Please install Docker for Linux manually"),
        ("nodejs", "macos") => Some("Please install Node.js via Homebrew: brew install node"),
        ("nodejs", "windows") => Some("Please install Node.js from https://nodejs.org/"),
        ("nodejs", "linux") => Some("Please install Node.js via package manager"),
        _ => None,
    }
}
