//! External command execution

use crate::error::{OpsError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Turn a non-zero exit into an error carrying stderr (or stdout)
    pub fn into_result(self, command: &str) -> Result<CommandOutput> {
        if self.success {
            return Ok(self);
        }
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        Err(OpsError::command(command, detail))
    }
}

/// Runs programs and shell commands on behalf of the setup steps
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in `cwd`
    fn run(&self, program: &Path, args: &[&str], cwd: &Path) -> Result<CommandOutput>;

    /// Run a command line through the platform shell in `cwd`
    fn run_shell(&self, command_line: &str, cwd: &Path) -> Result<CommandOutput>;
}

/// Runs real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn execute(mut command: Command, label: &str) -> Result<CommandOutput> {
        tracing::debug!("Running: {}", label);
        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| OpsError::command(label, e.to_string()))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        let label = format!("{} {}", program.display(), args.join(" "));
        let mut command = Command::new(program);
        command.args(args).current_dir(cwd);
        Self::execute(command, &label)
    }

    fn run_shell(&self, command_line: &str, cwd: &Path) -> Result<CommandOutput> {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", command_line]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command_line]);
            c
        };
        command.current_dir(cwd);
        Self::execute(command, command_line)
    }
}

/// Interpreter to run: `explicit` if given, else `python3` or `python`
/// from PATH
pub fn find_python(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(|_| OpsError::ToolNotFound("python3".to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every invocation and answers from a rule list
    #[derive(Default)]
    pub struct RecordingRunner {
        pub calls: Mutex<Vec<String>>,
        /// (substring, output): first rule whose substring occurs in the
        /// command line wins; unmatched commands succeed with empty output
        pub rules: Vec<(String, CommandOutput)>,
        /// Create this directory when a `-m venv <dir>` call is seen
        pub create_venv_dirs: bool,
    }

    impl RecordingRunner {
        pub fn with_rule(mut self, needle: &str, success: bool, stdout: &str) -> Self {
            self.rules.push((
                needle.to_string(),
                CommandOutput {
                    success,
                    stdout: stdout.to_string(),
                    stderr: if success { String::new() } else { format!("{} failed", needle) },
                },
            ));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn answer(&self, line: String) -> Result<CommandOutput> {
            let output = self
                .rules
                .iter()
                .find(|(needle, _)| line.contains(needle.as_str()))
                .map(|(_, out)| out.clone())
                .unwrap_or(CommandOutput {
                    success: true,
                    ..Default::default()
                });
            self.calls.lock().unwrap().push(line);
            Ok(output)
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &Path, args: &[&str], _cwd: &Path) -> Result<CommandOutput> {
            if self.create_venv_dirs {
                if let Some(pos) = args.iter().position(|a| *a == "venv") {
                    if let Some(dir) = args.get(pos + 1) {
                        std::fs::create_dir_all(dir).unwrap();
                    }
                }
            }
            self.answer(format!("{} {}", program.display(), args.join(" ")))
        }

        fn run_shell(&self, command_line: &str, _cwd: &Path) -> Result<CommandOutput> {
            self.answer(format!("sh: {}", command_line))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result_prefers_stderr() {
        let out = CommandOutput {
            success: false,
            stdout: "out".into(),
            stderr: "boom\n".into(),
        };
        let err = out.into_result("pip install x").unwrap_err();
        assert_eq!(err.to_string(), "Command 'pip install x' failed: boom");

        let ok = CommandOutput {
            success: true,
            ..Default::default()
        };
        assert!(ok.into_result("true").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_shell() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = SystemRunner.run_shell("echo hi && pwd", dir.path()).unwrap();
        assert!(out.success);
        assert!(out.stdout.starts_with("hi"));

        let failed = SystemRunner.run_shell("exit 3", dir.path()).unwrap();
        assert!(!failed.success);
    }

    #[test]
    fn test_find_python_explicit() {
        let explicit = Path::new("/opt/py/bin/python3.12");
        assert_eq!(find_python(Some(explicit)).unwrap(), explicit);
    }

    #[test]
    fn test_missing_program_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = SystemRunner.run(Path::new("no-such-binary-opskit"), &[], dir.path());
        assert!(matches!(result, Err(OpsError::CommandFailed { .. })));
    }
}
