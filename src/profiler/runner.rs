//! cProfile driver

use super::memory::{MemorySampler, MemoryStats};
use crate::error::{OpsError, Result};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Interval between memory samples of the profiled process
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

/// Default number of statistics lines printed
pub const DEFAULT_STATS_LIMIT: usize = 20;

/// Imports the target as a module and profiles one function in it.
/// argv: target path, function name.
const FUNCTION_DRIVER: &str = r#"
import cProfile, importlib.util, pathlib, pstats, sys
path, name = sys.argv[1], sys.argv[2]
spec = importlib.util.spec_from_file_location(pathlib.Path(path).stem, path)
if spec is None or spec.loader is None:
    sys.stderr.write("Could not load module from '%s'\n" % path)
    sys.exit(2)
module = importlib.util.module_from_spec(spec)
spec.loader.exec_module(module)
func = getattr(module, name, None)
if func is None:
    sys.stderr.write("Function '%s' not found in module\n" % name)
    sys.exit(2)
profiler = cProfile.Profile()
profiler.enable()
result = func()
profiler.disable()
print("Function '%s' returned: %r" % (name, result))
sys.stdout.flush()
pstats.Stats(profiler, stream=sys.stdout).sort_stats("cumulative").print_stats()
"#;

/// What gets profiled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "name")]
pub enum ProfileMode {
    /// Run the whole file as `__main__`
    Module,
    /// Import the file and call one function without arguments
    Function(String),
}

/// Result of one profiling run
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRun {
    pub target: PathBuf,
    pub mode: ProfileMode,
    pub started_at: DateTime<Local>,
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
    pub memory: MemoryStats,
    /// Everything the target printed before the statistics
    pub program_output: String,
    /// Everything the target wrote to stderr
    pub program_errors: String,
    /// Statistics block, sorted by cumulative time
    pub stats: String,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// Profiles a Python file with the standard library profiler
#[derive(Debug, Clone)]
pub struct Profiler {
    target: PathBuf,
    python: PathBuf,
    mode: ProfileMode,
}

impl Profiler {
    pub fn new(target: impl Into<PathBuf>, python: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            python: python.into(),
            mode: ProfileMode::Module,
        }
    }

    pub fn with_function(mut self, function: Option<String>) -> Self {
        self.mode = match function {
            Some(name) => ProfileMode::Function(name),
            None => ProfileMode::Module,
        };
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn mode(&self) -> &ProfileMode {
        &self.mode
    }

    /// Target must exist and be a `.py` file
    pub fn validate(&self) -> Result<()> {
        if !self.target.exists() {
            return Err(OpsError::NotFound(self.target.clone()));
        }
        if self.target.extension().and_then(|e| e.to_str()) != Some("py") {
            return Err(OpsError::invalid_target(&self.target, "not a Python file"));
        }
        Ok(())
    }

    /// The interpreter invocation for the current mode
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.python);
        match &self.mode {
            ProfileMode::Module => {
                command.args(["-m", "cProfile", "-s", "cumulative"]).arg(&self.target);
            }
            ProfileMode::Function(name) => {
                command.arg("-c").arg(FUNCTION_DRIVER).arg(&self.target).arg(name);
            }
        }
        command
    }

    /// Run the target to completion, sampling its memory meanwhile
    pub fn run(&self) -> Result<ProfileRun> {
        self.validate()?;

        let label = format!("{} profile {}", self.python.display(), self.target.display());
        let started_at = Local::now();
        let start = Instant::now();

        let mut child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                tracing::debug!("Cannot start {}: {}", self.python.display(), e);
                OpsError::ToolNotFound(self.python.display().to_string())
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let mut sampler = MemorySampler::new(child.id());
        let status = wait_sampling(&mut child, &mut sampler, &label)?;
        let execution_time = start.elapsed();

        let stdout = join_output(stdout);
        let stderr = join_output(stderr);

        if !status.success() {
            return Err(OpsError::command(label, last_lines(&stderr, 5)));
        }

        let (program_output, stats) = split_stats(&stdout);
        if stats.is_empty() {
            return Err(OpsError::command(label, "No profiling data available"));
        }

        if !stderr.trim().is_empty() {
            tracing::warn!("{} wrote to stderr", self.target.display());
        }

        tracing::info!(
            "Profiled {} in {:.3}s ({} memory samples)",
            self.target.display(),
            execution_time.as_secs_f64(),
            sampler.stats().samples
        );

        Ok(ProfileRun {
            target: self.target.clone(),
            mode: self.mode.clone(),
            started_at,
            execution_time,
            memory: sampler.stats(),
            program_output: program_output.to_string(),
            program_errors: stderr,
            stats: stats.to_string(),
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn wait_sampling(
    child: &mut Child,
    sampler: &mut MemorySampler,
    label: &str,
) -> Result<std::process::ExitStatus> {
    loop {
        sampler.sample();
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => std::thread::sleep(SAMPLE_INTERVAL),
            Err(e) => return Err(OpsError::command(label, e.to_string())),
        }
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].join("\n")
}

fn stats_start() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*\d+ function calls").expect("stats pattern is valid")
    })
}

/// Split the child's stdout into the program's own output and the
/// statistics block that follows it
pub fn split_stats(stdout: &str) -> (&str, &str) {
    match stats_start().find(stdout) {
        Some(m) => stdout.split_at(m.start()),
        None => (stdout, ""),
    }
}
