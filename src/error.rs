//! Error types for OpsKit
//!
//! Every tool distinguishes fatal conditions (returned as [`OpsError`]) from
//! non-fatal ones, which are collected into warning lists by the tool itself
//! and reported in its summary.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for OpsKit operations
#[derive(Error, Debug)]
pub enum OpsError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File or directory not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Nothing to watch in the log directory
    #[error("No .log files found in {0}")]
    NoLogFiles(PathBuf),

    /// Target has the wrong kind or extension
    #[error("Invalid target '{path}': {reason}")]
    InvalidTarget { path: PathBuf, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Config or report (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A version requirement is not met
    #[error("{tool} version {found} does not meet requirement {required}")]
    VersionRequirement {
        tool: String,
        found: String,
        required: String,
    },

    /// An external command could not be run or exited unsuccessfully
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// An external tool is not installed
    #[error("Required tool not found on PATH: {0}")]
    ToolNotFound(String),

    /// Cloud provider API error
    #[error("{provider} API error: {message}")]
    Provider { provider: String, message: String },

    /// Interactive prompt failed
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Operation cancelled by user
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<OpsError>,
    },
}

impl OpsError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a command failure error
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a provider API error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error is transient (worth polling again)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io { .. } | Self::Provider { .. } | Self::CommandFailed { .. } => true,
            Self::WithContext { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Result type alias for OpsKit operations
pub type Result<T> = std::result::Result<T, OpsError>;

impl From<std::io::Error> for OpsError {
    fn from(err: std::io::Error) -> Self {
        OpsError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for OpsError {
    fn from(err: serde_json::Error) -> Self {
        OpsError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for OpsError {
    fn from(err: serde_yaml::Error) -> Self {
        OpsError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for OpsError {
    fn from(err: reqwest::Error) -> Self {
        let provider = err
            .url()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());
        OpsError::Provider {
            provider,
            message: err.to_string(),
        }
    }
}

impl From<dialoguer::Error> for OpsError {
    fn from(err: dialoguer::Error) -> Self {
        OpsError::Prompt(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| OpsError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = OpsError::io("/test/path", io_err);
        assert!(matches!(&err, OpsError::Io { path, .. } if path == &PathBuf::from("/test/path")));
        assert!(err.is_transient());
    }

    #[test]
    fn test_with_path_extension() {
        let res: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.with_path("/etc/shadow").unwrap_err();
        assert!(err.to_string().contains("/etc/shadow"));
    }

    #[test]
    fn test_transient_errors() {
        assert!(OpsError::command("aws codepipeline", "exit status 255").is_transient());
        assert!(!OpsError::ToolNotFound("aws".into()).is_transient());
        assert!(OpsError::provider("aws", "throttled").is_transient());
        assert!(!OpsError::config("bad").is_transient());

        let wrapped = OpsError::provider("gcp", "503").with_context("status check");
        assert!(wrapped.is_transient());
    }

    #[test]
    fn test_version_requirement_message() {
        let err = OpsError::VersionRequirement {
            tool: "Python".into(),
            found: "3.6.9".into(),
            required: "3.8".into(),
        };
        assert_eq!(
            err.to_string(),
            "Python version 3.6.9 does not meet requirement 3.8"
        );
    }
}
