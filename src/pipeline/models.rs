//! Pipeline configuration, status and result types

use crate::config::load_yaml_or_json;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Supported cloud platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudPlatform {
    Aws,
    Azure,
    Gcp,
}

impl CloudPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudPlatform::Aws => "aws",
            CloudPlatform::Azure => "azure",
            CloudPlatform::Gcp => "gcp",
        }
    }
}

impl fmt::Display for CloudPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-neutral pipeline status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Running => "running",
            PipelineStatus::Success => "success",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Cancelled => "cancelled",
        }
    }

    /// Waiting stops at a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStatus::Success | PipelineStatus::Failed | PipelineStatus::Cancelled
        )
    }

    /// CodePipeline execution status
    pub fn from_aws(status: &str) -> Self {
        match status {
            "InProgress" => PipelineStatus::Running,
            "Succeeded" => PipelineStatus::Success,
            "Failed" => PipelineStatus::Failed,
            "Stopped" => PipelineStatus::Cancelled,
            _ => PipelineStatus::Pending,
        }
    }

    /// Azure DevOps run result
    pub fn from_azure(result: &str) -> Self {
        match result {
            "succeeded" => PipelineStatus::Success,
            "failed" => PipelineStatus::Failed,
            "canceled" => PipelineStatus::Cancelled,
            _ => PipelineStatus::Running,
        }
    }

    /// Cloud Build build status
    pub fn from_gcp(status: &str) -> Self {
        match status {
            "SUCCESS" => PipelineStatus::Success,
            "FAILURE" | "TIMEOUT" => PipelineStatus::Failed,
            "CANCELLED" => PipelineStatus::Cancelled,
            _ => PipelineStatus::Running,
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_timeout() -> u64 {
    3600
}

fn default_retry_count() -> u32 {
    3
}

/// Pipeline configuration file (YAML or JSON, camelCase keys)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub name: String,
    pub platform: CloudPlatform,
    pub region: String,
    /// GCP project, or Azure DevOps organization
    #[serde(default)]
    pub project_id: Option<String>,
    /// Azure DevOps project
    #[serde(default)]
    pub resource_group: Option<String>,
    /// Free-form stage definition (`source`, `build`, `deploy`)
    #[serde(default)]
    pub pipeline_definition: Map<String, Value>,
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Consecutive status-query failures tolerated while waiting
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_yaml_or_json(path)
    }

    /// Definition section, if present
    pub fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.pipeline_definition.get(key).and_then(Value::as_object)
    }
}

fn default_replicas() -> u32 {
    1
}

fn default_rollback() -> bool {
    true
}

/// Service deployment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub service_name: String,
    pub image_tag: String,
    pub environment: String,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub resources: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub health_check: Option<Map<String, Value>>,
    #[serde(default = "default_rollback")]
    pub rollback_enabled: bool,
}

impl DeploymentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_yaml_or_json(path)
    }
}

/// Outcome of a pipeline operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    /// Id used for later status queries
    pub pipeline_id: String,
    pub status: PipelineStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds
    pub duration: Option<f64>,
    pub logs: Vec<String>,
    pub artifacts: Vec<String>,
    pub error_message: Option<String>,
}

impl PipelineResult {
    /// Operation accepted by the provider
    pub fn accepted(pipeline_id: impl Into<String>, status: PipelineStatus) -> Self {
        Self {
            success: true,
            pipeline_id: pipeline_id.into(),
            status,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            logs: Vec::new(),
            artifacts: Vec::new(),
            error_message: None,
        }
    }

    /// Status as reported by the provider; only `success` counts as success
    pub fn observed(
        pipeline_id: impl Into<String>,
        status: PipelineStatus,
        start_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            success: status == PipelineStatus::Success,
            start_time: start_time.unwrap_or_else(Utc::now),
            ..Self::accepted(pipeline_id, status)
        }
    }

    /// Failed operation carrying the error message
    pub fn failed(pipeline_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::accepted(pipeline_id, PipelineStatus::Failed)
        }
    }

    /// Stamp `end_time` and `duration`
    pub fn finish(mut self, end_time: DateTime<Utc>) -> Self {
        let millis = (end_time - self.start_time).num_milliseconds().max(0);
        self.duration = Some(millis as f64 / 1000.0);
        self.end_time = Some(end_time);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_status_maps() {
        assert_eq!(PipelineStatus::from_aws("InProgress"), PipelineStatus::Running);
        assert_eq!(PipelineStatus::from_aws("Stopped"), PipelineStatus::Cancelled);
        assert_eq!(PipelineStatus::from_aws("Superseded"), PipelineStatus::Pending);

        assert_eq!(PipelineStatus::from_azure("succeeded"), PipelineStatus::Success);
        assert_eq!(PipelineStatus::from_azure("canceled"), PipelineStatus::Cancelled);
        assert_eq!(PipelineStatus::from_azure(""), PipelineStatus::Running);

        assert_eq!(PipelineStatus::from_gcp("TIMEOUT"), PipelineStatus::Failed);
        assert_eq!(PipelineStatus::from_gcp("QUEUED"), PipelineStatus::Running);
    }

    #[test]
    fn test_terminal() {
        assert!(PipelineStatus::Cancelled.is_terminal());
        assert!(!PipelineStatus::Pending.is_terminal());
        assert!(!PipelineStatus::Running.is_terminal());
    }

    #[test]
    fn test_load_yaml_config_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.yml");
        std::fs::write(
            &path,
            "name: web\nplatform: gcp\nregion: us-central1\nprojectId: acme\npipelineDefinition:\n  build:\n    type: docker\n",
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.platform, CloudPlatform::Gcp);
        assert_eq!(config.project_id.as_deref(), Some("acme"));
        assert_eq!(config.timeout, 3600);
        assert_eq!(config.retry_count, 3);
        assert!(config.section("build").is_some());
        assert!(config.section("source").is_none());
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"name": "x", "platform": "oracle", "region": "r"}"#).unwrap();
        assert!(PipelineConfig::load(&path).is_err());
    }

    #[test]
    fn test_deployment_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("svc.json");
        std::fs::write(
            &path,
            r#"{"serviceName": "api", "imageTag": "v1.2.0", "environment": "staging"}"#,
        )
        .unwrap();
        let deploy = DeploymentConfig::load(&path).unwrap();
        assert_eq!(deploy.replicas, 1);
        assert!(deploy.rollback_enabled);
        assert!(deploy.health_check.is_none());
    }

    #[test]
    fn test_result_constructors() {
        let observed = PipelineResult::observed("p", PipelineStatus::Failed, None);
        assert!(!observed.success);
        assert!(observed.error_message.is_none());

        let failed = PipelineResult::failed("p", "boom");
        assert_eq!(failed.status, PipelineStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));

        let start = failed.start_time;
        let done = failed.finish(start + chrono::Duration::milliseconds(2500));
        assert_eq!(done.duration, Some(2.5));
    }
}
