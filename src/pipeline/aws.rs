//! AWS CodePipeline through the `aws` CLI

use super::backend::{aws_stages, parse_timestamp, PipelineBackend, RunState};
use super::models::{CloudPlatform, PipelineConfig, PipelineStatus};
use crate::envsetup::{CommandRunner, SystemRunner};
use crate::error::{OpsError, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Service role assumed by created pipelines
pub const ROLE_ARN_ENV: &str = "AWS_PIPELINE_ROLE_ARN";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePipelineOutput {
    pipeline: CreatedPipeline,
}

#[derive(Debug, Deserialize)]
struct CreatedPipeline {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartExecutionOutput {
    pipeline_execution_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListExecutionsOutput {
    #[serde(default)]
    pipeline_execution_summaries: Vec<ExecutionSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionSummary {
    status: String,
    start_time: Option<Value>,
}

pub struct AwsCliBackend {
    program: PathBuf,
    region: String,
    role_arn: Option<String>,
    runner: Arc<dyn CommandRunner>,
}

impl AwsCliBackend {
    pub fn new(
        program: impl Into<PathBuf>,
        region: impl Into<String>,
        role_arn: Option<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            region: region.into(),
            role_arn,
            runner,
        }
    }

    /// Locate `aws` on PATH and read the role ARN from the environment
    pub fn from_env(config: &PipelineConfig) -> Result<Self> {
        let program = which::which("aws").map_err(|_| OpsError::ToolNotFound("aws".to_string()))?;
        Ok(Self::new(
            program,
            config.region.clone(),
            std::env::var(ROLE_ARN_ENV).ok(),
            Arc::new(SystemRunner),
        ))
    }

    fn call<T: for<'de> Deserialize<'de>>(&self, operation: &str, args: &[&str]) -> Result<T> {
        let mut full = vec!["codepipeline", operation];
        full.extend_from_slice(args);
        full.extend_from_slice(&["--region", self.region.as_str(), "--output", "json"]);

        let label = format!("aws codepipeline {}", operation);
        let cwd = std::env::current_dir()?;
        let output = self
            .runner
            .run(&self.program, &full, &cwd)
            .and_then(|out| out.into_result(&label))
            .map_err(|e| OpsError::provider("aws", e.to_string()))?;

        serde_json::from_str(&output.stdout)
            .map_err(|e| OpsError::provider("aws", format!("{}: unexpected output: {}", label, e)))
    }
}

impl PipelineBackend for AwsCliBackend {
    fn platform(&self) -> CloudPlatform {
        CloudPlatform::Aws
    }

    fn create(&self, config: &PipelineConfig) -> Result<String> {
        let role_arn = self
            .role_arn
            .as_deref()
            .ok_or_else(|| OpsError::config(format!("{} is not set", ROLE_ARN_ENV)))?;

        let input = json!({
            "pipeline": {
                "name": config.name,
                "roleArn": role_arn,
                "stages": aws_stages(config),
                "artifactStore": {
                    "type": "S3",
                    "location": format!("{}-artifacts", config.name)
                }
            }
        });
        let input = input.to_string();

        let out: CreatePipelineOutput = self
            .call("create-pipeline", &["--cli-input-json", &input])
            .map_err(|e| e.with_context("AWS pipeline creation failed"))?;
        Ok(out.pipeline.name)
    }

    /// Executions are polled by pipeline name
    fn start(&self, pipeline_id: &str) -> Result<String> {
        let out: StartExecutionOutput = self
            .call("start-pipeline-execution", &["--name", pipeline_id])
            .map_err(|e| e.with_context("AWS pipeline start failed"))?;
        if let Some(execution) = out.pipeline_execution_id {
            tracing::info!("Started execution {} of {}", execution, pipeline_id);
        }
        Ok(pipeline_id.to_string())
    }

    fn status(&self, id: &str) -> Result<RunState> {
        let out: ListExecutionsOutput = self
            .call(
                "list-pipeline-executions",
                &["--pipeline-name", id, "--max-items", "1"],
            )
            .map_err(|e| e.with_context("AWS pipeline status check failed"))?;

        Ok(match out.pipeline_execution_summaries.first() {
            Some(latest) => RunState {
                status: PipelineStatus::from_aws(&latest.status),
                start_time: parse_timestamp(latest.start_time.as_ref().and_then(Value::as_str)),
            },
            None => RunState {
                status: PipelineStatus::Pending,
                start_time: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envsetup::runner::testing::RecordingRunner;

    fn config() -> PipelineConfig {
        serde_json::from_value(json!({
            "name": "web",
            "platform": "aws",
            "region": "us-east-1",
            "pipelineDefinition": { "source": { "repository": "web-repo" }, "build": {} }
        }))
        .unwrap()
    }

    fn backend(runner: RecordingRunner, role: Option<&str>) -> (AwsCliBackend, Arc<RecordingRunner>) {
        let runner = Arc::new(runner);
        let backend = AwsCliBackend::new("aws", "us-east-1", role.map(String::from), runner.clone());
        (backend, runner)
    }

    #[test]
    fn test_create_sends_stages() {
        let (aws, runner) = backend(
            RecordingRunner::default().with_rule(
                "create-pipeline",
                true,
                r#"{"pipeline": {"name": "web", "version": 1}}"#,
            ),
            Some("arn:aws:iam::1:role/Pipeline"),
        );
        assert_eq!(aws.create(&config()).unwrap(), "web");

        let call = &runner.calls()[0];
        assert!(call.starts_with("aws codepipeline create-pipeline --cli-input-json"));
        assert!(call.contains(r#""RepositoryName":"web-repo""#));
        assert!(call.contains(r#""location":"web-artifacts""#));
        assert!(call.ends_with("--region us-east-1 --output json"));
    }

    #[test]
    fn test_create_requires_role() {
        let (aws, runner) = backend(RecordingRunner::default(), None);
        let err = aws.create(&config()).unwrap_err();
        assert!(err.to_string().contains(ROLE_ARN_ENV));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_status_latest_execution() {
        let (aws, _) = backend(
            RecordingRunner::default().with_rule(
                "list-pipeline-executions",
                true,
                r#"{"pipelineExecutionSummaries": [{"status": "Succeeded", "startTime": "2024-05-01T10:00:00.123000+00:00"}]}"#,
            ),
            None,
        );
        let state = aws.status("web").unwrap();
        assert_eq!(state.status, PipelineStatus::Success);
        assert!(state.start_time.is_some());
    }

    #[test]
    fn test_status_without_executions_is_pending() {
        let (aws, _) = backend(
            RecordingRunner::default().with_rule(
                "list-pipeline-executions",
                true,
                r#"{"pipelineExecutionSummaries": []}"#,
            ),
            None,
        );
        assert_eq!(aws.status("web").unwrap().status, PipelineStatus::Pending);
    }

    #[test]
    fn test_cli_failure_is_provider_error() {
        let (aws, _) = backend(
            RecordingRunner::default().with_rule("start-pipeline-execution", false, ""),
            None,
        );
        let err = aws.start("web").unwrap_err();
        assert!(err.to_string().starts_with("AWS pipeline start failed"));
        assert!(err.is_transient());
    }
}
