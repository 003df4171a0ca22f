//! Google Cloud Build triggers over REST

use super::backend::{gcp_steps, parse_timestamp, PipelineBackend, RunState};
use super::models::{CloudPlatform, PipelineConfig, PipelineStatus};
use crate::error::{OpsError, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};

/// OAuth access token (e.g. from `gcloud auth print-access-token`)
pub const GCP_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

const API_ROOT: &str = "https://cloudbuild.googleapis.com/v1";

pub struct CloudBuildBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl CloudBuildBackend {
    /// `base_url` is the location root, `.../projects/{p}/locations/{region}`
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn from_env(config: &PipelineConfig) -> Result<Self> {
        let project = config
            .project_id
            .as_deref()
            .ok_or_else(|| OpsError::config("GCP pipelines need projectId"))?;
        let token = std::env::var(GCP_TOKEN_ENV)
            .map_err(|_| OpsError::config(format!("{} is not set", GCP_TOKEN_ENV)))?;

        Ok(Self::new(
            format!("{}/projects/{}/locations/{}", API_ROOT, project, config.region),
            token,
        ))
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = request.bearer_auth(&self.token).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OpsError::provider(
                "gcp",
                format!("{} returned {}: {}", what, status, body.trim()),
            ));
        }
        Ok(response.json()?)
    }
}

/// Trigger body for a pipeline config
pub fn trigger_config(config: &PipelineConfig) -> Value {
    json!({
        "name": config.name,
        "description": format!("Pipeline for {}", config.name),
        "triggerTemplate": {
            "projectId": config.project_id,
            "repoName": "default",
            "branchName": "main"
        },
        "build": {
            "steps": gcp_steps(config),
            "timeout": format!("{}s", config.timeout)
        }
    })
}

impl PipelineBackend for CloudBuildBackend {
    fn platform(&self) -> CloudPlatform {
        CloudPlatform::Gcp
    }

    fn create(&self, config: &PipelineConfig) -> Result<String> {
        let url = format!("{}/triggers", self.base_url);
        let response = self
            .send(self.client.post(url).json(&trigger_config(config)), "create trigger")
            .map_err(|e| e.with_context("GCP pipeline creation failed"))?;
        response
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| OpsError::provider("gcp", "create trigger response has no id"))
    }

    /// Runs the trigger and returns the id of the build it started
    fn start(&self, pipeline_id: &str) -> Result<String> {
        let url = format!("{}/triggers/{}:run", self.base_url, pipeline_id);
        let response = self
            .send(
                self.client.post(url).json(&json!({ "branchName": "main" })),
                "run trigger",
            )
            .map_err(|e| e.with_context("GCP pipeline start failed"))?;
        response
            .pointer("/metadata/build/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| OpsError::provider("gcp", "run trigger response has no build id"))
    }

    fn status(&self, id: &str) -> Result<RunState> {
        let url = format!("{}/builds/{}", self.base_url, id);
        let response = self
            .send(self.client.get(url), "get build")
            .map_err(|e| e.with_context("GCP pipeline status check failed"))?;

        let status = response.get("status").and_then(Value::as_str).unwrap_or("");
        Ok(RunState {
            status: PipelineStatus::from_gcp(status),
            start_time: parse_timestamp(response.get("startTime").and_then(Value::as_str)),
        })
    }
}
