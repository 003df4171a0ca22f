//! Azure DevOps pipelines over REST

use super::backend::{parse_timestamp, PipelineBackend, RunState};
use super::models::{CloudPlatform, PipelineConfig, PipelineStatus};
use crate::error::{OpsError, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};

/// Personal access token
pub const AZURE_TOKEN_ENV: &str = "AZURE_DEVOPS_TOKEN";

const PIPELINES_API_VERSION: &str = "6.0-preview.1";
const BUILD_API_VERSION: &str = "6.0";

/// Azure DevOps project: `projectId` names the organization and
/// `resourceGroup` the project
pub struct AzureDevOpsBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl AzureDevOpsBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn from_env(config: &PipelineConfig) -> Result<Self> {
        let organization = config
            .project_id
            .as_deref()
            .ok_or_else(|| OpsError::config("Azure pipelines need projectId (organization)"))?;
        let project = config
            .resource_group
            .as_deref()
            .ok_or_else(|| OpsError::config("Azure pipelines need resourceGroup (project)"))?;
        let token = std::env::var(AZURE_TOKEN_ENV)
            .map_err(|_| OpsError::config(format!("{} is not set", AZURE_TOKEN_ENV)))?;

        Ok(Self::new(
            format!("https://dev.azure.com/{}/{}", organization, project),
            token,
        ))
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = request.basic_auth("", Some(&self.token)).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OpsError::provider(
                "azure",
                format!("{} returned {}: {}", what, status, body.trim()),
            ));
        }
        Ok(response.json()?)
    }
}

fn id_field(value: &Value, what: &str) -> Result<String> {
    match value.get("id") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(OpsError::provider("azure", format!("{} response has no id", what))),
    }
}

impl PipelineBackend for AzureDevOpsBackend {
    fn platform(&self) -> CloudPlatform {
        CloudPlatform::Azure
    }

    fn create(&self, config: &PipelineConfig) -> Result<String> {
        let url = format!(
            "{}/_apis/pipelines?api-version={}",
            self.base_url, PIPELINES_API_VERSION
        );
        let body = json!({
            "name": config.name,
            "configuration": {
                "type": "yaml",
                "path": "/azure-pipelines.yml",
                "repository": {
                    "id": config.project_id,
                    "type": "azureReposGit"
                }
            }
        });

        let response = self
            .send(self.client.post(url).json(&body), "create pipeline")
            .map_err(|e| e.with_context("Azure pipeline creation failed"))?;
        id_field(&response, "create pipeline")
    }

    /// Returns the run id, which doubles as the build id
    fn start(&self, pipeline_id: &str) -> Result<String> {
        let url = format!(
            "{}/_apis/pipelines/{}/runs?api-version={}",
            self.base_url, pipeline_id, PIPELINES_API_VERSION
        );
        let response = self
            .send(self.client.post(url).json(&json!({})), "run pipeline")
            .map_err(|e| e.with_context("Azure pipeline start failed"))?;
        id_field(&response, "run pipeline")
    }

    fn status(&self, id: &str) -> Result<RunState> {
        let url = format!(
            "{}/_apis/build/builds/{}?api-version={}",
            self.base_url, id, BUILD_API_VERSION
        );
        let response = self
            .send(self.client.get(url), "get run")
            .map_err(|e| e.with_context("Azure pipeline status check failed"))?;

        let result = response.get("result").and_then(Value::as_str).unwrap_or("");
        Ok(RunState {
            status: PipelineStatus::from_azure(result),
            start_time: parse_timestamp(response.get("startTime").and_then(Value::as_str)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config() -> PipelineConfig {
        serde_json::from_value(json!({
            "name": "web",
            "platform": "azure",
            "region": "westeurope",
            "projectId": "acme",
            "resourceGroup": "shop"
        }))
        .unwrap()
    }

    #[test]
    fn test_create_and_start() {
        let mut server = mockito::Server::new();
        let create = server
            .mock("POST", Matcher::Regex(r"^/_apis/pipelines($|\?)".into()))
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .match_body(Matcher::PartialJson(json!({
                "name": "web",
                "configuration": { "repository": { "id": "acme" } }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 42, "name": "web"}"#)
            .create();
        let run = server
            .mock("POST", Matcher::Regex(r"^/_apis/pipelines/42/runs".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 1001, "state": "inProgress"}"#)
            .create();

        let azure = AzureDevOpsBackend::new(server.url(), "pat");
        let id = azure.create(&config()).unwrap();
        assert_eq!(id, "42");
        assert_eq!(azure.start(&id).unwrap(), "1001");

        create.assert();
        run.assert();
    }

    #[test]
    fn test_status_maps_result() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", Matcher::Regex(r"^/_apis/build/builds/1001".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "completed", "result": "canceled", "startTime": "2024-05-01T10:00:00Z"}"#)
            .create();

        let azure = AzureDevOpsBackend::new(server.url(), "pat");
        let state = azure.status("1001").unwrap();
        assert_eq!(state.status, PipelineStatus::Cancelled);
        assert!(state.start_time.is_some());
    }

    #[test]
    fn test_in_progress_without_result_is_running() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", Matcher::Regex(r"^/_apis/build/builds/7".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "inProgress"}"#)
            .create();

        let azure = AzureDevOpsBackend::new(server.url(), "pat");
        assert_eq!(azure.status("7").unwrap().status, PipelineStatus::Running);
    }

    #[test]
    fn test_http_error_is_provider_error() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("POST", Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create();

        let azure = AzureDevOpsBackend::new(server.url(), "bad");
        let err = azure.create(&config()).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Azure pipeline creation failed"));
        assert!(message.contains("401"));
    }

    #[test]
    fn test_from_env_requires_organization() {
        let mut cfg = config();
        cfg.project_id = None;
        assert!(matches!(
            AzureDevOpsBackend::from_env(&cfg),
            Err(OpsError::ConfigError(_))
        ));
    }
}
