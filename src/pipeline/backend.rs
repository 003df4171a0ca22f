//! Provider backend trait and provider-neutral definition helpers

use super::aws::AwsCliBackend;
use super::azure::AzureDevOpsBackend;
use super::gcp::CloudBuildBackend;
use super::models::{CloudPlatform, DeploymentConfig, PipelineConfig, PipelineStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// Status reported for one pipeline or run
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub status: PipelineStatus,
    pub start_time: Option<DateTime<Utc>>,
}

/// One cloud provider's pipeline API
pub trait PipelineBackend: Send + Sync {
    fn platform(&self) -> CloudPlatform;

    /// Create the pipeline, returning its id
    fn create(&self, config: &PipelineConfig) -> Result<String>;

    /// Start an execution, returning the id to poll for its status
    fn start(&self, pipeline_id: &str) -> Result<String>;

    fn status(&self, id: &str) -> Result<RunState>;
}

/// Backend for the configured platform
pub fn backend_for(config: &PipelineConfig) -> Result<Box<dyn PipelineBackend>> {
    Ok(match config.platform {
        CloudPlatform::Aws => Box::new(AwsCliBackend::from_env(config)?),
        CloudPlatform::Azure => Box::new(AzureDevOpsBackend::from_env(config)?),
        CloudPlatform::Gcp => Box::new(CloudBuildBackend::from_env(config)?),
    })
}

fn section_str<'a>(section: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    section.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// CodePipeline stages: `source` becomes a CodeCommit source stage and
/// `build` a CodeBuild stage
pub fn aws_stages(config: &PipelineConfig) -> Vec<Value> {
    let mut stages = Vec::new();

    if let Some(source) = config.section("source") {
        stages.push(json!({
            "name": "Source",
            "actions": [{
                "name": "Source",
                "actionTypeId": {
                    "category": "Source",
                    "owner": "AWS",
                    "provider": "CodeCommit",
                    "version": "1"
                },
                "configuration": {
                    "RepositoryName": section_str(source, "repository", "my-repo"),
                    "BranchName": "main"
                }
            }]
        }));
    }

    if let Some(build) = config.section("build") {
        stages.push(json!({
            "name": "Build",
            "actions": [{
                "name": "Build",
                "actionTypeId": {
                    "category": "Build",
                    "owner": "AWS",
                    "provider": "CodeBuild",
                    "version": "1"
                },
                "configuration": {
                    "ProjectName": section_str(build, "projectName", "my-build")
                }
            }]
        }));
    }

    stages
}

/// Cloud Build steps: `build` becomes docker build + push
pub fn gcp_steps(config: &PipelineConfig) -> Vec<Value> {
    if config.section("build").is_none() {
        return Vec::new();
    }
    vec![
        json!({
            "name": "gcr.io/cloud-builders/docker",
            "args": ["build", "-t", "gcr.io/$PROJECT_ID/my-app", "."]
        }),
        json!({
            "name": "gcr.io/cloud-builders/docker",
            "args": ["push", "gcr.io/$PROJECT_ID/my-app"]
        }),
    ]
}

/// Pipeline derived for deploying one service, named `<service>-deploy`
pub fn deployment_pipeline(base: &PipelineConfig, deploy: &DeploymentConfig) -> PipelineConfig {
    let service = &deploy.service_name;
    let definition = match base.platform {
        CloudPlatform::Aws => json!({
            "source": { "type": "S3", "location": format!("{}-source", service) },
            "build": { "type": "CodeBuild", "projectName": format!("{}-build", service) },
            "deploy": {
                "type": "ECS",
                "clusterName": format!("{}-cluster", service),
                "serviceName": service,
                "imageTag": deploy.image_tag
            }
        }),
        CloudPlatform::Azure => json!({
            "source": { "type": "AzureRepos", "repository": service },
            "build": { "type": "AzurePipelines", "buildDefinition": format!("{}-build", service) },
            "deploy": {
                "type": "AKS",
                "clusterName": format!("{}-cluster", service),
                "namespace": deploy.environment,
                "imageTag": deploy.image_tag
            }
        }),
        CloudPlatform::Gcp => json!({
            "source": { "type": "CloudSource", "repository": service },
            "build": { "type": "CloudBuild", "buildConfig": format!("{}-build", service) },
            "deploy": {
                "type": "CloudRun",
                "serviceName": service,
                "imageTag": deploy.image_tag,
                "region": base.region
            }
        }),
    };

    let pipeline_definition = match definition {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    PipelineConfig {
        name: format!("{}-deploy", service),
        platform: base.platform,
        region: base.region.clone(),
        project_id: base.project_id.clone(),
        resource_group: base.resource_group.clone(),
        pipeline_definition,
        environment_variables: Default::default(),
        tags: Default::default(),
        timeout: base.timeout,
        retry_count: base.retry_count,
    }
}

/// Parse an RFC 3339 timestamp from a provider response
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::OpsError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend answering status queries from a script
    pub struct ScriptedBackend {
        pub platform: CloudPlatform,
        pub created: Mutex<Vec<PipelineConfig>>,
        pub fail_create: bool,
        /// Popped per status query; the last entry repeats
        pub statuses: Mutex<VecDeque<Result<PipelineStatus>>>,
        pub status_calls: Mutex<u32>,
    }

    impl ScriptedBackend {
        pub fn new(statuses: Vec<Result<PipelineStatus>>) -> Self {
            Self {
                platform: CloudPlatform::Gcp,
                created: Mutex::new(Vec::new()),
                fail_create: false,
                statuses: Mutex::new(statuses.into()),
                status_calls: Mutex::new(0),
            }
        }

        pub fn status_calls(&self) -> u32 {
            *self.status_calls.lock().unwrap()
        }
    }

    impl PipelineBackend for ScriptedBackend {
        fn platform(&self) -> CloudPlatform {
            self.platform
        }

        fn create(&self, config: &PipelineConfig) -> Result<String> {
            if self.fail_create {
                return Err(OpsError::provider(self.platform.as_str(), "quota exceeded"));
            }
            self.created.lock().unwrap().push(config.clone());
            Ok(format!("{}-id", config.name))
        }

        fn start(&self, pipeline_id: &str) -> Result<String> {
            Ok(format!("{}-run", pipeline_id))
        }

        fn status(&self, _id: &str) -> Result<RunState> {
            *self.status_calls.lock().unwrap() += 1;
            let mut statuses = self.statuses.lock().unwrap();
            let next = if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().map(|r| match r {
                    Ok(s) => Ok(*s),
                    Err(e) => Err(OpsError::provider("scripted", e.to_string())),
                })
            };
            let status = next.unwrap_or(Ok(PipelineStatus::Running))?;
            Ok(RunState {
                status,
                start_time: None,
            })
        }
    }
}
