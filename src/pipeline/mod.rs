//! Multi-cloud CI/CD pipeline helper
//!
//! A thin layer over provider pipeline APIs: AWS CodePipeline through the
//! `aws` CLI, Azure DevOps and Google Cloud Build over REST. Provider
//! statuses are mapped onto one [`PipelineStatus`].

mod aws;
mod azure;
mod backend;
mod gcp;
mod helper;
mod models;

pub use aws::{AwsCliBackend, ROLE_ARN_ENV};
pub use azure::{AzureDevOpsBackend, AZURE_TOKEN_ENV};
pub use backend::*;
pub use gcp::{trigger_config, CloudBuildBackend, GCP_TOKEN_ENV};
pub use helper::*;
pub use models::*;
