//! Provider-neutral pipeline operations
//!
//! Every operation returns a [`PipelineResult`]; provider errors become a
//! failed result carrying the error message instead of propagating.

use super::backend::{backend_for, deployment_pipeline, PipelineBackend};
use super::models::{DeploymentConfig, PipelineConfig, PipelineResult, PipelineStatus};
use crate::error::Result;
use crate::progress::StepReporter;
use chrono::Utc;
use std::time::{Duration, Instant};

/// Interval between status queries while waiting
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct PipelineHelper {
    config: PipelineConfig,
    backend: Box<dyn PipelineBackend>,
    poll_interval: Duration,
    reporter: StepReporter,
}

impl PipelineHelper {
    pub fn new(config: PipelineConfig, backend: Box<dyn PipelineBackend>) -> Self {
        Self {
            config,
            backend,
            poll_interval: DEFAULT_POLL_INTERVAL,
            reporter: StepReporter::disabled(),
        }
    }

    /// Helper with the backend for the configured platform
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let backend = backend_for(&config)?;
        Ok(Self::new(config, backend))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reporter(mut self, reporter: StepReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn create_pipeline(&self) -> PipelineResult {
        self.create_from(&self.config)
    }

    fn create_from(&self, config: &PipelineConfig) -> PipelineResult {
        tracing::info!("Creating pipeline: {}", config.name);
        match self.backend.create(config) {
            Ok(id) => PipelineResult::accepted(id, PipelineStatus::Pending),
            Err(e) => {
                tracing::error!("Failed to create pipeline: {}", e);
                PipelineResult::failed("", e.to_string())
            }
        }
    }

    pub fn start_pipeline(&self, pipeline_id: &str) -> PipelineResult {
        tracing::info!("Starting pipeline: {}", pipeline_id);
        match self.backend.start(pipeline_id) {
            Ok(run_id) => PipelineResult::accepted(run_id, PipelineStatus::Running),
            Err(e) => {
                tracing::error!("Failed to start pipeline: {}", e);
                PipelineResult::failed(pipeline_id, e.to_string())
            }
        }
    }

    pub fn get_status(&self, id: &str) -> PipelineResult {
        match self.backend.status(id) {
            Ok(state) => PipelineResult::observed(id, state.status, state.start_time),
            Err(e) => {
                tracing::error!("Failed to get pipeline status: {}", e);
                PipelineResult::failed(id, e.to_string())
            }
        }
    }

    /// Poll until a terminal status or `timeout`. Up to `retryCount`
    /// consecutive transient query failures are tolerated; any other
    /// error ends the wait at once.
    pub fn wait_for_completion(&self, id: &str, timeout: Duration) -> PipelineResult {
        tracing::info!("Waiting for pipeline completion: {}", id);
        let started = Instant::now();
        let started_at = Utc::now();
        let mut failures = 0u32;

        self.reporter.start_step(&format!("Waiting for {}", id));

        while started.elapsed() < timeout {
            match self.backend.status(id) {
                Ok(state) if state.status.is_terminal() => {
                    self.reporter.clear();
                    return PipelineResult::observed(id, state.status, state.start_time)
                        .finish(Utc::now());
                }
                Ok(state) => {
                    failures = 0;
                    tracing::debug!("{} is {}", id, state.status);
                    self.reporter
                        .set_status(&format!("Waiting for {} ({})", id, state.status));
                }
                Err(e) if !e.is_transient() => {
                    tracing::error!("Status check failed: {}", e);
                    self.reporter.clear();
                    return PipelineResult::failed(id, e.to_string()).finish(Utc::now());
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        "Status check {} of {} failed: {}",
                        failures,
                        self.config.retry_count + 1,
                        e
                    );
                    if failures > self.config.retry_count {
                        self.reporter.clear();
                        return PipelineResult::failed(id, e.to_string()).finish(Utc::now());
                    }
                }
            }

            let remaining = timeout.saturating_sub(started.elapsed());
            std::thread::sleep(self.poll_interval.min(remaining));
        }

        self.reporter.clear();
        let mut result = PipelineResult::failed(id, "Pipeline execution timed out");
        result.start_time = started_at;
        result.end_time = Some(Utc::now());
        result.duration = Some(timeout.as_secs_f64());
        result
    }

    /// Derive `<service>-deploy`, then create, start and wait for it
    pub fn deploy_service(&self, deploy: &DeploymentConfig) -> PipelineResult {
        tracing::info!("Deploying service: {}", deploy.service_name);
        let pipeline = deployment_pipeline(&self.config, deploy);

        let created = self.create_from(&pipeline);
        if !created.success {
            return created;
        }
        let started = self.start_pipeline(&created.pipeline_id);
        if !started.success {
            return started;
        }
        self.wait_for_completion(&started.pipeline_id, Duration::from_secs(pipeline.timeout))
    }
}
