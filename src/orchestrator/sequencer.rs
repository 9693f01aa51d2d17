//! Step sequencer
//!
//! Walks the pipeline in order, threading created entities from create
//! steps into fanout steps and stopping only at a failed gate. Probe
//! failures after the gate are recorded and the run carries on, so a
//! single pass surfaces as much as possible.

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::common::config::{Config, Service};
use crate::common::{truncate_body, Error, Result};
use crate::transport::{Request, Transport};

use super::collector::ResultLog;
use super::pipeline::{Pipeline, Step};
use super::probe::{Entity, FanoutProbe, Probe};
use super::report::{HealthView, Report};

/// Mutable state of one run
#[derive(Debug, Default)]
pub struct RunContext {
    pub results: ResultLog,
    /// Entities in creation order
    pub created: Vec<Entity>,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Completed,
    /// A gate found a failed result; later steps were not attempted
    Aborted,
}

/// Runs pipelines against the configured services
pub struct Orchestrator {
    config: Config,
    pipeline: Pipeline,
    transport: Arc<dyn Transport>,
    /// Held for the duration of a run so runs never share a context
    run_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(config: Config, pipeline: Pipeline, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            pipeline,
            transport,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the pipeline once and build the report
    ///
    /// Concurrent callers are serialized; each run gets a fresh context.
    pub async fn run(&self) -> Report {
        let _guard = self.run_lock.lock().await;
        self.run_exclusive().await
    }

    /// Like [`run`](Self::run), but refuses to wait for a run in progress
    pub async fn try_run(&self) -> Result<Report> {
        let _guard = self.run_lock.try_lock().map_err(|_| Error::RunInProgress)?;
        Ok(self.run_exclusive().await)
    }

    async fn run_exclusive(&self) -> Report {
        tracing::info!(steps = self.pipeline.steps.len(), "starting run");

        let mut ctx = RunContext::default();
        let aborted = self.execute(&mut ctx).await == RunState::Aborted;
        let report = Report::build(ctx, aborted);

        tracing::info!(
            total = report.summary.total_tests,
            successful = report.summary.successful_tests,
            failed = report.summary.failed_tests,
            aborted,
            "run finished"
        );
        report
    }

    /// Interpret every step against `ctx`
    pub async fn execute(&self, ctx: &mut RunContext) -> RunState {
        for (i, step) in self.pipeline.steps.iter().enumerate() {
            match step {
                Step::Probe(probe) => self.run_probe(probe, ctx).await,
                Step::Gate => {
                    if !ctx.results.all_succeeded() {
                        tracing::warn!(step = i + 1, "gate failed, aborting run");
                        return RunState::Aborted;
                    }
                    tracing::info!(step = i + 1, "gate passed");
                }
                Step::Fanout(template) => self.run_fanout(template, ctx).await,
            }
        }
        RunState::Completed
    }

    async fn run_probe(&self, probe: &Probe, ctx: &mut RunContext) {
        let outcome = probe
            .run(
                self.transport.as_ref(),
                &self.config.services,
                self.config.request_timeout(),
            )
            .await;

        if let Some(entity) = outcome.entity {
            tracing::debug!(id = %entity.id, name = %entity.name, "captured entity");
            ctx.created.push(entity);
        }
        ctx.results.append(outcome.result);
    }

    /// One probe per created entity, issued together, recorded in creation order
    async fn run_fanout(&self, template: &FanoutProbe, ctx: &mut RunContext) {
        if ctx.created.is_empty() {
            tracing::debug!(probe = %template.name, "no entities created, skipping fanout");
            return;
        }

        let probes: Vec<Probe> = ctx
            .created
            .iter()
            .map(|entity| template.instantiate(entity))
            .collect();

        let timeout = self.config.request_timeout();
        let outcomes = join_all(probes.iter().map(|probe| {
            probe.run(self.transport.as_ref(), &self.config.services, timeout)
        }))
        .await;

        ctx.results
            .extend(outcomes.into_iter().map(|outcome| outcome.result));
    }

    /// Run only the liveness checks ahead of the first gate
    pub async fn check_health(&self) -> HealthView {
        let timeout = self.config.request_timeout();
        let mut results = ResultLog::new();
        for probe in self.pipeline.health_probes() {
            let outcome = probe
                .run(self.transport.as_ref(), &self.config.services, timeout)
                .await;
            results.append(outcome.result);
        }
        HealthView::from_results(results.iter())
    }

    /// GET a path on a service and return its JSON body
    pub async fn fetch(&self, service: Service, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.config.services.base_url(service), path);
        let response = self
            .transport
            .call(Request::get(url, self.config.request_timeout()))
            .await?;

        if !response.is_ok() {
            return Err(Error::unexpected_status(
                response.status,
                &truncate_body(&response.body, 200),
            ));
        }
        response
            .json()
            .map_err(|e| Error::MalformedPayload(format!("invalid JSON: {}", e)))
    }
}
