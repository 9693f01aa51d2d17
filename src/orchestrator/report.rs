//! Final run report and the quick health view

use serde::Serialize;

use super::collector::ProbeResult;
use super::sequencer::RunContext;

/// Message used when the gate stops a run
pub const ABORT_MESSAGE: &str = "Services are not running. Please start both services first.";

/// Outcome of one orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// False only when the run was aborted at a gate
    pub success: bool,
    pub message: String,
    pub results: Vec<ProbeResult>,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_tests: usize,
    pub successful_tests: usize,
    pub failed_tests: usize,
}

impl Report {
    /// Consume a run's context
    pub fn build(ctx: RunContext, aborted: bool) -> Self {
        let summary = ctx.results.summary();
        let message = if aborted {
            ABORT_MESSAGE.to_string()
        } else {
            format!(
                "Tests completed: {}/{} successful",
                summary.successful, summary.total
            )
        };

        Self {
            success: !aborted,
            message,
            results: ctx.results.into_results(),
            summary: ReportSummary {
                total_tests: summary.total,
                successful_tests: summary.successful,
                failed_tests: summary.failed,
            },
        }
    }

    /// True when the run completed and no probe failed
    pub fn all_passed(&self) -> bool {
        self.success && self.summary.failed_tests == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
}

/// Health of each service, derived from health probe results only
#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    pub services: Vec<ServiceHealth>,
}

impl HealthView {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ProbeResult>) -> Self {
        let services = results
            .into_iter()
            .map(|r| ServiceHealth {
                name: r.name.clone(),
                status: if r.success {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Unhealthy
                },
                message: r.message.clone(),
            })
            .collect();
        Self { services }
    }

    pub fn all_healthy(&self) -> bool {
        self.services.iter().all(|s| s.status == HealthStatus::Healthy)
    }
}
