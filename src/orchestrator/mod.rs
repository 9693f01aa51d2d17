//! Test orchestration engine
//!
//! Runs a pipeline of probes against the two services under test,
//! gating on service health and feeding created entities into per-entity
//! probes, then condenses the results into a [`Report`].

mod collector;
mod pipeline;
mod probe;
mod report;
mod sequencer;

pub use collector::{Payload, ProbeResult, ResultLog, Summary};
pub use pipeline::{seed_users, Pipeline, Step};
pub use probe::{Entity, Expect, FanoutProbe, Probe, ProbeOutcome};
pub use report::{HealthStatus, HealthView, Report, ReportSummary, ServiceHealth, ABORT_MESSAGE};
pub use sequencer::{Orchestrator, RunContext, RunState};
