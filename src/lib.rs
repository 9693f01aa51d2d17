//! probe-runner - integration-test orchestrator
//!
//! This library drives a fixed pipeline of HTTP probes against two
//! independently deployed services and aggregates the outcomes into a
//! structured report.

pub mod cli;
pub mod commands;
pub mod common;
pub mod orchestrator;
pub mod transport;

// Re-export commonly used types for tests
pub use common::config::{Config, Service};
pub use common::{Error, Result};
pub use orchestrator::{Orchestrator, Pipeline, Report};
