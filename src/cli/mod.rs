//! CLI command handling
//!
//! Builds the orchestrator from configuration, dispatches commands and
//! formats output.

use colored::Colorize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::commands::{Commands, ConnectionArgs};
use crate::common::config::{Config, Overrides, Service};
use crate::common::{Error, Result};
use crate::orchestrator::{HealthStatus, HealthView, Orchestrator, Pipeline, ProbeResult, Report};
use crate::transport::HttpTransport;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, conn: ConnectionArgs) -> Result<()> {
    let config = resolve_config(&conn)?;
    tracing::debug!(
        primary = %config.services.primary_url,
        secondary = %config.services.secondary_url,
        timeout_secs = config.timeouts.request_secs,
        "resolved configuration"
    );

    match command {
        Commands::Run {
            pipeline,
            json,
            output,
            strict,
        } => {
            let orchestrator = build_orchestrator(config, pipeline.as_deref())?;

            if !json {
                println!(
                    "\n{} {} / {}",
                    "Running pipeline against".blue().bold(),
                    orchestrator.config().services.primary_url.white().bold(),
                    orchestrator.config().services.secondary_url.white().bold()
                );
            }

            let report = orchestrator.run().await;

            if let Some(path) = &output {
                std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
                tracing::info!(path = %path.display(), "report written");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            if strict && !report.all_passed() {
                return Err(Error::RunFailed(format!(
                    "{} of {} probes failed",
                    report.summary.failed_tests, report.summary.total_tests
                )));
            }
            Ok(())
        }

        Commands::Health {
            pipeline,
            json,
            strict,
        } => {
            let orchestrator = build_orchestrator(config, pipeline.as_deref())?;
            let view = orchestrator.check_health().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_health(&view);
            }

            if strict && !view.all_healthy() {
                return Err(Error::RunFailed(
                    "one or more services are unhealthy".to_string(),
                ));
            }
            Ok(())
        }

        Commands::Users => {
            let orchestrator = build_orchestrator(config, None)?;
            let body = match orchestrator.fetch(Service::Primary, "/users").await {
                Ok(users) => json!({"success": true, "users": users}),
                Err(e) => json!({"success": false, "error": e.to_string()}),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }

        Commands::Analytics => {
            let orchestrator = build_orchestrator(config, None)?;
            let body = match orchestrator.fetch(Service::Secondary, "/analytics").await {
                Ok(analytics) => json!({"success": true, "analytics": analytics}),
                Err(e) => json!({"success": false, "error": e.to_string()}),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
    }
}

/// File, then environment, then flags
pub fn resolve_config(conn: &ConnectionArgs) -> Result<Config> {
    let mut config = match &conn.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env()?;
    config.apply_overrides(Overrides {
        primary_url: conn.primary_url.clone(),
        secondary_url: conn.secondary_url.clone(),
        timeout_secs: conn.timeout,
    })?;
    Ok(config)
}

fn build_orchestrator(config: Config, pipeline: Option<&Path>) -> Result<Orchestrator> {
    let pipeline = match pipeline {
        Some(path) => Pipeline::load(path)?,
        None => Pipeline::standard(),
    };
    let transport = Arc::new(HttpTransport::new()?);
    Ok(Orchestrator::new(config, pipeline, transport))
}

fn print_report(report: &Report) {
    println!("\n{}", "Results:".cyan());
    for result in &report.results {
        print_result(result);
    }

    let summary = &report.summary;
    let counts = format!(
        "{} total, {} successful, {} failed",
        summary.total_tests, summary.successful_tests, summary.failed_tests
    );

    if !report.success {
        println!("\n{} {}", "✗".red().bold(), report.message.red().bold());
        println!("  {}\n", counts.dimmed());
    } else if report.all_passed() {
        println!("\n{} {}", "✓".green().bold(), report.message.green().bold());
        println!("  {}\n", counts.dimmed());
    } else {
        println!("\n{} {}", "!".yellow().bold(), report.message.yellow().bold());
        println!("  {}\n", counts.dimmed());
    }
}

fn print_result(result: &ProbeResult) {
    let mark = if result.success {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "  {} {} {} {}",
        mark,
        result.timestamp.dimmed(),
        result.name,
        result.message.dimmed()
    );
}

fn print_health(view: &HealthView) {
    println!("{}", "Services:".cyan());
    for service in &view.services {
        let status = match service.status {
            HealthStatus::Healthy => "healthy".green(),
            HealthStatus::Unhealthy => "unhealthy".red(),
        };
        println!("  {} [{}] {}", service.name, status, service.message.dimmed());
    }
}
