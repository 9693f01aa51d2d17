//! CLI command definitions
//!
//! Defines the clap commands for the probe runner.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Connection options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Configuration file (default: platform config dir/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the user service (Service 1)
    #[arg(long, global = true)]
    pub primary_url: Option<String>,

    /// Base URL of the processing service (Service 2)
    #[arg(long, global = true)]
    pub secondary_url: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full test pipeline and print the report
    Run {
        /// Load the pipeline from a YAML file instead of the built-in one
        #[arg(long)]
        pipeline: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Exit with status 1 unless every probe succeeded
        #[arg(long)]
        strict: bool,
    },

    /// Check that both services are up
    Health {
        /// Load health probes from a YAML pipeline file
        #[arg(long)]
        pipeline: Option<PathBuf>,

        /// Print the health view as JSON
        #[arg(long)]
        json: bool,

        /// Exit with status 1 unless every service is healthy
        #[arg(long)]
        strict: bool,
    },

    /// List users stored in Service 1
    Users,

    /// Show analytics computed by Service 2
    Analytics,
}
