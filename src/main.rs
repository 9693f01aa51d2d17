//! probe-runner - integration-test orchestrator for a pair of HTTP services
//!
//! Runs health checks, creates users, reads them back, follows each one
//! into the processing service and reports what worked.

use clap::Parser;
use probe_runner::commands::{Commands, ConnectionArgs};
use probe_runner::{cli, common::logging};

#[derive(Parser)]
#[command(name = "probe-runner", about = "Integration-test orchestrator for HTTP services")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    if let Err(e) = cli::dispatch(cli.command, cli.connection).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
