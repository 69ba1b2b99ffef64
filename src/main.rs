//! docker-proxy integration-test runner
//!
//! Brings up an isolated environment per scenario, runs its commands in the
//! test client and reports which expectations held.

use std::process::ExitCode;

use clap::Parser;
use itest::{cli, commands::RunArgs, common::logging};

#[derive(Parser)]
#[command(
    name = "docker-proxy-itest",
    about = "Run docker-proxy socket integration tests"
)]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    args: RunArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Held until exit so the file writer flushes
    let _log_guard = logging::init_cli(cli.args.log_file.as_deref());

    if cli.args.no_color {
        colored::control::set_override(false);
    }

    match cli::dispatch(cli.args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
