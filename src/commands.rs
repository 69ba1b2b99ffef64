//! CLI argument definitions

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Scenario name to run (default: all). Can be provided multiple times
    #[arg(long = "scenario", short = 's', value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// List available scenarios and exit
    #[arg(long)]
    pub list: bool,

    /// Configuration file (default: per-user config.toml if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Environment declaration to bring up, overriding the config file
    #[arg(long, value_name = "PATH")]
    pub compose_file: Option<PathBuf>,

    /// YAML scenario registry replacing the built-in scenarios
    #[arg(long = "scenarios", value_name = "PATH")]
    pub scenarios_file: Option<PathBuf>,

    /// Echo every executed command and explain failed expectations
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// Also write diagnostics to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}
