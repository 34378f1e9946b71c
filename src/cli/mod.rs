//! Command line interface

pub mod commands;
pub mod destroy;
pub mod display;
pub mod remote_run;

use clap::Parser;
use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "okteto",
    version,
    about = "Destroy Okteto development environments",
    long_about = "Destroys everything created by a deploy of an Okteto development environment: \
                  destroy commands, helm releases, dependencies, divert routes and labeled resources"
)]
pub struct CliArgs {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, short = 'l', global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}
