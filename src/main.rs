// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use okteto_destroy::cli::commands::{Commands, RemoteRunCommands};
use okteto_destroy::cli::{display, CliArgs};
use okteto_destroy::OktetoError;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Commands::Destroy(cmd) => cmd.execute().await,
        Commands::RemoteRun {
            command: RemoteRunCommands::Destroy(cmd),
        } => cmd.execute().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<OktetoError>() {
            Some(okteto_err) => {
                match okteto_err {
                    OktetoError::User { message, hint } => display::error(message, hint.as_deref()),
                    other => display::error(&other.to_string(), None),
                }
                ExitCode::from(okteto_err.exit_code() as u8)
            }
            None => {
                display::error(&format!("{:#}", err), None);
                ExitCode::FAILURE
            }
        },
    }
}
