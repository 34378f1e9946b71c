// CLI command definitions

use super::destroy::DestroyCommand;
use super::remote_run::RemoteRunCommand;

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Destroy everything created by the deploy command of your development environment
    Destroy(DestroyCommand),

    /// Run a destroy inside the remote builder
    #[command(name = "remote-run", hide = true)]
    RemoteRun {
        #[command(subcommand)]
        command: RemoteRunCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum RemoteRunCommands {
    /// Run the destroy commands of a deployable
    Destroy(RemoteRunCommand),
}
