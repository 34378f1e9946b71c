//! `okteto remote-run destroy`, executed inside the remote builder image

use crate::domain::config::{load_context, ContextOptions};
use crate::domain::destroy::{CommandRunner, Deployable, Interrupt, RemoteRun, RemoteRunOptions};
use crate::domain::variables::DeployVariable;
use crate::infrastructure::constants::{ENV_CONTEXT, ENV_DEPLOYABLE, ENV_NAMESPACE};
use crate::infrastructure::executor::ShellExecutor;
use crate::infrastructure::kubernetes::OktetoKubeClient;
use crate::shared::error::{OktetoError, Result};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;

#[derive(Parser, Debug, Clone)]
pub struct RemoteRunCommand {
    /// Development environment name
    #[arg(long)]
    pub name: String,

    #[arg(long, env = ENV_NAMESPACE, default_value = "")]
    pub namespace: String,

    #[arg(long, env = ENV_CONTEXT, default_value = "")]
    pub context: String,

    /// Encoded commands to run
    #[arg(long, env = ENV_DEPLOYABLE, hide_env_values = true, default_value = "")]
    pub deployable: String,

    #[arg(long)]
    pub force_destroy: bool,

    #[arg(long = "var")]
    pub variables: Vec<DeployVariable>,

    /// Output format for logs
    #[arg(long, short = 'o', default_value = "json")]
    pub log_output: String,
}

impl RemoteRunCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        match self.run().await {
            Ok(()) => Ok(()),
            Err(err) => {
                if self.log_output == "json" {
                    println!("{}", error_line(&err));
                }
                Err(err.into())
            }
        }
    }

    async fn run(&self) -> Result<()> {
        let deployable = Deployable::decode(&self.deployable)?;
        let ctx = load_context(&ContextOptions {
            context: Some(self.context.clone()).filter(|c| !c.is_empty()),
            namespace: Some(self.namespace.clone()).filter(|n| !n.is_empty()),
            kubeconfig: None,
        })?;
        let kube = Arc::new(OktetoKubeClient::new_with_config(&ctx).await?);

        let runner = CommandRunner::new(
            Arc::new(ShellExecutor::new(false, None)),
            kube,
            Interrupt::ctrl_c(),
        );
        let opts = RemoteRunOptions {
            name: self.name.clone(),
            namespace: if self.namespace.is_empty() {
                ctx.namespace.clone()
            } else {
                self.namespace.clone()
            },
            context: ctx.name.clone(),
            force_destroy: self.force_destroy,
            variables: self.variables.clone(),
        };
        RemoteRun::new(runner).run(&opts, deployable).await
    }
}

/// JSON log line read back by the remote runner to report the failing stage
pub fn error_line(err: &OktetoError) -> String {
    let stage = match err {
        OktetoError::Command { command, .. } => command.as_str(),
        _ => "destroy",
    };
    json!({
        "level": "error",
        "stage": stage,
        "message": err.to_string(),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::remote::runner::parse_build_line;

    #[test]
    fn test_error_line_is_read_back_by_runner() {
        let err = OktetoError::command("helm uninstall movies", "exit status 1");
        let line = format!("#9 3.102 {}", error_line(&err));
        let parsed = parse_build_line(&line).unwrap();
        assert_eq!(parsed.level, "error");
        assert_eq!(parsed.stage, "helm uninstall movies");
        assert_eq!(
            parsed.message,
            "error executing command 'helm uninstall movies': exit status 1"
        );
    }

    #[test]
    fn test_generic_error_stage() {
        let line = error_line(&OktetoError::user("boom"));
        assert!(line.contains(r#""stage":"destroy""#));
    }
}
