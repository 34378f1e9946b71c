//! `okteto destroy`

use super::display;
use crate::domain::config::{load_context, ContextOptions, Manifest, OktetoContext};
use crate::domain::destroy::{
    process_env, Collaborators, DependencyDestroyer, DestroyAll, DestroyOptions, Destroyer,
    Interrupt, OktetoApi, StatusHandler,
};
use crate::domain::variables::DeployVariable;
use crate::infrastructure::executor::ShellExecutor;
use crate::infrastructure::kubernetes::{DivertDrivers, NamespaceDestroyer, OktetoKubeClient};
use crate::infrastructure::okteto::{OktetoClient, PipelineDestroyer};
use crate::infrastructure::remote::DockerRunner;
use crate::shared::error::{OktetoError, Result};
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug, Clone)]
pub struct DestroyCommand {
    /// Development environment name
    #[arg(long)]
    pub name: Option<String>,

    /// Path to the Okteto manifest file
    #[arg(long, short = 'f')]
    pub file: Option<String>,

    /// Overwrites the namespace where the development environment was deployed
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Context where the development environment was deployed
    #[arg(long, short = 'c')]
    pub context: Option<String>,

    /// Kubeconfig file path
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Remove persistent volumes
    #[arg(long, short = 'v')]
    pub volumes: bool,

    /// Destroy repositories in the "dependencies" section
    #[arg(long)]
    pub dependencies: bool,

    /// Forces the development environment to be destroyed even if there is an error executing the custom destroy commands
    #[arg(long)]
    pub force_destroy: bool,

    /// Execute commands with "sh" rather than "bash"
    #[arg(long)]
    pub no_bash: bool,

    /// Destroy all development environments, including their volumes
    #[arg(long, conflicts_with = "name")]
    pub all: bool,

    /// Run the destroy in the remote builder
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub remote: Option<bool>,

    /// Set a variable (can be set more than once)
    #[arg(long = "var")]
    pub variables: Vec<DeployVariable>,

    /// Output format for logs
    #[arg(long, short = 'o', hide = true, default_value = "tty")]
    pub log_output: String,
}

impl DestroyCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let ctx = load_context(&ContextOptions {
            context: self.context.clone(),
            namespace: self.namespace.clone(),
            kubeconfig: self.kubeconfig.clone(),
        })?;

        let kube = Arc::new(OktetoKubeClient::new_with_config(&ctx).await?);
        let namespace = self
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .or_else(|| Some(ctx.namespace.clone()).filter(|ns| !ns.is_empty()))
            .unwrap_or_else(|| kube.default_namespace());
        debug!("using context '{}' and namespace '{}'", ctx.name, namespace);

        let interrupt = Interrupt::ctrl_c();

        if self.all {
            self.destroy_all(&ctx, kube, &namespace, interrupt).await?;
            display::success(&format!(
                "Namespace '{}' successfully destroyed",
                namespace
            ));
            return Ok(());
        }

        let cwd = std::env::current_dir()?;
        let manifest = Manifest::load(&cwd, self.file.as_deref())?;
        let commands_dir = manifest.destroy_dir(&cwd);

        let collaborators = self.collaborators(&ctx, kube, commands_dir)?;
        let destroyer = Destroyer::new(ctx, collaborators, interrupt);
        let opts = DestroyOptions {
            name: self.name.clone().unwrap_or_default(),
            namespace,
            manifest_path_flag: self.file.clone(),
            variables: self.variables.clone(),
            destroy_volumes: self.volumes,
            force_destroy: self.force_destroy,
            destroy_dependencies: self.dependencies,
            run_in_remote: self.remote,
            working_dir: cwd,
        };

        let name = destroyer.run(opts, &manifest).await?;
        display::success(&format!(
            "Development environment '{}' successfully destroyed",
            name
        ));
        Ok(())
    }

    async fn destroy_all(
        &self,
        ctx: &OktetoContext,
        kube: Arc<OktetoKubeClient>,
        namespace: &str,
        interrupt: Interrupt,
    ) -> Result<()> {
        if !ctx.is_okteto {
            return Err(OktetoError::User {
                message: "the '--all' flag is only supported in Okteto contexts".to_string(),
                hint: Some("run 'okteto context' to select an Okteto context".to_string()),
            });
        }
        let api = Arc::new(OktetoClient::new(ctx)?);
        DestroyAll::new(api, kube.clone(), kube, interrupt)
            .run(namespace, self.volumes)
            .await
    }

    fn collaborators(
        &self,
        ctx: &OktetoContext,
        kube: Arc<OktetoKubeClient>,
        commands_dir: PathBuf,
    ) -> Result<Collaborators> {
        let dependencies: Arc<dyn DependencyDestroyer> = if ctx.is_okteto {
            let api: Arc<dyn OktetoApi> = Arc::new(OktetoClient::new(ctx)?);
            Arc::new(PipelineDestroyer::new(
                api,
                StatusHandler::new(kube.clone(), None),
            ))
        } else {
            Arc::new(VanillaDependencies)
        };

        Ok(Collaborators {
            executor: Arc::new(ShellExecutor::new(self.no_bash, Some(commands_dir))),
            cluster: Arc::new(NamespaceDestroyer::new(kube.get_client())),
            secrets: kube.clone(),
            configmaps: kube.clone(),
            dependencies,
            divert: Arc::new(DivertDrivers::new(kube.get_client())),
            remote: Arc::new(DockerRunner::new(ctx.clone(), process_env())),
        })
    }
}

/// Dependencies are Okteto pipelines, so plain Kubernetes contexts cannot destroy them.
struct VanillaDependencies;

#[async_trait]
impl DependencyDestroyer for VanillaDependencies {
    async fn destroy(&self, _name: &str, _namespace: &str, _destroy_volumes: bool) -> Result<()> {
        Err(OktetoError::User {
            message: "dependencies can only be destroyed in Okteto contexts".to_string(),
            hint: Some("remove the '--dependencies' flag or select an Okteto context".to_string()),
        })
    }
}
