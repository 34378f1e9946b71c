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

//! Destroy orchestrator for a single development environment

use super::commands::{command_env, CommandRunner};
use super::decision::should_run_in_remote;
use super::interrupt::Interrupt;
use super::remote::{
    base_image, classify_remote_error, cli_image, command_flags, RemoteParams, RemoteRunner,
    DOCKERFILE_TEMPLATE,
};
use super::status::{CfgData, DestroyStatus, StatusHandler};
use super::{
    ClusterDestroyer, CommandExecutor, ConfigMapStore, DeleteAllOptions, DependencyDestroyer,
    DestroyOptions, DivertDriver, SecretLister,
};
use crate::domain::config::{infer_name, Manifest, OktetoContext};
use crate::infrastructure::constants::{DEPLOYED_BY_LABEL, ENV_ACTION_NAME};
use crate::shared::error::{OktetoError, Result, INTERRUPT_MESSAGE};
use crate::shared::format::resource_k8s_meta_string;
use k8s_openapi::api::core::v1::ConfigMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Environment lookup, injectable for tests
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key).ok())
}

/// External collaborators of the destroy orchestrator
#[derive(Clone)]
pub struct Collaborators {
    pub executor: Arc<dyn CommandExecutor>,
    pub cluster: Arc<dyn ClusterDestroyer>,
    pub secrets: Arc<dyn SecretLister>,
    pub configmaps: Arc<dyn ConfigMapStore>,
    pub dependencies: Arc<dyn DependencyDestroyer>,
    pub divert: Arc<dyn DivertDriver>,
    pub remote: Arc<dyn RemoteRunner>,
}

pub struct Destroyer {
    context: OktetoContext,
    runner: CommandRunner,
    cluster: Arc<dyn ClusterDestroyer>,
    status: StatusHandler,
    dependencies: Arc<dyn DependencyDestroyer>,
    divert: Arc<dyn DivertDriver>,
    remote: Arc<dyn RemoteRunner>,
    interrupt: Interrupt,
    env: EnvLookup,
    cli_version: String,
}

impl Destroyer {
    pub fn new(context: OktetoContext, deps: Collaborators, interrupt: Interrupt) -> Self {
        Self::with_env(context, deps, interrupt, process_env())
    }

    pub fn with_env(
        context: OktetoContext,
        deps: Collaborators,
        interrupt: Interrupt,
        env: EnvLookup,
    ) -> Self {
        let status = StatusHandler::new(deps.configmaps, env(ENV_ACTION_NAME));
        Self {
            context,
            runner: CommandRunner::new(deps.executor, deps.secrets, interrupt.clone()),
            cluster: deps.cluster,
            status,
            dependencies: deps.dependencies,
            divert: deps.divert,
            remote: deps.remote,
            interrupt,
            env,
            cli_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn status(&self) -> &StatusHandler {
        &self.status
    }

    /// Resolves the request and destroys the environment.
    ///
    /// Returns the resolved environment name on success.
    pub async fn run(&self, mut opts: DestroyOptions, manifest: &Manifest) -> Result<String> {
        opts.name = resolve_name(&opts, manifest)?;
        if opts.namespace.is_empty() {
            opts.namespace = self.context.namespace.clone();
        }
        if opts.namespace.is_empty() {
            return Err(OktetoError::Resolution(
                "could not determine the namespace, use the '--namespace' flag".to_string(),
            ));
        }

        let remote = should_run_in_remote(opts.run_in_remote, manifest.destroy.as_ref(), &*self.env);
        debug!(
            "destroying '{}' in namespace '{}' (remote: {})",
            opts.name, opts.namespace, remote
        );

        let name = opts.name.clone();
        self.destroy(opts, manifest, remote).await?;
        Ok(name)
    }

    async fn destroy(
        &self,
        mut opts: DestroyOptions,
        manifest: &Manifest,
        remote: bool,
    ) -> Result<()> {
        info!("Destroying...");

        let stored = self
            .status
            .get_variables(&opts.namespace, &opts.name)
            .await?;
        opts.variables.extend(stored);

        let data = CfgData {
            name: opts.name.clone(),
            namespace: opts.namespace.clone(),
            status: DestroyStatus::Destroying,
            filename: opts.manifest_path_flag.clone(),
            variables: opts.variables.clone(),
        };
        let cfg = self.status.translate_and_deploy(&data).await?;

        if opts.destroy_dependencies {
            for (dep_name, dep) in &manifest.dependencies {
                let namespace = if dep.namespace.is_empty() {
                    self.context.namespace.as_str()
                } else {
                    dep.namespace.as_str()
                };
                info!("Destroying dependency '{}'", dep_name);
                match self
                    .guard(
                        self.dependencies
                            .destroy(dep_name, namespace, opts.destroy_volumes),
                    )
                    .await
                {
                    Ok(()) => {}
                    Err(OktetoError::Interrupted) => return Err(self.interrupted(&cfg).await),
                    Err(e) => {
                        let err = OktetoError::Dependency {
                            name: dep_name.clone(),
                            message: e.to_string(),
                        };
                        return Err(self.status.set_error_status(&cfg, err).await);
                    }
                }
            }
        }

        let manifest_namespace = if manifest.namespace.is_empty() {
            opts.namespace.as_str()
        } else {
            manifest.namespace.as_str()
        };
        if let Some(divert) = manifest.divert_target(manifest_namespace) {
            info!("Destroying divert from namespace '{}'", divert.namespace);
            match self.guard(self.divert.destroy(divert, &opts.namespace)).await {
                Ok(()) => {}
                Err(OktetoError::Interrupted) => return Err(self.interrupted(&cfg).await),
                Err(e) => {
                    let err = match e {
                        OktetoError::Divert(_) => e,
                        other => OktetoError::Divert(other.to_string()),
                    };
                    return Err(self.status.set_error_status(&cfg, err).await);
                }
            }
        }

        let env = command_env(&opts.name, &opts.namespace, &self.context.name, &opts.variables);
        let mut forced_err = None;

        if remote {
            match self.run_remote(&opts, manifest).await {
                Ok(()) => {}
                Err(OktetoError::Interrupted) => return Err(self.interrupted(&cfg).await),
                Err(e) if opts.force_destroy => {
                    warn!("remote destroy failed: {}", e);
                    forced_err = Some(e);
                }
                Err(e) => return Err(self.status.set_error_status(&cfg, e).await),
            }
        } else {
            match self
                .runner
                .run_commands(manifest.destroy_commands().to_vec(), env.clone(), opts.force_destroy)
                .await
            {
                Ok(remembered) => forced_err = remembered,
                Err(OktetoError::Interrupted) => return Err(self.interrupted(&cfg).await),
                Err(e) => return Err(self.status.set_error_status(&cfg, e).await),
            }
        }

        info!("Destroying development environment '{}'...", opts.name);
        let delete_opts = DeleteAllOptions {
            label_selector: format!(
                "{}={}",
                DEPLOYED_BY_LABEL,
                resource_k8s_meta_string(&opts.name)
            ),
            include_volumes: opts.destroy_volumes,
        };

        debug!("destroying volumes");
        match self
            .guard(
                self.cluster
                    .destroy_stateful_volumes(&opts.namespace, &delete_opts),
            )
            .await
        {
            Ok(()) => {}
            Err(OktetoError::Interrupted) => return Err(self.interrupted(&cfg).await),
            Err(e) => return Err(self.status.set_error_status(&cfg, e).await),
        }

        if !remote {
            debug!("destroying helm releases");
            match self
                .runner
                .destroy_helm_releases(
                    &opts.namespace,
                    &delete_opts.label_selector,
                    env,
                    opts.force_destroy,
                )
                .await
            {
                Ok(remembered) => {
                    if forced_err.is_none() {
                        forced_err = remembered;
                    }
                }
                Err(OktetoError::Interrupted) => return Err(self.interrupted(&cfg).await),
                Err(e) => return Err(self.status.set_error_status(&cfg, e).await),
            }
        }

        debug!(
            "destroying resources with deployed-by label '{}'",
            delete_opts.label_selector
        );
        match self
            .guard(self.cluster.destroy_with_label(&opts.namespace, &delete_opts))
            .await
        {
            Ok(()) => {}
            Err(OktetoError::Interrupted) => return Err(self.interrupted(&cfg).await),
            Err(e) => {
                info!("could not delete all the resources: {}", e);
                return Err(self.status.set_error_status(&cfg, e).await);
            }
        }

        self.status.destroy(&cfg).await?;

        match forced_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn run_remote(&self, opts: &DestroyOptions, manifest: &Manifest) -> Result<()> {
        let destroy = manifest.destroy.as_ref();
        let context_dir = manifest.destroy_dir(&opts.working_dir);
        let params = RemoteParams {
            name: opts.name.clone(),
            namespace: opts.namespace.clone(),
            base_image: base_image(destroy.map(|d| d.image.as_str())),
            cli_image: cli_image(&self.cli_version, &*self.env),
            command_flags: command_flags(&opts.name, opts.force_destroy, &opts.variables),
            commands: manifest.destroy_commands().to_vec(),
            manifest_path_flag: opts.manifest_path_flag.clone(),
            context_dir,
            dockerfile_template: DOCKERFILE_TEMPLATE.to_string(),
        };

        self.guard(self.remote.run(params))
            .await
            .map_err(classify_remote_error)
    }

    /// Races a phase against the interrupt. A pending interrupt wins.
    async fn guard<T>(&self, phase: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.interrupt.wait() => Err(OktetoError::Interrupted),
            result = phase => result,
        }
    }

    /// Records the interrupt. A failure to record it is logged and dropped.
    async fn interrupted(&self, cfg: &ConfigMap) -> OktetoError {
        if let Err(e) = self.status.record_error(cfg, INTERRUPT_MESSAGE).await {
            warn!("could not record interrupt: {}", e);
        }
        OktetoError::Interrupted
    }
}

/// `--name`, then the manifest name, then the repository or directory name
pub fn resolve_name(opts: &DestroyOptions, manifest: &Manifest) -> Result<String> {
    let name = if !opts.name.trim().is_empty() {
        opts.name.trim().to_string()
    } else if let Some(name) = manifest.name.as_deref().filter(|n| !n.trim().is_empty()) {
        name.trim().to_string()
    } else {
        infer_name(&opts.working_dir)
    };

    if name.is_empty() {
        return Err(OktetoError::Resolution(
            "could not infer the development environment name, use the '--name' flag".to_string(),
        ));
    }
    Ok(name)
}
