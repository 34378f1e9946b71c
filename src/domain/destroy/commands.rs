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

//! Command and Helm release phases shared by local and in-container destroys

use super::helm::{helm_releases, uninstall_command};
use super::interrupt::Interrupt;
use super::{CommandExecutor, SecretLister};
use crate::domain::config::DeployCommand;
use crate::domain::variables::DeployVariable;
use crate::infrastructure::constants::{ENV_CONTEXT, ENV_NAME, ENV_NAMESPACE};
use crate::shared::error::{OktetoError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Environment of destroy commands: the user variables plus the built-in `OKTETO_*` ones
pub fn command_env(
    name: &str,
    namespace: &str,
    context: &str,
    variables: &[DeployVariable],
) -> Vec<String> {
    let mut env: Vec<String> = variables.iter().map(|v| v.as_env()).collect();
    env.push(format!("{}={}", ENV_NAME, name));
    env.push(format!("{}={}", ENV_NAMESPACE, namespace));
    env.push(format!("{}={}", ENV_CONTEXT, context));
    env
}

#[derive(Clone)]
pub struct CommandRunner {
    executor: Arc<dyn CommandExecutor>,
    secrets: Arc<dyn SecretLister>,
    interrupt: Interrupt,
}

impl CommandRunner {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        secrets: Arc<dyn SecretLister>,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            executor,
            secrets,
            interrupt,
        }
    }

    /// Runs `commands` in order on a separate task, racing the interrupt.
    ///
    /// With `force` the first failure is returned as `Ok(Some(_))` after every
    /// command ran; without it the first failure is returned as `Err`.
    pub async fn run_commands(
        &self,
        commands: Vec<DeployCommand>,
        env: Vec<String>,
        force: bool,
    ) -> Result<Option<OktetoError>> {
        if commands.is_empty() {
            return Ok(None);
        }

        let executor = self.executor.clone();
        let mut task = tokio::spawn(async move {
            let mut first_err = None;
            for command in &commands {
                info!("Running '{}'", command.name);
                if let Err(e) = executor.execute(command, &env).await {
                    if !force {
                        return Err(e);
                    }
                    warn!("{}", e);
                    first_err.get_or_insert(e);
                }
            }
            Ok(first_err)
        });

        tokio::select! {
            biased;
            _ = self.interrupt.wait() => {
                task.abort();
                self.executor.clean_up(&OktetoError::Interrupted);
                Err(OktetoError::Interrupted)
            }
            joined = &mut task => match joined {
                Ok(result) => result,
                Err(e) => Err(OktetoError::command("destroy", format!("command task failed: {}", e))),
            }
        }
    }

    /// Uninstalls the Helm releases found in secrets matching `label_selector`.
    /// Same failure policy as [`CommandRunner::run_commands`].
    pub async fn destroy_helm_releases(
        &self,
        namespace: &str,
        label_selector: &str,
        env: Vec<String>,
        force: bool,
    ) -> Result<Option<OktetoError>> {
        let secrets = match self.secrets.list(namespace, label_selector).await {
            Ok(secrets) => secrets,
            Err(e) if force => {
                warn!("could not list helm releases: {}", e);
                return Ok(Some(e));
            }
            Err(e) => return Err(e),
        };

        let commands: Vec<_> = helm_releases(&secrets)
            .iter()
            .map(|release| uninstall_command(release))
            .collect();
        if !commands.is_empty() {
            info!("uninstalling {} helm release(s)", commands.len());
        }
        self.run_commands(commands, env, force).await
    }
}
