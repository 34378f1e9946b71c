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

//! In-container side of a remote destroy
//!
//! The remote image runs `okteto remote-run destroy`, which receives the
//! destroy commands through the `OKTETO_DEPLOYABLE` build argument and runs
//! the command and Helm phases with the local failure policy.

use super::commands::{command_env, CommandRunner};
use crate::domain::config::DeployCommand;
use crate::domain::variables::DeployVariable;
use crate::infrastructure::constants::DEPLOYED_BY_LABEL;
use crate::shared::error::{OktetoError, Result};
use crate::shared::format::resource_k8s_meta_string;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Payload shipped to the remote runner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployable {
    #[serde(default)]
    pub commands: Vec<DeployCommand>,
}

impl Deployable {
    pub fn encode(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(STANDARD.encode(yaml))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        if encoded.trim().is_empty() {
            return Ok(Self::default());
        }
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            OktetoError::config_error(format!("invalid deployable payload: {}", e))
        })?;
        Ok(serde_yaml::from_slice(&bytes)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RemoteRunOptions {
    pub name: String,
    pub namespace: String,
    pub context: String,
    pub force_destroy: bool,
    pub variables: Vec<DeployVariable>,
}

pub struct RemoteRun {
    runner: CommandRunner,
}

impl RemoteRun {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    pub async fn run(&self, opts: &RemoteRunOptions, deployable: Deployable) -> Result<()> {
        if opts.name.is_empty() {
            return Err(OktetoError::Resolution(
                "the '--name' flag is required".to_string(),
            ));
        }

        let env = command_env(&opts.name, &opts.namespace, &opts.context, &opts.variables);
        let mut forced_err = self
            .runner
            .run_commands(deployable.commands, env.clone(), opts.force_destroy)
            .await?;

        let selector = format!(
            "{}={}",
            DEPLOYED_BY_LABEL,
            resource_k8s_meta_string(&opts.name)
        );
        info!("checking helm releases with label '{}'", selector);
        let helm_err = self
            .runner
            .destroy_helm_releases(&opts.namespace, &selector, env, opts.force_destroy)
            .await?;
        if forced_err.is_none() {
            forced_err = helm_err;
        }

        match forced_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
