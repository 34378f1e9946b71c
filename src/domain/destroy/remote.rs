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

//! Remote execution of the destroy commands

use crate::domain::config::DeployCommand;
use crate::domain::variables::DeployVariable;
use crate::infrastructure::constants::{
    CLI_IMAGE_REPOSITORY, ENV_REMOTE_CLI_IMAGE, PIPELINE_RUNNER_IMAGE,
};
use crate::shared::error::{OktetoError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use tracing::info;

/// Dockerfile used to run the destroy commands inside the cluster
pub const DOCKERFILE_TEMPLATE: &str = r#"
FROM {{ cli_image }} as okteto-cli

FROM {{ base_image }} as runner

ENV PATH="${PATH}:/okteto/bin"
COPY --from=okteto-cli /usr/local/bin/* /okteto/bin/

ENV {{ remote_env }} true

ARG {{ namespace_arg }}
ARG {{ context_arg }}
ARG {{ token_arg }}
ARG {{ action_name_arg }}
ARG {{ deployable_arg }}

COPY . /okteto/src
WORKDIR /okteto/src

ARG {{ git_commit_arg }}
ARG {{ git_branch_arg }}
ARG {{ invalidate_cache_arg }}

RUN --mount=type=secret,id=known_hosts --mount=id=remote,type=ssh \
  mkdir -p $HOME/.ssh && echo "UserKnownHostsFile=/run/secrets/known_hosts" >> $HOME/.ssh/config && \
  okteto remote-run {{ command }} --log-output=json {{ flags }}
"#;

/// Everything a remote runner needs to run the destroy commands remotely
#[derive(Debug, Clone, Default)]
pub struct RemoteParams {
    pub name: String,
    pub namespace: String,
    pub base_image: String,
    pub cli_image: String,
    pub command_flags: Vec<String>,
    pub commands: Vec<DeployCommand>,
    pub manifest_path_flag: Option<String>,
    /// Build context sent to the builder
    pub context_dir: PathBuf,
    pub dockerfile_template: String,
}

#[async_trait]
pub trait RemoteRunner: Send + Sync {
    async fn run(&self, params: RemoteParams) -> Result<()>;
}

/// Flags passed to the remote `okteto remote-run destroy`
pub fn command_flags(name: &str, force_destroy: bool, variables: &[DeployVariable]) -> Vec<String> {
    let mut flags = Vec::new();
    if !name.is_empty() {
        flags.push(format!("--name \"{}\"", name));
    }
    if force_destroy {
        flags.push("--force-destroy".to_string());
    }
    if !variables.is_empty() {
        let vars = variables
            .iter()
            .map(|v| format!("--var {}=\"{}\"", v.name, v.value))
            .collect::<Vec<_>>()
            .join(" ");
        flags.push(vars);
    }
    flags
}

pub fn base_image(destroy_image: Option<&str>) -> String {
    destroy_image
        .filter(|i| !i.is_empty())
        .unwrap_or(PIPELINE_RUNNER_IMAGE)
        .to_string()
}

/// Image providing the okteto binary for the given CLI version
pub fn cli_image(version: &str, env: &dyn Fn(&str) -> Option<String>) -> String {
    let is_release = Regex::new(r"\d+\.\d+\.\d+")
        .map(|re| re.is_match(version))
        .unwrap_or(false);
    if is_release {
        return format!("{}:{}", CLI_IMAGE_REPOSITORY, version);
    }
    info!("invalid okteto CLI version {}, using latest", version);
    env(ENV_REMOTE_CLI_IMAGE)
        .filter(|i| !i.is_empty())
        .unwrap_or_else(|| format!("{}:latest", CLI_IMAGE_REPOSITORY))
}

/// Maps a remote runner failure to what the user sees.
pub fn classify_remote_error(err: OktetoError) -> OktetoError {
    match err {
        OktetoError::Interrupted => OktetoError::Interrupted,
        OktetoError::BuildStage { stage, message } => {
            info!("remote destroy failed at stage '{}'", stage);
            OktetoError::User {
                message: format!(
                    "error during development environment deployment: {}",
                    message
                ),
                hint: Some(format!("the remote execution failed at stage '{}'", stage)),
            }
        }
        user @ OktetoError::User { .. } => user,
        other => OktetoError::user(format!(
            "error during destroy of the development environment: {}",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_flags() {
        let flags = command_flags(
            "movies",
            true,
            &[DeployVariable::new("a", "b"), DeployVariable::new("c", "d")],
        );
        assert_eq!(
            flags,
            vec![
                "--name \"movies\"".to_string(),
                "--force-destroy".to_string(),
                "--var a=\"b\" --var c=\"d\"".to_string(),
            ]
        );
        assert!(command_flags("", false, &[]).is_empty());
    }

    #[test]
    fn test_base_image() {
        assert_eq!(base_image(None), PIPELINE_RUNNER_IMAGE);
        assert_eq!(base_image(Some("")), PIPELINE_RUNNER_IMAGE);
        assert_eq!(base_image(Some("okteto/kubectl")), "okteto/kubectl");
    }

    #[test]
    fn test_cli_image() {
        let no_env = |_: &str| None;
        assert_eq!(cli_image("3.4.0", &no_env), "okteto/okteto:3.4.0");
        assert_eq!(cli_image("dev", &no_env), "okteto/okteto:latest");
        let env = |key: &str| (key == ENV_REMOTE_CLI_IMAGE).then(|| "my/okteto:dev".to_string());
        assert_eq!(cli_image("dev", &env), "my/okteto:dev");
    }

    #[test]
    fn test_classify_remote_error() {
        let err = classify_remote_error(OktetoError::BuildStage {
            stage: "helm uninstall".to_string(),
            message: "exit code 1".to_string(),
        });
        match err {
            OktetoError::User { message, hint } => {
                assert_eq!(
                    message,
                    "error during development environment deployment: exit code 1"
                );
                assert!(hint.unwrap().contains("helm uninstall"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let user = classify_remote_error(OktetoError::user("bad manifest"));
        assert_eq!(user.to_string(), "bad manifest");

        let opaque = classify_remote_error(OktetoError::Api("boom".to_string()));
        assert_eq!(
            opaque.to_string(),
            "error during destroy of the development environment: Okteto API error: boom"
        );

        assert!(classify_remote_error(OktetoError::Interrupted).is_interrupted());
    }
}
