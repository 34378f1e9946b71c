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

//! Remote destroy through `docker buildx`

use super::dockerfile::render_dockerfile;
use crate::domain::config::OktetoContext;
use crate::domain::destroy::{Deployable, EnvLookup, RemoteParams, RemoteRunner};
use crate::infrastructure::constants::{
    BUILDX_BUILDER_PREFIX, ENV_ACTION_NAME, ENV_BUILDKIT_HOST, ENV_CONTEXT, ENV_DEPLOYABLE,
    ENV_GIT_BRANCH, ENV_GIT_COMMIT, ENV_INVALIDATE_CACHE, ENV_NAMESPACE, ENV_SSH_AUTH_SOCK,
    ENV_TOKEN, REMOTE_DOCKERFILE_NAME,
};
use crate::shared::error::{OktetoError, Result};
use crate::shared::format::resource_k8s_meta_string;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Structured log line written by `okteto remote-run --log-output=json`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JsonLogLine {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub message: String,
}

/// buildx builder registered for a BuildKit endpoint (`tcp://buildkit.example.com:443`)
pub fn builder_name(url: &str) -> String {
    let host = url.split_once("://").map_or(url, |(_, rest)| rest);
    format!("{}{}", BUILDX_BUILDER_PREFIX, resource_k8s_meta_string(host))
}

/// Finds a JSON log line inside a builder output line (`#8 0.31 {...}`).
pub fn parse_build_line(line: &str) -> Option<JsonLogLine> {
    let start = line.find('{')?;
    serde_json::from_str(&line[start..]).ok()
}

pub struct DockerRunner {
    context: OktetoContext,
    env: EnvLookup,
    home: Option<PathBuf>,
}

impl DockerRunner {
    pub fn new(context: OktetoContext, env: EnvLookup) -> Self {
        let home = env("HOME").map(PathBuf::from);
        Self { context, env, home }
    }

    fn build_args(&self, params: &RemoteParams, deployable: String) -> Vec<(String, String)> {
        let env = |key: &str| (self.env)(key).unwrap_or_default();
        vec![
            (ENV_CONTEXT.to_string(), self.context.name.clone()),
            (ENV_NAMESPACE.to_string(), params.namespace.clone()),
            (ENV_TOKEN.to_string(), self.context.token.clone()),
            (ENV_ACTION_NAME.to_string(), env(ENV_ACTION_NAME)),
            (ENV_DEPLOYABLE.to_string(), deployable),
            (ENV_GIT_COMMIT.to_string(), env(ENV_GIT_COMMIT)),
            (ENV_GIT_BRANCH.to_string(), env(ENV_GIT_BRANCH)),
            (
                ENV_INVALIDATE_CACHE.to_string(),
                uuid::Uuid::new_v4().to_string(),
            ),
        ]
    }

    /// `--builder` selection. Without a context builder the local default one is used.
    fn builder_args(&self) -> Vec<String> {
        if self.context.builder.is_empty() {
            return Vec::new();
        }
        vec!["--builder".to_string(), builder_name(&self.context.builder)]
    }

    /// Registers the context builder as a buildx `remote` driver unless it already exists.
    async fn ensure_builder(&self) -> Result<()> {
        let url = &self.context.builder;
        if url.is_empty() {
            debug!("context has no builder, using the default buildx builder");
            return Ok(());
        }
        let name = builder_name(url);
        let known = Command::new("docker")
            .args(["buildx", "inspect", &name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);
        if known {
            return Ok(());
        }

        debug!("registering builder '{}' for {}", name, url);
        let output = Command::new("docker")
            .args(["buildx", "create", "--name", &name, "--driver", "remote", url])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| OktetoError::user(format!("failed to start docker buildx: {}", e)))?;
        if !output.status.success() {
            return Err(OktetoError::User {
                message: format!(
                    "could not register the builder {}: {}",
                    url,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                hint: Some("check that docker buildx is installed".to_string()),
            });
        }
        Ok(())
    }

    fn ssh_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let Some(sock) = (self.env)(ENV_SSH_AUTH_SOCK).filter(|s| !s.is_empty()) else {
            debug!("no ssh agent found, not mounting it for the build");
            return args;
        };
        if Path::new(&sock).exists() {
            args.push("--ssh".to_string());
            args.push(format!("remote={}", sock));
        } else {
            debug!("not mounting ssh agent, socket {} not found", sock);
        }

        if let Some(known_hosts) = self
            .home
            .as_ref()
            .map(|h| h.join(".ssh").join("known_hosts"))
            .filter(|p| p.exists())
        {
            debug!("reading known hosts from {}", known_hosts.display());
            args.push("--secret".to_string());
            args.push(format!("id=known_hosts,src={}", known_hosts.display()));
        }
        args
    }
}

#[async_trait::async_trait]
impl RemoteRunner for DockerRunner {
    async fn run(&self, params: RemoteParams) -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let dockerfile = tmp.path().join(REMOTE_DOCKERFILE_NAME);
        tokio::fs::write(&dockerfile, render_dockerfile(&params)?).await?;

        let deployable = Deployable {
            commands: params.commands.clone(),
        }
        .encode()?;

        self.ensure_builder().await?;

        let mut cmd = Command::new("docker");
        cmd.arg("buildx")
            .arg("build")
            .args(self.builder_args())
            .arg("--file")
            .arg(&dockerfile)
            .arg("--output")
            .arg("type=cacheonly")
            .arg("--progress")
            .arg("plain");
        for (key, value) in self.build_args(&params, deployable) {
            cmd.arg("--build-arg").arg(format!("{}={}", key, value));
        }
        if !self.context.builder.is_empty() {
            cmd.env(ENV_BUILDKIT_HOST, &self.context.builder);
        }
        cmd.args(self.ssh_args())
            .arg(&params.context_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(
            "running destroy of '{}' remotely with image {}",
            params.name, params.base_image
        );
        let mut child = cmd
            .spawn()
            .map_err(|e| OktetoError::user(format!("failed to start docker buildx: {}", e)))?;

        let mut failed_stage: Option<JsonLogLine> = None;
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_build_line(&line) {
                    Some(log) if log.level == "error" => {
                        eprintln!("{}", log.message);
                        failed_stage = Some(log);
                    }
                    Some(log) => println!("{}", log.message),
                    None => debug!("{}", line),
                }
            }
        }

        let status = child.wait().await?;
        if status.success() {
            return Ok(());
        }

        match failed_stage {
            Some(log) => Err(OktetoError::BuildStage {
                stage: log.stage,
                message: log.message,
            }),
            None => Err(OktetoError::command(
                "docker buildx build",
                match status.code() {
                    Some(code) => format!("exit status {}", code),
                    None => "terminated by signal".to_string(),
                },
            )),
        }
    }
}
