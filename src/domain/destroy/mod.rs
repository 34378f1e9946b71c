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

//! Destroy core
//!
//! The orchestrators in this module only talk to the outside world through
//! the capability traits below. Production adapters live in
//! `crate::infrastructure`; tests provide in-memory fakes.

pub mod all;
pub mod commands;
pub mod decision;
pub mod helm;
pub mod interrupt;
pub mod local;
pub mod remote;
pub mod remote_run;
pub mod status;

use crate::domain::config::{DeployCommand, DivertInfo};
use crate::domain::variables::DeployVariable;
use crate::shared::error::{OktetoError, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use std::path::PathBuf;

pub use self::all::{DestroyAll, DestroyAllTimings, NamespaceInspector, OktetoApi};
pub use self::commands::{command_env, CommandRunner};
pub use self::decision::should_run_in_remote;
pub use self::interrupt::{Interrupt, InterruptTrigger};
pub use self::local::{process_env, resolve_name, Collaborators, Destroyer, EnvLookup};
pub use self::remote::{RemoteParams, RemoteRunner};
pub use self::remote_run::{Deployable, RemoteRun, RemoteRunOptions};
pub use self::status::{CfgData, DestroyStatus, StatusHandler};

/// Input of a single destroy invocation
#[derive(Debug, Clone, Default)]
pub struct DestroyOptions {
    /// Environment name. Empty means "resolve from the manifest or the repository".
    pub name: String,
    /// Empty means the context namespace
    pub namespace: String,
    pub manifest_path_flag: Option<String>,
    pub variables: Vec<DeployVariable>,
    pub destroy_volumes: bool,
    pub force_destroy: bool,
    pub destroy_dependencies: bool,
    /// `Some(_)` only when `--remote` was given on the command line
    pub run_in_remote: Option<bool>,
    /// Repository root. Name inference and `destroy.context` start from here.
    pub working_dir: PathBuf,
}

/// Selector and volume policy shared by the cluster deletion phases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteAllOptions {
    pub label_selector: String,
    pub include_volumes: bool,
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs `command` with `env` (`NAME=VALUE` entries) added to the process environment.
    async fn execute(&self, command: &DeployCommand, env: &[String]) -> Result<()>;

    /// Stops whatever `execute` is currently running.
    fn clean_up(&self, reason: &OktetoError);
}

#[async_trait]
pub trait ClusterDestroyer: Send + Sync {
    async fn destroy_with_label(&self, namespace: &str, opts: &DeleteAllOptions) -> Result<()>;

    async fn destroy_stateful_volumes(&self, namespace: &str, opts: &DeleteAllOptions)
        -> Result<()>;
}

#[async_trait]
pub trait SecretLister: Send + Sync {
    async fn list(&self, namespace: &str, label_selector: &str) -> Result<Vec<Secret>>;
}

/// Raw access to the ConfigMaps backing the status store
#[async_trait]
pub trait ConfigMapStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>>;

    async fn create(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap>;

    async fn update(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap>;

    /// Deleting a missing ConfigMap succeeds.
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;

    async fn list(&self, namespace: &str, label_selector: &str) -> Result<Vec<ConfigMap>>;
}

#[async_trait]
pub trait DependencyDestroyer: Send + Sync {
    async fn destroy(&self, name: &str, namespace: &str, destroy_volumes: bool) -> Result<()>;
}

#[async_trait]
pub trait DivertDriver: Send + Sync {
    /// Removes the routing rules that divert traffic from `divert.namespace` into `namespace`.
    async fn destroy(&self, divert: &DivertInfo, namespace: &str) -> Result<()>;
}
