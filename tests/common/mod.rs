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

//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use okteto_destroy::domain::config::{DeployCommand, DivertInfo};
use okteto_destroy::domain::destroy::{
    ClusterDestroyer, Collaborators, CommandExecutor, ConfigMapStore,
    DeleteAllOptions, DependencyDestroyer, Destroyer, DivertDriver, EnvLookup, Interrupt,
    NamespaceInspector, OktetoApi, RemoteParams, RemoteRunner, SecretLister,
};
use okteto_destroy::{OktetoContext, OktetoError, Result};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Ordered record of every collaborator call
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    /// Position of the first entry starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }
}

pub struct FakeExecutor {
    pub log: CallLog,
    pub failing: HashSet<String>,
    /// Commands that never finish on their own
    pub hanging: HashSet<String>,
    pub envs: Mutex<Vec<Vec<String>>>,
}

impl FakeExecutor {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing: HashSet::new(),
            hanging: HashSet::new(),
            envs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn execute(&self, command: &DeployCommand, env: &[String]) -> Result<()> {
        self.log.push(format!("exec:{}", command.command));
        self.envs.lock().unwrap().push(env.to_vec());
        if self.hanging.contains(&command.command) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&command.command) {
            return Err(OktetoError::command(&command.name, "exit status 1"));
        }
        Ok(())
    }

    fn clean_up(&self, reason: &OktetoError) {
        self.log.push(format!("cleanup:{}", reason));
    }
}

#[derive(Default)]
pub struct FakeCluster {
    pub log: CallLog,
    pub fail_volumes: bool,
    pub fail_label: bool,
    /// Label deletion never finishes on its own
    pub hang_label: bool,
    pub volumes_destroyed: AtomicBool,
    pub resources_destroyed: AtomicBool,
}

#[async_trait]
impl ClusterDestroyer for FakeCluster {
    async fn destroy_with_label(&self, _namespace: &str, opts: &DeleteAllOptions) -> Result<()> {
        self.log.push(format!(
            "resources:{}:{}",
            opts.label_selector, opts.include_volumes
        ));
        if self.hang_label {
            std::future::pending::<()>().await;
        }
        if self.fail_label {
            return Err(OktetoError::KubeError("resources cannot be deleted".to_string()));
        }
        self.resources_destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy_stateful_volumes(
        &self,
        _namespace: &str,
        opts: &DeleteAllOptions,
    ) -> Result<()> {
        self.log.push(format!("volumes:{}", opts.include_volumes));
        if self.fail_volumes {
            return Err(OktetoError::KubeError("volumes cannot be deleted".to_string()));
        }
        self.volumes_destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSecrets {
    pub log: CallLog,
    pub secrets: Vec<Secret>,
    pub fail: bool,
}

#[async_trait]
impl SecretLister for FakeSecrets {
    async fn list(&self, _namespace: &str, label_selector: &str) -> Result<Vec<Secret>> {
        self.log.push(format!("secrets:{}", label_selector));
        if self.fail {
            return Err(OktetoError::KubeError("secrets cannot be listed".to_string()));
        }
        Ok(self.secrets.clone())
    }
}

/// Helm release secret as written by `helm install`
pub fn helm_secret(release: &str) -> Secret {
    let mut labels = BTreeMap::new();
    labels.insert("owner".to_string(), "helm".to_string());
    labels.insert("name".to_string(), release.to_string());
    Secret {
        metadata: ObjectMeta {
            name: Some(format!("sh.helm.release.v1.{}.v1", release)),
            labels: Some(labels),
            ..Default::default()
        },
        type_: Some("helm.sh/release.v1".to_string()),
        ..Default::default()
    }
}

/// ConfigMap store keyed by namespace and name
#[derive(Default)]
pub struct FakeConfigMapStore {
    pub log: CallLog,
    items: Mutex<BTreeMap<(String, String), ConfigMap>>,
    pub fail_updates: AtomicBool,
}

impl FakeConfigMapStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn insert(&self, namespace: &str, mut cm: ConfigMap) {
        cm.metadata.namespace = Some(namespace.to_string());
        let name = cm.metadata.name.clone().unwrap_or_default();
        self.items
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name), cm);
    }

    pub fn stored(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.items
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn stored_value(&self, namespace: &str, name: &str, key: &str) -> Option<String> {
        self.stored(namespace, name)
            .and_then(|cm| cm.data)
            .and_then(|data| data.get(key).cloned())
    }
}

fn status_of(cm: &ConfigMap) -> String {
    cm.data
        .as_ref()
        .and_then(|d| d.get("status").cloned())
        .unwrap_or_default()
}

#[async_trait]
impl ConfigMapStore for FakeConfigMapStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        Ok(self.stored(namespace, name))
    }

    async fn create(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap> {
        let name = cm.metadata.name.clone().unwrap_or_default();
        self.log.push(format!("status:{}", status_of(cm)));
        if self.stored(namespace, &name).is_some() {
            return Err(OktetoError::already_exists("ConfigMap", name, namespace));
        }
        self.insert(namespace, cm.clone());
        Ok(cm.clone())
    }

    async fn update(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(OktetoError::KubeError("status cannot be updated".to_string()));
        }
        self.log.push(format!("status:{}", status_of(cm)));
        self.insert(namespace, cm.clone());
        Ok(cm.clone())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.log.push("status:deleted");
        self.items
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn list(&self, namespace: &str, label_selector: &str) -> Result<Vec<ConfigMap>> {
        let selector = label_selector.split_once('=');
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .filter(|(_, cm)| match selector {
                None => true,
                Some((key, value)) => cm
                    .metadata
                    .labels
                    .as_ref()
                    .and_then(|l| l.get(key))
                    .is_some_and(|v| v == value),
            })
            .map(|(_, cm)| cm.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct FakeDependencies {
    pub log: CallLog,
    pub failing: HashSet<String>,
    /// Dependencies whose pipeline never reaches a final state
    pub hanging: HashSet<String>,
}

#[async_trait]
impl DependencyDestroyer for FakeDependencies {
    async fn destroy(&self, name: &str, namespace: &str, destroy_volumes: bool) -> Result<()> {
        self.log
            .push(format!("dependency:{}:{}:{}", name, namespace, destroy_volumes));
        if self.hanging.contains(name) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(name) {
            return Err(OktetoError::user("pipeline failed"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDivert {
    pub log: CallLog,
    pub fail: bool,
}

#[async_trait]
impl DivertDriver for FakeDivert {
    async fn destroy(&self, divert: &DivertInfo, namespace: &str) -> Result<()> {
        self.log
            .push(format!("divert:{}:{}", divert.namespace, namespace));
        if self.fail {
            return Err(OktetoError::Divert("virtual service not found".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRemote {
    pub log: CallLog,
    pub result: Mutex<Option<OktetoError>>,
    pub hang: bool,
    pub params: Mutex<Option<RemoteParams>>,
}

#[async_trait]
impl RemoteRunner for FakeRemote {
    async fn run(&self, params: RemoteParams) -> Result<()> {
        self.log.push(format!("remote:{}", params.name));
        *self.params.lock().unwrap() = Some(params);
        if self.hang {
            std::future::pending::<()>().await;
        }
        match self.result.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeOktetoApi {
    pub log: CallLog,
    pub fail_destroy_all: bool,
    pub fail_stream: bool,
}

#[async_trait]
impl OktetoApi for FakeOktetoApi {
    async fn destroy_all(&self, namespace: &str, destroy_volumes: bool) -> Result<()> {
        self.log
            .push(format!("destroy-all:{}:{}", namespace, destroy_volumes));
        if self.fail_destroy_all {
            return Err(OktetoError::Api("destroyAll refused".to_string()));
        }
        Ok(())
    }

    async fn destroy_pipeline(
        &self,
        name: &str,
        namespace: &str,
        destroy_volumes: bool,
    ) -> Result<()> {
        self.log
            .push(format!("destroy-pipeline:{}:{}:{}", name, namespace, destroy_volumes));
        Ok(())
    }

    async fn stream_destroy_all_logs(&self, namespace: &str) -> Result<()> {
        self.log.push(format!("logs:{}", namespace));
        if self.fail_stream {
            return Err(OktetoError::Api("connection reset".to_string()));
        }
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Returns the scripted namespace statuses in order, repeating the last one
pub struct FakeNamespaceInspector {
    statuses: Mutex<VecDeque<Option<String>>>,
}

impl FakeNamespaceInspector {
    pub fn new(statuses: &[Option<&str>]) -> Self {
        Self {
            statuses: Mutex::new(
                statuses
                    .iter()
                    .map(|s| s.map(str::to_string))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl NamespaceInspector for FakeNamespaceInspector {
    async fn status_label(&self, _namespace: &str) -> Result<Option<String>> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().flatten())
        } else {
            Ok(statuses.front().cloned().flatten())
        }
    }
}

/// Every collaborator of a [`Destroyer`], sharing one call log
pub struct Harness {
    pub log: CallLog,
    pub executor: FakeExecutor,
    pub cluster: FakeCluster,
    pub secrets: FakeSecrets,
    pub configmaps: Arc<FakeConfigMapStore>,
    pub dependencies: FakeDependencies,
    pub divert: FakeDivert,
    pub remote: FakeRemote,
    pub env: HashMap<String, String>,
}

pub struct Built {
    pub destroyer: Destroyer,
    pub configmaps: Arc<FakeConfigMapStore>,
    pub cluster: Arc<FakeCluster>,
    pub executor: Arc<FakeExecutor>,
    pub remote: Arc<FakeRemote>,
}

impl Harness {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            executor: FakeExecutor::new(log.clone()),
            cluster: FakeCluster {
                log: log.clone(),
                ..Default::default()
            },
            secrets: FakeSecrets {
                log: log.clone(),
                ..Default::default()
            },
            configmaps: Arc::new(FakeConfigMapStore::new(log.clone())),
            dependencies: FakeDependencies {
                log: log.clone(),
                ..Default::default()
            },
            divert: FakeDivert {
                log: log.clone(),
                ..Default::default()
            },
            remote: FakeRemote {
                log: log.clone(),
                ..Default::default()
            },
            env: HashMap::new(),
            log,
        }
    }

    pub fn build(self, interrupt: Interrupt) -> Built {
        let executor = Arc::new(self.executor);
        let cluster = Arc::new(self.cluster);
        let remote = Arc::new(self.remote);
        let collaborators = Collaborators {
            executor: executor.clone(),
            cluster: cluster.clone(),
            secrets: Arc::new(self.secrets),
            configmaps: self.configmaps.clone(),
            dependencies: Arc::new(self.dependencies),
            divert: Arc::new(self.divert),
            remote: remote.clone(),
        };
        let vars = self.env;
        let env: EnvLookup = Arc::new(move |key: &str| vars.get(key).cloned());
        Built {
            destroyer: Destroyer::with_env(context(), collaborators, interrupt, env),
            configmaps: self.configmaps,
            cluster,
            executor,
            remote,
        }
    }
}

pub fn context() -> OktetoContext {
    OktetoContext {
        name: "https://okteto.example.com".to_string(),
        namespace: "cindy".to_string(),
        token: "token".to_string(),
        is_okteto: true,
        ..Default::default()
    }
}
