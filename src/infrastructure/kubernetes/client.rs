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

use crate::domain::config::OktetoContext;
use crate::domain::destroy::{ConfigMapStore, NamespaceInspector, SecretLister};
use crate::infrastructure::constants::{FIELD_MANAGER, NAMESPACE_STATUS_LABEL};
use crate::shared::error::{OktetoError, Result};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Kubernetes client bound to the resolved Okteto context
#[derive(Clone)]
pub struct OktetoKubeClient {
    client: Client,
}

impl OktetoKubeClient {
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn get_client(&self) -> Client {
        self.client.clone()
    }

    /// Namespace of the selected kubeconfig context
    pub fn default_namespace(&self) -> String {
        self.client.default_namespace().to_string()
    }

    pub async fn new_with_config(ctx: &OktetoContext) -> Result<Self> {
        use kube::config::{KubeConfigOptions, Kubeconfig};

        let kubeconfig = if let Some(path) = ctx.kubeconfig.as_ref() {
            Kubeconfig::read_from(path).map_err(|e| {
                OktetoError::KubeError(format!("Failed to load kubeconfig: {}", e))
            })?
        } else {
            Kubeconfig::read().map_err(|e| {
                OktetoError::KubeError(format!("Failed to load kubeconfig: {}", e))
            })?
        };

        let config_options = KubeConfigOptions {
            context: ctx.kube_context.clone(),
            cluster: None,
            user: None,
        };

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &config_options)
            .await
            .map_err(|e| {
                OktetoError::KubeError(format!("Failed to create Kubernetes config: {}", e))
            })?;

        let client = Client::try_from(config).map_err(|e| {
            OktetoError::KubeError(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self { client })
    }

    fn configmaps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

fn configmap_name(cm: &ConfigMap) -> Result<&str> {
    cm.metadata
        .name
        .as_deref()
        .ok_or_else(|| OktetoError::config_error("ConfigMap name is required"))
}

/// Maps API errors on a named object to errors carrying its identity
fn object_error(err: kube::Error, kind: &str, name: &str, namespace: &str) -> OktetoError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => OktetoError::not_found(kind, name, namespace),
        kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
            OktetoError::already_exists(kind, name, namespace)
        }
        kube::Error::Api(ae) if ae.code == 409 => OktetoError::Conflict {
            resource_type: kind.to_string(),
            name: name.to_string(),
        },
        other => OktetoError::KubeError(other.to_string()),
    }
}

#[async_trait::async_trait]
impl ConfigMapStore for OktetoKubeClient {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        self.configmaps(namespace)
            .get_opt(name)
            .await
            .map_err(|e| object_error(e, "ConfigMap", name, namespace))
    }

    async fn create(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap> {
        let name = configmap_name(cm)?;
        self.configmaps(namespace)
            .create(&post_params(), cm)
            .await
            .map_err(|e| object_error(e, "ConfigMap", name, namespace))
    }

    async fn update(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap> {
        let name = configmap_name(cm)?;
        self.configmaps(namespace)
            .replace(name, &post_params(), cm)
            .await
            .map_err(|e| object_error(e, "ConfigMap", name, namespace))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .configmaps(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!("configmap '{}' already deleted", name);
                Ok(())
            }
            Err(e) => Err(object_error(e, "ConfigMap", name, namespace)),
        }
    }

    async fn list(&self, namespace: &str, label_selector: &str) -> Result<Vec<ConfigMap>> {
        let mut lp = ListParams::default();
        if !label_selector.is_empty() {
            lp = lp.labels(label_selector);
        }
        Ok(self.configmaps(namespace).list(&lp).await?.items)
    }
}

#[async_trait::async_trait]
impl SecretLister for OktetoKubeClient {
    async fn list(&self, namespace: &str, label_selector: &str) -> Result<Vec<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(label_selector);
        Ok(api.list(&lp).await?.items)
    }
}

#[async_trait::async_trait]
impl NamespaceInspector for OktetoKubeClient {
    async fn status_label(&self, namespace: &str) -> Result<Option<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let ns = api
            .get(namespace)
            .await
            .map_err(|e| object_error(e, "Namespace", namespace, ""))?;
        Ok(ns
            .metadata
            .labels
            .and_then(|mut labels| labels.remove(NAMESPACE_STATUS_LABEL)))
    }
}
