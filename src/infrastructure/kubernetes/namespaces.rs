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

//! Label based deletion of the objects of an environment

use crate::domain::destroy::{ClusterDestroyer, DeleteAllOptions};
use crate::shared::error::{OktetoError, Result};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::api::{DeleteParams, DynamicObject, ListParams};
use kube::discovery::{verbs, Discovery, Scope};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info};

/// Discovery groups that commonly fail on clusters without a metrics server
const SKIPPED_GROUPS: [&str; 2] = ["metrics.k8s.io", "custom.metrics.k8s.io"];

pub struct NamespaceDestroyer {
    client: Client,
}

impl NamespaceDestroyer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// PVC name prefixes created by the claim templates of `sts`
pub fn statefulset_pvc_prefixes(sts: &StatefulSet) -> Vec<String> {
    let sts_name = sts.name_any();
    sts.spec
        .as_ref()
        .and_then(|spec| spec.volume_claim_templates.as_ref())
        .map(|templates| {
            templates
                .iter()
                .map(|t| format!("{}-{}-", t.name_any(), sts_name))
                .collect()
        })
        .unwrap_or_default()
}

fn ignore_not_found(result: std::result::Result<(), kube::Error>) -> Result<()> {
    match result {
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        other => Ok(other?),
    }
}

#[async_trait::async_trait]
impl ClusterDestroyer for NamespaceDestroyer {
    async fn destroy_with_label(&self, namespace: &str, opts: &DeleteAllOptions) -> Result<()> {
        let discovery = Discovery::new(self.client.clone())
            .exclude(&SKIPPED_GROUPS)
            .run()
            .await
            .map_err(|e| OktetoError::KubeError(format!("resource discovery failed: {}", e)))?;

        let lp = ListParams::default().labels(&opts.label_selector);
        let dp = DeleteParams::background();

        for group in discovery.groups() {
            for (ar, caps) in group.recommended_resources() {
                if caps.scope != Scope::Namespaced
                    || !caps.supports_operation(verbs::LIST)
                    || !caps.supports_operation(verbs::DELETE)
                {
                    continue;
                }
                if ar.kind == "PersistentVolumeClaim" && !opts.include_volumes {
                    continue;
                }

                let api: Api<DynamicObject> =
                    Api::namespaced_with(self.client.clone(), namespace, &ar);
                let objects = match api.list(&lp).await {
                    Ok(list) => list.items,
                    Err(kube::Error::Api(ae)) if ae.code == 404 || ae.code == 405 => continue,
                    Err(e) => return Err(e.into()),
                };

                for obj in objects {
                    let name = obj.name_any();
                    debug!("deleting {} '{}'", ar.kind, name);
                    ignore_not_found(api.delete(&name, &dp).await.map(|_| ()))?;
                }
            }
        }

        info!(
            "resources with label '{}' destroyed in namespace '{}'",
            opts.label_selector, namespace
        );
        Ok(())
    }

    async fn destroy_stateful_volumes(
        &self,
        namespace: &str,
        opts: &DeleteAllOptions,
    ) -> Result<()> {
        if !opts.include_volumes {
            return Ok(());
        }

        let statefulsets: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);

        let sts_list = statefulsets
            .list(&ListParams::default().labels(&opts.label_selector))
            .await?;
        let prefixes: Vec<String> = sts_list
            .items
            .iter()
            .flat_map(statefulset_pvc_prefixes)
            .collect();
        if prefixes.is_empty() {
            return Ok(());
        }

        for pvc in pvcs.list(&ListParams::default()).await?.items {
            let name = pvc.name_any();
            if prefixes.iter().any(|p| name.starts_with(p.as_str())) {
                debug!("destroying volume '{}'", name);
                ignore_not_found(
                    pvcs.delete(&name, &DeleteParams::default())
                        .await
                        .map(|_| ()),
                )?;
            }
        }
        Ok(())
    }
}
