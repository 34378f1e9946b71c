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

//! Divert drivers

use crate::domain::config::DivertInfo;
use crate::domain::destroy::DivertDriver;
use crate::infrastructure::constants::{
    DIVERT_ANNOTATION_PREFIX, DIVERT_DRIVER_ISTIO, DIVERT_DRIVER_NGINX, DIVERT_HEADER_NAME,
    DIVERT_UPDATE_RETRIES, FIELD_MANAGER,
};
use crate::shared::error::{OktetoError, Result};
use backon::{BackoffBuilder, ExponentialBuilder};
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::Value;
use tracing::{debug, info};

/// Dispatches to the driver named in the divert configuration
pub struct DivertDrivers {
    client: Client,
}

impl DivertDrivers {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl DivertDriver for DivertDrivers {
    async fn destroy(&self, divert: &DivertInfo, namespace: &str) -> Result<()> {
        match divert.driver.as_str() {
            "" | DIVERT_DRIVER_NGINX => {
                info!("divert driver '{}' has nothing to tear down", DIVERT_DRIVER_NGINX);
                Ok(())
            }
            DIVERT_DRIVER_ISTIO => IstioDriver::new(self.client.clone())
                .destroy(divert, namespace)
                .await
                .map_err(|e| match e {
                    OktetoError::Divert(_) => e,
                    other => OktetoError::Divert(other.to_string()),
                }),
            other => Err(OktetoError::Divert(format!(
                "unknown divert driver '{}'",
                other
            ))),
        }
    }
}

pub struct IstioDriver {
    client: Client,
}

impl IstioDriver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn virtual_services(&self, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk("networking.istio.io", "v1beta1", "VirtualService");
        let ar = ApiResource::from_gvk(&gvk);
        Api::namespaced_with(self.client.clone(), namespace, &ar)
    }

    async fn destroy(&self, divert: &DivertInfo, namespace: &str) -> Result<()> {
        let api = self.virtual_services(&divert.namespace);
        let names: Vec<String> = if selects_all(&divert.virtual_services) {
            api.list(&ListParams::default())
                .await?
                .items
                .iter()
                .map(|vs| vs.name_any())
                .collect()
        } else {
            divert.virtual_services.clone()
        };

        for name in names {
            self.restore(&api, &name, namespace).await?;
        }
        Ok(())
    }

    /// Removes the divert routes of `namespace` from one VirtualService, retrying on conflicts.
    async fn restore(&self, api: &Api<DynamicObject>, name: &str, namespace: &str) -> Result<()> {
        let mut backoff = ExponentialBuilder::default()
            .with_max_times(DIVERT_UPDATE_RETRIES)
            .build();

        loop {
            let Some(mut vs) = api.get_opt(name).await? else {
                debug!("virtual service '{}' not found", name);
                return Ok(());
            };
            if !remove_divert(&mut vs, namespace) {
                return Ok(());
            }

            let pp = PostParams {
                field_manager: Some(FIELD_MANAGER.to_string()),
                ..Default::default()
            };
            match api.replace(name, &pp, &vs).await {
                Ok(_) => {
                    info!("divert routes of '{}' removed from virtual service '{}'", namespace, name);
                    return Ok(());
                }
                Err(kube::Error::Api(ae)) if ae.code == 409 => match backoff.next() {
                    Some(delay) => {
                        debug!("conflict updating virtual service '{}', retrying", name);
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        return Err(OktetoError::Divert(format!(
                            "could not update virtual service '{}': {}",
                            name, ae.message
                        )))
                    }
                },
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn selects_all(virtual_services: &[String]) -> bool {
    virtual_services.is_empty() || virtual_services.iter().any(|v| v == "*")
}

/// Drops the divert annotation and the HTTP routes matching the divert
/// header of `namespace`. Returns whether the object changed.
pub fn remove_divert(vs: &mut DynamicObject, namespace: &str) -> bool {
    let annotation = format!("{}{}", DIVERT_ANNOTATION_PREFIX, namespace);
    let mut changed = vs.annotations_mut().remove(&annotation).is_some();

    if let Some(routes) = vs
        .data
        .get_mut("spec")
        .and_then(|spec| spec.get_mut("http"))
        .and_then(Value::as_array_mut)
    {
        let before = routes.len();
        routes.retain(|route| !is_divert_route(route, namespace));
        changed |= routes.len() != before;
    }
    changed
}

fn is_divert_route(route: &Value, namespace: &str) -> bool {
    route
        .get("match")
        .and_then(Value::as_array)
        .is_some_and(|matches| {
            matches.iter().any(|m| {
                m.get("headers")
                    .and_then(|h| h.get(DIVERT_HEADER_NAME))
                    .and_then(|h| h.get("exact"))
                    .and_then(Value::as_str)
                    == Some(namespace)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn virtual_service() -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "networking.istio.io/v1beta1",
            "kind": "VirtualService",
            "metadata": {
                "name": "frontend",
                "namespace": "staging",
                "annotations": {
                    "divert.okteto.com/cindy": "{}",
                    "divert.okteto.com/bob": "{}"
                }
            },
            "spec": {
                "http": [
                    {
                        "match": [{"headers": {"okteto-divert": {"exact": "cindy"}}}],
                        "route": [{"destination": {"host": "frontend.cindy.svc.cluster.local"}}]
                    },
                    {
                        "match": [{"headers": {"okteto-divert": {"exact": "bob"}}}],
                        "route": [{"destination": {"host": "frontend.bob.svc.cluster.local"}}]
                    },
                    {
                        "route": [{"destination": {"host": "frontend"}}]
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_remove_divert_routes() {
        let mut vs = virtual_service();
        assert!(remove_divert(&mut vs, "cindy"));

        let routes = vs.data["spec"]["http"].as_array().unwrap();
        assert_eq!(routes.len(), 2);
        assert!(!vs.annotations().contains_key("divert.okteto.com/cindy"));
        assert!(vs.annotations().contains_key("divert.okteto.com/bob"));

        // second pass has nothing to do
        assert!(!remove_divert(&mut vs, "cindy"));
    }

    #[test]
    fn test_selects_all() {
        assert!(selects_all(&[]));
        assert!(selects_all(&["*".to_string()]));
        assert!(!selects_all(&["frontend".to_string()]));
    }
}
