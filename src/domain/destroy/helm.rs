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

//! Discovery of Helm releases installed by an environment

use crate::domain::config::DeployCommand;
use crate::infrastructure::constants::{HELM_OWNER, HELM_SECRET_TYPE, NAME_LABEL, OWNER_LABEL};
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeSet;

/// Release names stored in Helm-owned release secrets, sorted and deduplicated.
pub fn helm_releases(secrets: &[Secret]) -> BTreeSet<String> {
    secrets
        .iter()
        .filter(|s| s.type_.as_deref() == Some(HELM_SECRET_TYPE))
        .filter_map(|s| s.metadata.labels.as_ref())
        .filter(|labels| labels.get(OWNER_LABEL).map(String::as_str) == Some(HELM_OWNER))
        .filter_map(|labels| labels.get(NAME_LABEL).cloned())
        .collect()
}

pub fn uninstall_command(release: &str) -> DeployCommand {
    DeployCommand::new(format!("helm uninstall {}", release))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn secret(type_: &str, labels: &[(&str, &str)]) -> Secret {
        Secret {
            type_: Some(type_.to_string()),
            metadata: ObjectMeta {
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_helm_releases_filters_and_dedups() {
        let secrets = vec![
            secret(HELM_SECRET_TYPE, &[("owner", "helm"), ("name", "movies")]),
            secret(HELM_SECRET_TYPE, &[("owner", "helm"), ("name", "movies")]),
            secret(HELM_SECRET_TYPE, &[("owner", "helm"), ("name", "api")]),
            secret(HELM_SECRET_TYPE, &[("owner", "helm")]),
            secret(HELM_SECRET_TYPE, &[("owner", "someone"), ("name", "db")]),
            secret("Opaque", &[("owner", "helm"), ("name", "frontend")]),
        ];
        let releases: Vec<_> = helm_releases(&secrets).into_iter().collect();
        assert_eq!(releases, vec!["api", "movies"]);
    }

    #[test]
    fn test_uninstall_command() {
        let cmd = uninstall_command("movies");
        assert_eq!(cmd.name, "helm uninstall movies");
        assert_eq!(cmd.command, "helm uninstall movies");
    }
}
