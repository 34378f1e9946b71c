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

//! ConfigMap backed status record of a destroy operation

use super::ConfigMapStore;
use crate::domain::variables::{decode_variables, DeployVariable};
use crate::infrastructure::constants::{
    DEFAULT_ACTION_NAME, FIELD_ACTION_LOCK, FIELD_ERROR, FIELD_STATUS, FIELD_VARIABLES,
};
use crate::infrastructure::kubernetes::resources::configmap::{
    status_configmap_name, touch, ConfigMapBuilder,
};
use crate::shared::error::{OktetoError, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Status stored in the record. A destroyed environment has no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyStatus {
    Progressing,
    Deployed,
    Destroying,
    Error,
}

impl DestroyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestroyStatus::Progressing => "progressing",
            DestroyStatus::Deployed => "deployed",
            DestroyStatus::Destroying => "destroying",
            DestroyStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "progressing" => Some(DestroyStatus::Progressing),
            "deployed" => Some(DestroyStatus::Deployed),
            "destroying" => Some(DestroyStatus::Destroying),
            "error" => Some(DestroyStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for DestroyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data written to the record
#[derive(Debug, Clone, PartialEq)]
pub struct CfgData {
    pub name: String,
    pub namespace: String,
    pub status: DestroyStatus,
    pub filename: Option<String>,
    pub variables: Vec<DeployVariable>,
}

pub struct StatusHandler {
    store: Arc<dyn ConfigMapStore>,
    action_name: String,
}

impl StatusHandler {
    pub fn new(store: Arc<dyn ConfigMapStore>, action_name: Option<String>) -> Self {
        Self {
            store,
            action_name: action_name
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| DEFAULT_ACTION_NAME.to_string()),
        }
    }

    pub fn store(&self) -> Arc<dyn ConfigMapStore> {
        self.store.clone()
    }

    /// Variables stored by a previous deploy of `name`
    pub async fn get_variables(&self, namespace: &str, name: &str) -> Result<Vec<DeployVariable>> {
        let cm = self
            .store
            .get(namespace, &status_configmap_name(name))
            .await?;
        match cm
            .and_then(|cm| cm.data)
            .and_then(|mut data| data.remove(FIELD_VARIABLES))
        {
            Some(encoded) => decode_variables(&encoded),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_status(&self, namespace: &str, name: &str) -> Result<Option<DestroyStatus>> {
        let cm = self
            .store
            .get(namespace, &status_configmap_name(name))
            .await?;
        Ok(cm
            .and_then(|cm| cm.data)
            .and_then(|data| data.get(FIELD_STATUS).and_then(|s| DestroyStatus::parse(s))))
    }

    /// Creates the record, or updates the existing one, with `data`.
    pub async fn translate_and_deploy(&self, data: &CfgData) -> Result<ConfigMap> {
        let builder = ConfigMapBuilder::new(data, self.action_name.clone());
        let name = status_configmap_name(&data.name);

        match self.store.get(&data.namespace, &name).await? {
            None => {
                debug!("creating status configmap '{}'", name);
                let cm = builder.build()?;
                self.store
                    .create(&data.namespace, &cm)
                    .await
                    .map_err(lock_error)
            }
            Some(mut cm) => {
                self.check_lock(&cm)?;
                debug!("updating status configmap '{}'", name);
                builder.apply(&mut cm)?;
                self.store
                    .update(&data.namespace, &cm)
                    .await
                    .map_err(lock_error)
            }
        }
    }

    /// Writes the `error` status and `message` into the record.
    pub async fn record_error(&self, cfg: &ConfigMap, message: &str) -> Result<()> {
        let mut cm = cfg.clone();
        let data = cm.data.get_or_insert_with(Default::default);
        data.insert(
            FIELD_STATUS.to_string(),
            DestroyStatus::Error.as_str().to_string(),
        );
        data.insert(FIELD_ERROR.to_string(), message.to_string());
        touch(&mut cm);

        let namespace = cm.metadata.namespace.clone().unwrap_or_default();
        self.store.update(&namespace, &cm).await?;
        Ok(())
    }

    /// Marks the record as failed.
    ///
    /// Status-write failures shadow phase failures: when the record cannot be
    /// updated the write error is returned, otherwise `cause` is returned.
    pub async fn set_error_status(&self, cfg: &ConfigMap, cause: OktetoError) -> OktetoError {
        match self.record_error(cfg, &cause.to_string()).await {
            Ok(()) => cause,
            Err(write_err) => {
                warn!(
                    "could not record error status ({}); original error: {}",
                    write_err, cause
                );
                write_err
            }
        }
    }

    /// Removes the record. A missing record is not an error.
    pub async fn destroy(&self, cfg: &ConfigMap) -> Result<()> {
        let name = cfg.metadata.name.clone().unwrap_or_default();
        let namespace = cfg.metadata.namespace.clone().unwrap_or_default();
        match self.store.delete(&namespace, &name).await {
            Err(e) if !e.is_not_found() => Err(e),
            _ => Ok(()),
        }
    }

    fn check_lock(&self, cm: &ConfigMap) -> Result<()> {
        let lock = cm
            .data
            .as_ref()
            .and_then(|d| d.get(FIELD_ACTION_LOCK))
            .filter(|l| !l.is_empty());
        match lock {
            Some(lock) if *lock != self.action_name => Err(OktetoError::OperationRunning),
            _ => Ok(()),
        }
    }
}

fn lock_error(err: OktetoError) -> OktetoError {
    match err {
        OktetoError::AlreadyExists { .. } | OktetoError::Conflict { .. } => {
            OktetoError::OperationRunning
        }
        other => other,
    }
}
