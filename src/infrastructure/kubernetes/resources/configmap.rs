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

use crate::domain::destroy::status::CfgData;
use crate::domain::variables::encode_variables;
use crate::infrastructure::constants::{
    FIELD_ACTION_NAME, FIELD_ERROR, FIELD_FILENAME, FIELD_NAME, FIELD_STATUS, FIELD_VARIABLES,
    GIT_DEPLOY_LABEL, LAST_UPDATED_ANNOTATION, PIPELINE_CONFIGMAP_PREFIX, TIME_FORMAT,
};
use crate::shared::error::Result;
use crate::shared::format::resource_k8s_meta_string;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Name of the status ConfigMap for an environment
pub fn status_configmap_name(name: &str) -> String {
    format!("{}{}", PIPELINE_CONFIGMAP_PREFIX, resource_k8s_meta_string(name))
}

/// Builds the status ConfigMap of an environment
pub struct ConfigMapBuilder<'a> {
    data: &'a CfgData,
    action_name: String,
}

impl<'a> ConfigMapBuilder<'a> {
    pub fn new(data: &'a CfgData, action_name: impl Into<String>) -> Self {
        Self {
            data,
            action_name: action_name.into(),
        }
    }

    pub fn build(&self) -> Result<ConfigMap> {
        let metadata = ObjectMeta {
            name: Some(status_configmap_name(&self.data.name)),
            namespace: Some(self.data.namespace.clone()),
            labels: Some(self.get_labels()),
            ..Default::default()
        };

        let mut cm = ConfigMap {
            metadata,
            data: Some(BTreeMap::new()),
            ..Default::default()
        };
        self.apply(&mut cm)?;
        Ok(cm)
    }

    /// Writes the current data into an existing ConfigMap, keeping unrelated keys.
    pub fn apply(&self, cm: &mut ConfigMap) -> Result<()> {
        let variables = encode_variables(&self.data.variables)?;

        let data = cm.data.get_or_insert_with(BTreeMap::new);
        data.insert(FIELD_NAME.to_string(), self.data.name.clone());
        data.insert(
            FIELD_STATUS.to_string(),
            self.data.status.as_str().to_string(),
        );
        data.insert(FIELD_ACTION_NAME.to_string(), self.action_name.clone());
        data.remove(FIELD_ERROR);
        match self.data.filename.as_deref().filter(|f| !f.is_empty()) {
            Some(filename) => data.insert(FIELD_FILENAME.to_string(), filename.to_string()),
            None => data.remove(FIELD_FILENAME),
        };
        if variables.is_empty() {
            data.remove(FIELD_VARIABLES);
        } else {
            data.insert(FIELD_VARIABLES.to_string(), variables);
        }

        cm.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .extend(self.get_labels());
        touch(cm);
        Ok(())
    }

    pub fn get_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(GIT_DEPLOY_LABEL.to_string(), "true".to_string());
        labels
    }
}

/// Refreshes the last-updated annotation
pub fn touch(cm: &mut ConfigMap) {
    cm.metadata.annotations.get_or_insert_with(BTreeMap::new).insert(
        LAST_UPDATED_ANNOTATION.to_string(),
        chrono::Utc::now().format(TIME_FORMAT).to_string(),
    );
}
