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

//! Okteto context resolution
//!
//! The context is resolved once per invocation and passed explicitly to
//! every component that needs it.

use crate::infrastructure::constants::{
    ENV_BUILDKIT_HOST_URL, ENV_CONTEXT, ENV_HOME, ENV_NAMESPACE, ENV_TOKEN, ENV_URL,
};
use crate::shared::error::{OktetoError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

/// Resolved context for a single invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OktetoContext {
    /// Context name. For Okteto contexts this is the instance URL.
    pub name: String,
    pub namespace: String,
    pub token: String,
    pub is_okteto: bool,
    pub registry: String,
    /// BuildKit endpoint of the Okteto builder, empty outside Okteto contexts
    pub builder: String,
    /// Kubeconfig context to use, `None` for the current one
    pub kube_context: Option<String>,
    pub kubeconfig: Option<PathBuf>,
}

impl OktetoContext {
    /// Base URL of the Okteto API for this context
    pub fn api_url(&self) -> String {
        let url = self.name.trim_end_matches('/');
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        }
    }
}

/// On-disk context store (`~/.okteto/context/config.json`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextStore {
    #[serde(rename = "current-context", default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: HashMap<String, StoredContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub is_okteto: bool,
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub builder: String,
}

impl ContextStore {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = read_to_string(path).map_err(|e| {
            OktetoError::config_error(format!(
                "failed to read context store {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Flags that influence context resolution
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub kubeconfig: Option<String>,
}

/// Okteto home directory: `$OKTETO_HOME` or `~/.okteto`
pub fn okteto_home(env: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(home) = env(ENV_HOME).filter(|h| !h.is_empty()) {
        return Some(PathBuf::from(home));
    }
    env("HOME").map(|home| Path::new(&home).join(".okteto"))
}

/// Loads the context store from disk and resolves the context for `opts`.
pub fn load_context(opts: &ContextOptions) -> Result<OktetoContext> {
    let env = |key: &str| std::env::var(key).ok();
    let home = okteto_home(&env);

    let store = match home.as_ref().map(|h| h.join("context").join("config.json")) {
        Some(path) if path.exists() => Some(ContextStore::from_file(&path)?),
        _ => None,
    };
    let okteto_kubeconfig = home
        .map(|h| h.join("context").join("kubeconfig"))
        .filter(|p| p.exists());

    resolve_context(store.as_ref(), okteto_kubeconfig, opts, &env)
}

/// Resolution order: flags > environment > context store > kubeconfig.
pub fn resolve_context(
    store: Option<&ContextStore>,
    okteto_kubeconfig: Option<PathBuf>,
    opts: &ContextOptions,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<OktetoContext> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    let requested = non_empty(opts.context.clone())
        .or_else(|| non_empty(env(ENV_URL)))
        .or_else(|| non_empty(env(ENV_CONTEXT)))
        .or_else(|| store.map(|s| s.current_context.clone()).filter(|c| !c.is_empty()));

    let stored = requested
        .as_ref()
        .and_then(|name| store.and_then(|s| s.contexts.get(name)));

    let mut ctx = match (requested, stored) {
        (Some(name), Some(stored)) => OktetoContext {
            name: if stored.name.is_empty() {
                name
            } else {
                stored.name.clone()
            },
            namespace: stored.namespace.clone(),
            token: stored.token.clone(),
            is_okteto: stored.is_okteto,
            registry: stored.registry.clone(),
            builder: stored.builder.clone(),
            kube_context: None,
            kubeconfig: if stored.is_okteto {
                okteto_kubeconfig
            } else {
                None
            },
        },
        (Some(name), None) => OktetoContext {
            kube_context: Some(name.clone()),
            name,
            ..Default::default()
        },
        (None, _) => OktetoContext::default(),
    };

    if let Some(path) = non_empty(opts.kubeconfig.clone()) {
        ctx.kubeconfig = Some(PathBuf::from(path));
    }
    if let Some(builder) = non_empty(env(ENV_BUILDKIT_HOST_URL)) {
        ctx.builder = builder;
    }
    if let Some(token) = non_empty(env(ENV_TOKEN)) {
        ctx.token = token;
    }
    if let Some(namespace) =
        non_empty(opts.namespace.clone()).or_else(|| non_empty(env(ENV_NAMESPACE)))
    {
        ctx.namespace = namespace;
    }

    Ok(ctx)
}
