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

//! Okteto manifest types consumed by the destroy operation
//!
//! Only the sections that destroy needs are modelled; unknown keys are ignored.

use crate::infrastructure::constants::{DIVERT_DRIVER_NGINX, MANIFEST_CANDIDATES};
use crate::shared::error::{OktetoError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub name: Option<String>,
    pub namespace: String,
    pub context: String,
    pub deploy: Option<DeployInfo>,
    pub destroy: Option<DestroyInfo>,
    pub dependencies: BTreeMap<String, Dependency>,
}

/// A named shell command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCommand")]
pub struct DeployCommand {
    pub name: String,
    pub command: String,
}

impl DeployCommand {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            name: command.clone(),
            command,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCommand {
    Plain(String),
    Full {
        name: Option<String>,
        command: String,
    },
}

impl From<RawCommand> for DeployCommand {
    fn from(raw: RawCommand) -> Self {
        match raw {
            RawCommand::Plain(command) => DeployCommand::new(command),
            RawCommand::Full { name, command } => DeployCommand {
                name: name.filter(|n| !n.is_empty()).unwrap_or_else(|| command.clone()),
                command,
            },
        }
    }
}

/// `destroy` section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DestroyInfo {
    pub image: String,
    pub commands: Vec<DeployCommand>,
    pub remote: Option<bool>,
    pub context: String,
}

impl<'de> Deserialize<'de> for DestroyInfo {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawDestroy {
            List(Vec<DeployCommand>),
            Full {
                #[serde(default)]
                image: String,
                #[serde(default)]
                commands: Vec<DeployCommand>,
                #[serde(default)]
                remote: Option<bool>,
                #[serde(default)]
                context: String,
            },
        }

        Ok(match RawDestroy::deserialize(deserializer)? {
            RawDestroy::List(commands) => DestroyInfo {
                commands,
                ..Default::default()
            },
            RawDestroy::Full {
                image,
                commands,
                remote,
                context,
            } => DestroyInfo {
                image,
                commands,
                remote,
                context,
            },
        })
    }
}

/// `deploy` section. Only the divert configuration matters here.
#[derive(Debug, Clone, Default)]
pub struct DeployInfo {
    pub divert: Option<DivertInfo>,
}

impl<'de> Deserialize<'de> for DeployInfo {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawDeploy {
            Full {
                #[serde(default)]
                divert: Option<DivertInfo>,
            },
            Other(serde::de::IgnoredAny),
        }

        Ok(match RawDeploy::deserialize(deserializer)? {
            RawDeploy::Full { divert } => DeployInfo { divert },
            RawDeploy::Other(_) => DeployInfo::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DivertInfo {
    pub namespace: String,
    pub driver: String,
    pub virtual_services: Vec<String>,
}

impl Default for DivertInfo {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            driver: DIVERT_DRIVER_NGINX.to_string(),
            virtual_services: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Dependency {
    pub repository: String,
    pub namespace: String,
    pub variables: BTreeMap<String, String>,
}

impl Manifest {
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads the manifest for `cwd`.
    ///
    /// An explicit path must exist. Without one, the well-known locations are
    /// checked and an empty manifest is returned when none exists.
    pub fn load(cwd: &Path, path_flag: Option<&str>) -> Result<Self> {
        let path = match path_flag.filter(|p| !p.is_empty()) {
            Some(flag) => {
                let path = if Path::new(flag).is_absolute() {
                    PathBuf::from(flag)
                } else {
                    cwd.join(flag)
                };
                if !path.exists() {
                    return Err(OktetoError::Resolution(format!(
                        "the manifest file '{}' does not exist",
                        flag
                    )));
                }
                path
            }
            None => match MANIFEST_CANDIDATES
                .iter()
                .map(|candidate| cwd.join(candidate))
                .find(|p| p.exists())
            {
                Some(path) => path,
                None => {
                    info!("could not find manifest file to be executed, destroying labeled resources only");
                    return Ok(Self::default());
                }
            },
        };

        debug!("reading manifest from {}", path.display());
        let content = read_to_string(&path).map_err(|e| {
            OktetoError::Resolution(format!(
                "failed to read manifest {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut manifest = Self::from_yaml(&content)?;
        if let Some(destroy) = manifest.destroy.as_mut() {
            let env = |key: &str| std::env::var(key).ok();
            destroy.image = expand_env(&destroy.image, &env);
        }
        Ok(manifest)
    }

    /// The divert configuration, when it diverts traffic from another namespace than `namespace`.
    pub fn divert_target(&self, namespace: &str) -> Option<&DivertInfo> {
        self.deploy
            .as_ref()
            .and_then(|d| d.divert.as_ref())
            .filter(|divert| divert.namespace != namespace)
    }

    /// Directory the destroy commands run in: `destroy.context` under `root`, else `root`.
    pub fn destroy_dir(&self, root: &Path) -> PathBuf {
        match self.destroy.as_ref().map(|d| d.context.as_str()) {
            Some(dir) if !dir.is_empty() => root.join(dir),
            _ => root.to_path_buf(),
        }
    }

    pub fn destroy_commands(&self) -> &[DeployCommand] {
        self.destroy
            .as_ref()
            .map(|d| d.commands.as_slice())
            .unwrap_or_default()
    }
}

/// Expands `$VAR` and `${VAR}` references. Unknown variables expand to "".
pub fn expand_env(value: &str, env: &dyn Fn(&str) -> Option<String>) -> String {
    if !value.contains('$') {
        return value.to_string();
    }
    let Ok(re) = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)") else {
        return value.to_string();
    };
    re.replace_all(value, |caps: &regex::Captures| {
        let key = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        env(key).unwrap_or_default()
    })
    .into_owned()
}

/// Infers the environment name from the git remote or the directory name.
pub fn infer_name(cwd: &Path) -> String {
    if let Some(name) = read_to_string(cwd.join(".git").join("config"))
        .ok()
        .and_then(|config| repository_name_from_git_config(&config))
    {
        return name;
    }

    cwd.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn repository_name_from_git_config(config: &str) -> Option<String> {
    let mut in_origin = false;
    for line in config.lines().map(str::trim) {
        if line.starts_with('[') {
            in_origin = line == r#"[remote "origin"]"#;
            continue;
        }
        if !in_origin {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "url" {
                let url = value.trim().trim_end_matches('/');
                let last = url.rsplit(['/', ':']).next()?;
                let name = last.trim_end_matches(".git");
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroy_list_form() {
        let manifest = Manifest::from_yaml(
            r#"
name: movies
destroy:
  - printenv
  - name: clean
    command: ls -la
"#,
        )
        .unwrap();
        let commands = manifest.destroy_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], DeployCommand::new("printenv"));
        assert_eq!(commands[1].name, "clean");
        assert_eq!(commands[1].command, "ls -la");
    }

    #[test]
    fn test_destroy_object_form() {
        let manifest = Manifest::from_yaml(
            r#"
destroy:
  image: okteto/kubectl
  remote: true
  commands:
    - helm uninstall movies
"#,
        )
        .unwrap();
        let destroy = manifest.destroy.unwrap();
        assert_eq!(destroy.image, "okteto/kubectl");
        assert_eq!(destroy.remote, Some(true));
        assert_eq!(destroy.commands.len(), 1);
    }

    #[test]
    fn test_destroy_dir() {
        let root = Path::new("/src/movies");
        let manifest = Manifest::from_yaml("destroy:\n  context: infra\n  commands: []\n").unwrap();
        assert_eq!(manifest.destroy_dir(root), root.join("infra"));
        assert_eq!(Manifest::default().destroy_dir(root), root.to_path_buf());
    }

    #[test]
    fn test_divert_target_ignores_same_namespace() {
        let manifest = Manifest::from_yaml(
            r#"
deploy:
  commands:
    - helm upgrade --install movies chart
  divert:
    namespace: staging
"#,
        )
        .unwrap();
        assert!(manifest.divert_target("staging").is_none());

        let divert = manifest.divert_target("cindy").unwrap();
        assert_eq!(divert.namespace, "staging");
        assert_eq!(divert.driver, "nginx");
    }

    #[test]
    fn test_deploy_list_form_has_no_divert() {
        let manifest = Manifest::from_yaml("deploy:\n  - kubectl apply -f k8s\n").unwrap();
        assert!(manifest.divert_target("cindy").is_none());
    }

    #[test]
    fn test_dependencies_are_sorted() {
        let manifest = Manifest::from_yaml(
            r#"
dependencies:
  payments:
    repository: https://github.com/okteto/payments
  frontend:
    repository: https://github.com/okteto/frontend
    namespace: shared
"#,
        )
        .unwrap();
        let names: Vec<_> = manifest.dependencies.keys().cloned().collect();
        assert_eq!(names, vec!["frontend", "payments"]);
        assert_eq!(manifest.dependencies["frontend"].namespace, "shared");
    }

    #[test]
    fn test_expand_env() {
        let env = |key: &str| match key {
            "REGISTRY" => Some("registry.example.com".to_string()),
            _ => None,
        };
        assert_eq!(
            expand_env("${REGISTRY}/runner:$TAG", &env),
            "registry.example.com/runner:"
        );
        assert_eq!(expand_env("plain", &env), "plain");
    }

    #[test]
    fn test_repository_name_from_git_config() {
        let config = r#"
[core]
	bare = false
[remote "origin"]
	url = git@github.com:okteto/movies.git
	fetch = +refs/heads/*:refs/remotes/origin/*
"#;
        assert_eq!(
            repository_name_from_git_config(config).as_deref(),
            Some("movies")
        );
    }

    #[test]
    fn test_load_without_manifest_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::load(dir.path(), None).unwrap();
        assert!(manifest.destroy_commands().is_empty());
    }

    #[test]
    fn test_load_missing_explicit_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(dir.path(), Some("missing.yml")).unwrap_err();
        assert!(matches!(err, OktetoError::Resolution(_)));
    }

    #[test]
    fn test_load_discovers_dot_okteto() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".okteto")).unwrap();
        std::fs::write(
            dir.path().join(".okteto/okteto.yml"),
            "name: movies\ndestroy:\n  - echo bye\n",
        )
        .unwrap();
        let manifest = Manifest::load(dir.path(), None).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("movies"));
        assert_eq!(manifest.destroy_commands().len(), 1);
    }
}
