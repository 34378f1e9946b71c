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

use thiserror::Error;
pub type Result<T> = std::result::Result<T, OktetoError>;

/// Message recorded in the status store when a destroy is interrupted.
pub const INTERRUPT_MESSAGE: &str = "interrupt signal received";

#[derive(Error, Debug)]
pub enum OktetoError {
    /// CTRL+C during a phase. Callers must return it untouched.
    #[error("interrupt signal received")]
    Interrupted,

    #[error("{0}")]
    Resolution(String),

    #[error("error destroying dependency '{name}': {message}")]
    Dependency { name: String, message: String },

    #[error("error destroying divert: {0}")]
    Divert(String),

    #[error("error executing command '{command}': {message}")]
    Command { command: String, message: String },

    #[error("Kubernetes API error: {0}")]
    KubeError(String),

    #[error("Resource not found: {resource_type} '{name}' in namespace '{namespace}'")]
    NotFound {
        resource_type: String,
        name: String,
        namespace: String,
    },

    #[error("Resource already exists: {resource_type} '{name}' in namespace '{namespace}'")]
    AlreadyExists {
        resource_type: String,
        name: String,
        namespace: String,
    },

    #[error("Conflict updating {resource_type} '{name}'")]
    Conflict { resource_type: String, name: String },

    #[error("There is a pipeline operation already running")]
    OperationRunning,

    #[error("error during stage '{stage}': {message}")]
    BuildStage { stage: String, message: String },

    #[error("{message}")]
    User {
        message: String,
        hint: Option<String>,
    },

    #[error("Okteto API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

impl From<kube::Error> for OktetoError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => OktetoError::NotFound {
                resource_type: "resource".to_string(),
                name: ae.message,
                namespace: String::new(),
            },
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                OktetoError::AlreadyExists {
                    resource_type: "resource".to_string(),
                    name: ae.message,
                    namespace: String::new(),
                }
            }
            kube::Error::Api(ae) if ae.code == 409 => OktetoError::Conflict {
                resource_type: "resource".to_string(),
                name: ae.message,
            },
            other => OktetoError::KubeError(other.to_string()),
        }
    }
}

impl OktetoError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
            hint: None,
        }
    }

    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn not_found(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn already_exists(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            resource_type: resource_type.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OktetoError::NotFound { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, OktetoError::Interrupted)
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            OktetoError::Interrupted => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_detected() {
        let err = OktetoError::not_found("ConfigMap", "okteto-git-app", "ns");
        assert!(err.is_not_found());
        assert!(!OktetoError::Interrupted.is_not_found());
    }

    #[test]
    fn test_interrupt_exit_code() {
        assert_eq!(OktetoError::Interrupted.exit_code(), 130);
        assert_eq!(OktetoError::user("boom").exit_code(), 1);
        assert_eq!(OktetoError::Interrupted.to_string(), INTERRUPT_MESSAGE);
    }

    #[test]
    fn test_command_error_message() {
        let err = OktetoError::command("printenv", "exit status 1");
        assert_eq!(
            err.to_string(),
            "error executing command 'printenv': exit status 1"
        );
    }
}
