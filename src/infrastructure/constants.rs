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

/// Resource labels
pub const DEPLOYED_BY_LABEL: &str = "dev.okteto.com/deployed-by";
pub const GIT_DEPLOY_LABEL: &str = "dev.okteto.com/git-deploy";
pub const STACK_LABEL: &str = "stack.okteto.com";
pub const DEV_APP_LABEL: &str = "dev.okteto.com/app";
pub const NAMESPACE_STATUS_LABEL: &str = "space.okteto.com/status";

/// Annotations
pub const LAST_UPDATED_ANNOTATION: &str = "dev.okteto.com/last-updated";
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Helm release discovery
pub const HELM_SECRET_TYPE: &str = "helm.sh/release.v1";
pub const OWNER_LABEL: &str = "owner";
pub const NAME_LABEL: &str = "name";
pub const HELM_OWNER: &str = "helm";

/// Status ConfigMap
pub const PIPELINE_CONFIGMAP_PREFIX: &str = "okteto-git-";
pub const FIELD_NAME: &str = "name";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_FILENAME: &str = "filename";
pub const FIELD_VARIABLES: &str = "variables";
pub const FIELD_ACTION_NAME: &str = "actionName";
pub const FIELD_ACTION_LOCK: &str = "actionLock";
pub const FIELD_ERROR: &str = "error";
pub const DEFAULT_ACTION_NAME: &str = "cli";

/// Namespace statuses reported by the control plane
pub const NAMESPACE_STATUS_ACTIVE: &str = "Active";
pub const NAMESPACE_STATUS_DESTROYING_ALL: &str = "DestroyingAll";
pub const NAMESPACE_STATUS_DESTROY_ALL_FAILED: &str = "DestroyAllFailed";

/// Environment variables
pub const ENV_DEPLOY_REMOTE: &str = "OKTETO_DEPLOY_REMOTE";
pub const ENV_FORCE_REMOTE: &str = "OKTETO_FORCE_REMOTE";
pub const ENV_REMOTE_CLI_IMAGE: &str = "OKTETO_REMOTE_CLI_IMAGE";
pub const ENV_DEPLOYABLE: &str = "OKTETO_DEPLOYABLE";
pub const ENV_ACTION_NAME: &str = "OKTETO_ACTION_NAME";
pub const ENV_NAME: &str = "OKTETO_NAME";
pub const ENV_NAMESPACE: &str = "OKTETO_NAMESPACE";
pub const ENV_CONTEXT: &str = "OKTETO_CONTEXT";
pub const ENV_TOKEN: &str = "OKTETO_TOKEN";
pub const ENV_URL: &str = "OKTETO_URL";
pub const ENV_HOME: &str = "OKTETO_HOME";
pub const ENV_GIT_COMMIT: &str = "OKTETO_GIT_COMMIT";
pub const ENV_GIT_BRANCH: &str = "OKTETO_GIT_BRANCH";
pub const ENV_INVALIDATE_CACHE: &str = "OKTETO_INVALIDATE_CACHE";
pub const ENV_SSH_AUTH_SOCK: &str = "SSH_AUTH_SOCK";
pub const ENV_BUILDKIT_HOST_URL: &str = "OKTETO_BUILDKIT_HOST_URL";
pub const ENV_BUILDKIT_HOST: &str = "BUILDKIT_HOST";

/// Remote execution images
pub const PIPELINE_RUNNER_IMAGE: &str = "okteto/pipeline-runner:1.0.2";
pub const CLI_IMAGE_REPOSITORY: &str = "okteto/okteto";
pub const REMOTE_DOCKERFILE_NAME: &str = "Dockerfile.destroy";
pub const REMOTE_TEMPLATE_NAME: &str = "destroy-dockerfile";
pub const REMOTE_DESTROY_COMMAND: &str = "destroy";
pub const BUILDX_BUILDER_PREFIX: &str = "okteto-";

/// Divert
pub const DIVERT_HEADER_NAME: &str = "okteto-divert";
pub const DIVERT_ANNOTATION_PREFIX: &str = "divert.okteto.com/";
pub const DIVERT_DRIVER_NGINX: &str = "nginx";
pub const DIVERT_DRIVER_ISTIO: &str = "istio";
pub const DIVERT_UPDATE_RETRIES: usize = 3;

/// Manifest discovery
pub const MANIFEST_CANDIDATES: &[&str] = &[
    "okteto.yml",
    "okteto.yaml",
    ".okteto/okteto.yml",
    ".okteto/okteto.yaml",
];

/// Field manager for server side patches
pub const FIELD_MANAGER: &str = "okteto-cli";
