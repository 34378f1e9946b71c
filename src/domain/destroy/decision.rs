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

//! Local or remote execution of the destroy commands

use crate::domain::config::DestroyInfo;
use crate::infrastructure::constants::{ENV_DEPLOY_REMOTE, ENV_FORCE_REMOTE};
use tracing::debug;

/// Decides whether the destroy commands run inside the cluster.
///
/// `remote_flag` is `Some(_)` only when `--remote` was given explicitly.
pub fn should_run_in_remote(
    remote_flag: Option<bool>,
    destroy: Option<&DestroyInfo>,
    env: &dyn Fn(&str) -> Option<String>,
) -> bool {
    // already inside a remote runner
    if env_bool(env, ENV_DEPLOY_REMOTE) {
        return false;
    }

    let manifest_remote = destroy.and_then(|d| d.remote);

    if env_bool(env, ENV_FORCE_REMOTE) {
        if remote_flag == Some(false) {
            debug!("remote execution forced by the environment but disabled by flag");
            return false;
        }
        if manifest_remote == Some(false) {
            debug!("remote execution forced by the environment but disabled by the manifest");
            return false;
        }
        return true;
    }

    if remote_flag == Some(true) {
        return true;
    }

    destroy.is_some_and(|d| !d.image.is_empty() || d.remote == Some(true))
}

/// Boolean environment flag (`1`, `t`, `true` in any case)
pub fn env_bool(env: &dyn Fn(&str) -> Option<String>, key: &str) -> bool {
    env(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "t" | "true"))
        .unwrap_or(false)
}
