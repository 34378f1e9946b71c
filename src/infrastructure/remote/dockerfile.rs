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

//! Rendering of the remote destroy Dockerfile

use crate::domain::destroy::RemoteParams;
use crate::infrastructure::constants::{
    ENV_ACTION_NAME, ENV_CONTEXT, ENV_DEPLOYABLE, ENV_DEPLOY_REMOTE, ENV_GIT_BRANCH,
    ENV_GIT_COMMIT, ENV_INVALIDATE_CACHE, ENV_NAMESPACE, ENV_TOKEN, REMOTE_DESTROY_COMMAND,
    REMOTE_TEMPLATE_NAME,
};
use crate::shared::error::Result;
use tera::{Context, Tera};

pub fn render_dockerfile(params: &RemoteParams) -> Result<String> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_template(REMOTE_TEMPLATE_NAME, &params.dockerfile_template)?;

    let mut context = Context::new();
    context.insert("cli_image", &params.cli_image);
    context.insert("base_image", &params.base_image);
    context.insert("remote_env", ENV_DEPLOY_REMOTE);
    context.insert("namespace_arg", ENV_NAMESPACE);
    context.insert("context_arg", ENV_CONTEXT);
    context.insert("token_arg", ENV_TOKEN);
    context.insert("action_name_arg", ENV_ACTION_NAME);
    context.insert("deployable_arg", ENV_DEPLOYABLE);
    context.insert("git_commit_arg", ENV_GIT_COMMIT);
    context.insert("git_branch_arg", ENV_GIT_BRANCH);
    context.insert("invalidate_cache_arg", ENV_INVALIDATE_CACHE);
    context.insert("command", REMOTE_DESTROY_COMMAND);
    context.insert("flags", &params.command_flags.join(" "));

    Ok(tera.render(REMOTE_TEMPLATE_NAME, &context)?)
}
