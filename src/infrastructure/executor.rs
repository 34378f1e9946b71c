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

//! Shell command executor

use crate::domain::config::DeployCommand;
use crate::domain::destroy::CommandExecutor;
use crate::domain::variables::Masker;
use crate::infrastructure::constants::{ENV_CONTEXT, ENV_NAME, ENV_NAMESPACE};
use crate::shared::error::{OktetoError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Variables that are never masked in the output
const BUILTIN_VARIABLES: [&str; 3] = [ENV_NAME, ENV_NAMESPACE, ENV_CONTEXT];

pub struct ShellExecutor {
    shell: &'static str,
    dir: Option<PathBuf>,
    kill: Notify,
}

impl ShellExecutor {
    pub fn new(no_bash: bool, dir: Option<PathBuf>) -> Self {
        Self {
            shell: if no_bash { "sh" } else { "bash" },
            dir,
            kill: Notify::new(),
        }
    }
}

fn masker_for(env: &[String]) -> Masker {
    let mut masker = Masker::new();
    for (key, value) in env.iter().filter_map(|e| e.split_once('=')) {
        if !BUILTIN_VARIABLES.contains(&key) && !value.trim().is_empty() {
            masker.add(value);
        }
    }
    masker
}

async fn stream_lines<R>(reader: R, masker: Masker, to_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = masker.mask(&line);
        if to_stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &DeployCommand, env: &[String]) -> Result<()> {
        let masker = masker_for(env);
        debug!("executing '{}' with {}", masker.mask(&command.command), self.shell);

        let mut cmd = Command::new(self.shell);
        cmd.arg("-c")
            .arg(&command.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.dir.as_ref() {
            cmd.current_dir(dir);
        }
        for (key, value) in env.iter().filter_map(|e| e.split_once('=')) {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| OktetoError::command(&command.name, e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(stream_lines(out, masker.clone(), false)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(stream_lines(err, masker, true)));

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = self.kill.notified() => None,
        };
        let status = match waited {
            Some(status) => {
                status.map_err(|e| OktetoError::command(&command.name, e.to_string()))?
            }
            None => {
                let _ = child.kill().await;
                return Err(OktetoError::command(&command.name, "command interrupted"));
            }
        };

        for task in [stdout, stderr].into_iter().flatten() {
            let _ = task.await;
        }

        if status.success() {
            return Ok(());
        }
        let message = match status.code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        Err(OktetoError::command(&command.name, message))
    }

    fn clean_up(&self, reason: &OktetoError) {
        info!("stopping running command: {}", reason);
        self.kill.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_execute_success_with_env() {
        let executor = ShellExecutor::new(true, None);
        let cmd = DeployCommand::new(r#"test "$GREETING" = "hello""#);
        executor
            .execute(&cmd, &["GREETING=hello".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_execute_failure_carries_command_name() {
        let executor = ShellExecutor::new(true, None);
        let cmd = DeployCommand {
            name: "fail".to_string(),
            command: "exit 3".to_string(),
        };
        let err = executor.execute(&cmd, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "error executing command 'fail': exit status 3");
    }

    #[tokio::test]
    async fn test_execute_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "x").unwrap();
        let executor = ShellExecutor::new(true, Some(dir.path().to_path_buf()));
        executor
            .execute(&DeployCommand::new("test -f marker"), &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clean_up_stops_running_command() {
        let executor = Arc::new(ShellExecutor::new(true, None));
        let running = executor.clone();
        let task = tokio::spawn(async move {
            running
                .execute(&DeployCommand::new("sleep 30"), &[])
                .await
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        executor.clean_up(&OktetoError::Interrupted);

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("command should stop")
            .unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_builtin_variables_are_not_masked() {
        let masker = masker_for(&[
            "TOKEN=s3cret".to_string(),
            "OKTETO_NAMESPACE=cindy".to_string(),
        ]);
        assert_eq!(masker.mask("s3cret in cindy"), "*** in cindy");
    }
}
