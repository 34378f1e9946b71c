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

//! Destroy of dependency pipelines through the control plane

use crate::domain::destroy::{DependencyDestroyer, DestroyStatus, OktetoApi, StatusHandler};
use crate::shared::error::{OktetoError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, info};

pub struct PipelineDestroyer {
    api: Arc<dyn OktetoApi>,
    status: StatusHandler,
    tick: Duration,
    timeout: Duration,
}

impl PipelineDestroyer {
    pub fn new(api: Arc<dyn OktetoApi>, status: StatusHandler) -> Self {
        Self {
            api,
            status,
            tick: Duration::from_secs(1),
            timeout: Duration::from_secs(5 * 60),
        }
    }

    /// Waits until the status record of `name` is gone or reports an error.
    async fn wait_until_destroyed(&self, name: &str, namespace: &str) -> Result<()> {
        let started = Instant::now();
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);
        let mut ticker = interval_at(started + self.tick, self.tick);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(OktetoError::Timeout(format!(
                        "'{}' destroy didn't finish after {:?}",
                        name, self.timeout
                    )));
                }
                _ = ticker.tick() => {}
            }

            match self.status.get_status(namespace, name).await? {
                None => return Ok(()),
                Some(DestroyStatus::Error) => {
                    return Err(OktetoError::user(format!(
                        "the destroy of '{}' failed, check the logs in the Okteto UI",
                        name
                    )));
                }
                Some(status) => debug!("dependency '{}' is {}", name, status),
            }
        }
    }
}

#[async_trait::async_trait]
impl DependencyDestroyer for PipelineDestroyer {
    async fn destroy(&self, name: &str, namespace: &str, destroy_volumes: bool) -> Result<()> {
        info!("destroying pipeline '{}' in namespace '{}'", name, namespace);
        self.api
            .destroy_pipeline(name, namespace, destroy_volumes)
            .await?;
        self.wait_until_destroyed(name, namespace).await?;
        info!("Repository '{}' successfully destroyed", name);
        Ok(())
    }
}
