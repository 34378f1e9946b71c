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

//! Destroy of every environment in a namespace through the Okteto API

use super::interrupt::Interrupt;
use super::ConfigMapStore;
use crate::infrastructure::constants::{
    DEV_APP_LABEL, GIT_DEPLOY_LABEL, NAMESPACE_STATUS_ACTIVE, NAMESPACE_STATUS_DESTROYING_ALL,
    NAMESPACE_STATUS_DESTROY_ALL_FAILED, STACK_LABEL,
};
use crate::shared::error::{OktetoError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Labels of ConfigMaps that track something deployed in the namespace
const RESOURCE_OWNER_LABELS: [&str; 3] = [GIT_DEPLOY_LABEL, STACK_LABEL, DEV_APP_LABEL];

/// Okteto control plane operations
#[async_trait]
pub trait OktetoApi: Send + Sync {
    async fn destroy_all(&self, namespace: &str, destroy_volumes: bool) -> Result<()>;

    /// Starts the destroy of the pipeline (git deploy) `name` in `namespace`.
    async fn destroy_pipeline(&self, name: &str, namespace: &str, destroy_volumes: bool)
        -> Result<()>;

    /// Streams the destroy-all logs until the server closes the feed.
    async fn stream_destroy_all_logs(&self, namespace: &str) -> Result<()>;
}

#[async_trait]
pub trait NamespaceInspector: Send + Sync {
    /// Value of the namespace status label, `None` when the label is missing
    async fn status_label(&self, namespace: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyAllTimings {
    /// Polling period of the namespace status
    pub tick: Duration,
    /// Overall polling timeout
    pub timeout: Duration,
    /// How long an `Active` namespace with leftovers is tolerated before the
    /// destroy was ever observed
    pub grace: Duration,
    /// Connection timeout of the log stream
    pub log_timeout: Duration,
    /// How long the log stream may keep flushing once polling finished
    pub log_flush: Duration,
}

impl Default for DestroyAllTimings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            timeout: Duration::from_secs(5 * 60),
            grace: Duration::from_secs(30),
            log_timeout: Duration::from_secs(5 * 60),
            log_flush: Duration::from_secs(2),
        }
    }
}

pub struct DestroyAll {
    api: Arc<dyn OktetoApi>,
    namespaces: Arc<dyn NamespaceInspector>,
    configmaps: Arc<dyn ConfigMapStore>,
    interrupt: Interrupt,
    timings: DestroyAllTimings,
}

impl DestroyAll {
    pub fn new(
        api: Arc<dyn OktetoApi>,
        namespaces: Arc<dyn NamespaceInspector>,
        configmaps: Arc<dyn ConfigMapStore>,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            api,
            namespaces,
            configmaps,
            interrupt,
            timings: DestroyAllTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: DestroyAllTimings) -> Self {
        self.timings = timings;
        self
    }

    pub async fn run(&self, namespace: &str, destroy_volumes: bool) -> Result<()> {
        info!("Deleting all in {} namespace", namespace);
        self.api.destroy_all(namespace, destroy_volumes).await?;

        let api = self.api.clone();
        let ns = namespace.to_string();
        let log_timeout = self.timings.log_timeout;
        let mut logs = tokio::spawn(async move {
            match timeout(log_timeout, api.stream_destroy_all_logs(&ns)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("destroy all logs cannot be streamed due to connectivity issues");
                    info!(
                        "destroy all logs cannot be streamed due to connectivity issues: {}",
                        e
                    );
                }
                Err(_) => debug!("destroy all log stream reached its connection timeout"),
            }
        });

        tokio::select! {
            biased;
            _ = self.interrupt.wait() => {
                logs.abort();
                let _ = (&mut logs).await;
                info!("CTRL+C received, exit");
                Err(OktetoError::Interrupted)
            }
            result = self.wait_for_destroy_all(namespace) => {
                if timeout(self.timings.log_flush, &mut logs).await.is_err() {
                    logs.abort();
                }
                result
            }
        }
    }

    async fn wait_for_destroy_all(&self, namespace: &str) -> Result<()> {
        let started = Instant::now();
        let deadline = sleep(self.timings.timeout);
        tokio::pin!(deadline);
        let mut ticker = interval_at(started + self.timings.tick, self.timings.tick);
        let mut seen_destroying = false;

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(OktetoError::Timeout(format!(
                        "'{}' destroy all didn't finish after {:?}",
                        namespace, self.timings.timeout
                    )));
                }
                _ = ticker.tick() => {}
            }

            let Some(status) = self.namespaces.status_label(namespace).await? else {
                debug!("namespace {} does not have label for status", namespace);
                continue;
            };

            match status.as_str() {
                NAMESPACE_STATUS_ACTIVE => {
                    let within_grace =
                        !seen_destroying && started.elapsed() < self.timings.grace;
                    match self.check_all_resources_destroyed(namespace).await {
                        Ok(()) => return Ok(()),
                        Err(e) if within_grace => {
                            debug!("namespace active before destroy started: {}", e);
                        }
                        Err(e) if seen_destroying => return Err(e),
                        Err(e) => {
                            debug!("ignoring leftovers, destroy all was never observed: {}", e);
                            return Ok(());
                        }
                    }
                }
                NAMESPACE_STATUS_DESTROYING_ALL => seen_destroying = true,
                NAMESPACE_STATUS_DESTROY_ALL_FAILED => {
                    return Err(OktetoError::user("namespace destroy all failed"));
                }
                other => debug!("namespace {} status '{}'", namespace, other),
            }
        }
    }

    async fn check_all_resources_destroyed(&self, namespace: &str) -> Result<()> {
        let configmaps = self.configmaps.list(namespace, "").await?;
        let leftover = configmaps.iter().any(|cm| {
            cm.metadata.labels.as_ref().is_some_and(|labels| {
                RESOURCE_OWNER_LABELS
                    .iter()
                    .any(|label| labels.contains_key(*label))
            })
        });
        if leftover {
            return Err(OktetoError::user("some resources were not destroyed"));
        }
        Ok(())
    }
}
