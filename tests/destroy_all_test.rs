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

mod common;

#[cfg(test)]
mod tests {
    use super::common::{CallLog, FakeConfigMapStore, FakeNamespaceInspector, FakeOktetoApi};
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use okteto_destroy::{DestroyAll, Interrupt, OktetoError};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    const ACTIVE: Option<&str> = Some("Active");
    const DESTROYING: Option<&str> = Some("DestroyingAll");

    struct Setup {
        log: CallLog,
        api: FakeOktetoApi,
        configmaps: Arc<FakeConfigMapStore>,
    }

    impl Setup {
        fn new() -> Self {
            let log = CallLog::default();
            Self {
                api: FakeOktetoApi {
                    log: log.clone(),
                    ..Default::default()
                },
                configmaps: Arc::new(FakeConfigMapStore::new(log.clone())),
                log,
            }
        }

        fn with_leftover(self) -> Self {
            let mut labels = BTreeMap::new();
            labels.insert("dev.okteto.com/git-deploy".to_string(), "true".to_string());
            self.configmaps.insert(
                "cindy",
                ConfigMap {
                    metadata: ObjectMeta {
                        name: Some("okteto-git-movies".to_string()),
                        labels: Some(labels),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            );
            self
        }

        fn destroy_all(self, statuses: &[Option<&str>], interrupt: Interrupt) -> DestroyAll {
            DestroyAll::new(
                Arc::new(self.api),
                Arc::new(FakeNamespaceInspector::new(statuses)),
                self.configmaps,
                interrupt,
            )
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_all_finishes_when_namespace_is_active() {
        let setup = Setup::new();
        let log = setup.log.clone();
        let destroy_all =
            setup.destroy_all(&[None, DESTROYING, DESTROYING, ACTIVE], Interrupt::never());

        destroy_all.run("cindy", true).await.unwrap();

        assert_eq!(log.with_prefix("destroy-all:"), vec!["destroy-all:cindy:true"]);
        assert_eq!(log.with_prefix("logs:"), vec!["logs:cindy"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_all_failed_status() {
        let setup = Setup::new();
        let destroy_all = setup.destroy_all(&[DESTROYING, Some("DestroyAllFailed")], Interrupt::never());

        let err = destroy_all.run("cindy", false).await.unwrap_err();
        assert_eq!(err.to_string(), "namespace destroy all failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_leftovers_after_destroy_all() {
        let setup = Setup::new().with_leftover();
        let destroy_all = setup.destroy_all(&[DESTROYING, ACTIVE], Interrupt::never());

        let err = destroy_all.run("cindy", false).await.unwrap_err();
        assert_eq!(err.to_string(), "some resources were not destroyed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_namespace_waits_for_grace_period() {
        let setup = Setup::new().with_leftover();
        let destroy_all = setup.destroy_all(&[ACTIVE], Interrupt::never());

        let started = Instant::now();
        destroy_all.run("cindy", false).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_all_timeout() {
        let setup = Setup::new();
        let destroy_all = setup.destroy_all(&[DESTROYING], Interrupt::never());

        let err = destroy_all.run("cindy", false).await.unwrap_err();
        assert!(matches!(err, OktetoError::Timeout(_)));
        assert!(err.to_string().contains("'cindy' destroy all didn't finish after"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_all_request_failure() {
        let mut setup = Setup::new();
        setup.api.fail_destroy_all = true;
        let log = setup.log.clone();
        let destroy_all = setup.destroy_all(&[ACTIVE], Interrupt::never());

        let err = destroy_all.run("cindy", false).await.unwrap_err();
        assert!(matches!(err, OktetoError::Api(_)));
        assert!(log.with_prefix("logs:").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_stream_failure_is_not_fatal() {
        let mut setup = Setup::new();
        setup.api.fail_stream = true;
        let destroy_all = setup.destroy_all(&[DESTROYING, ACTIVE], Interrupt::never());

        destroy_all.run("cindy", false).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_all_interrupted() {
        let setup = Setup::new();
        let (trigger, interrupt) = Interrupt::manual();
        let destroy_all = setup.destroy_all(&[DESTROYING], interrupt);

        let (result, _) = tokio::join!(destroy_all.run("cindy", false), async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.trigger();
        });
        assert!(result.unwrap_err().is_interrupted());
    }
}
