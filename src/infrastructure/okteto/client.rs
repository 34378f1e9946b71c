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

//! Okteto control plane client

use crate::domain::config::OktetoContext;
use crate::domain::destroy::OktetoApi;
use crate::shared::error::{OktetoError, Result};
use backon::{BackoffBuilder, ExponentialBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_RETRIES: usize = 3;

const DESTROY_ALL_MUTATION: &str = r#"mutation DestroyAll($namespace: String!, $destroyVolumes: Boolean!) {
  destroyAll(namespace: $namespace, destroyVolumes: $destroyVolumes) { id }
}"#;

const DESTROY_PIPELINE_MUTATION: &str = r#"mutation DestroyGitRepository($name: String!, $space: String!, $destroyVolumes: Boolean!) {
  destroyGitRepository(name: $name, space: $space, destroyVolumes: $destroyVolumes) { id, status }
}"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// One `data:` event of the log feed
#[derive(Debug, Deserialize)]
struct LogEvent {
    #[serde(default)]
    message: String,
}

pub struct OktetoClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl OktetoClient {
    pub fn new(ctx: &OktetoContext) -> Result<Self> {
        if !ctx.is_okteto {
            return Err(OktetoError::User {
                message: format!("'{}' is not an Okteto context", ctx.name),
                hint: Some("run 'okteto context use' to select an Okteto context".to_string()),
            });
        }
        let http = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: ctx.api_url(),
            token: ctx.token.clone(),
        })
    }

    /// Runs a GraphQL mutation, retrying transient failures.
    async fn mutation(&self, query: &str, variables: Value) -> Result<Value> {
        let mut backoff = ExponentialBuilder::default()
            .with_max_times(REQUEST_RETRIES)
            .build();
        loop {
            match self.send_graphql(query, &variables).await {
                Err(OktetoError::Http(e)) if is_transient(&e) => match backoff.next() {
                    Some(delay) => {
                        debug!("retrying okteto api request: {}", e);
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(OktetoError::Http(e)),
                },
                other => return other,
            }
        }
    }

    async fn send_graphql(&self, query: &str, variables: &Value) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}/graphql", self.url))
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(OktetoError::User {
                message: "your token is invalid or has expired".to_string(),
                hint: Some("run 'okteto context' to log in again".to_string()),
            });
        }
        let body: GraphqlResponse = response.error_for_status()?.json().await?;
        graphql_result(body)
    }

    async fn stream_logs(&self, namespace: &str) -> Result<()> {
        let mut response = self
            .http
            .get(format!("{}/sse/logs/{}/destroy-all", self.url, namespace))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        let mut pending: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            pending.extend_from_slice(&chunk);
            for line in drain_lines(&mut pending) {
                if let Some(message) = parse_log_line(&line) {
                    println!("{}", message);
                }
            }
        }
        Ok(())
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect()
        || err.is_timeout()
        || err.status().is_some_and(|s| s.is_server_error())
}

fn graphql_result(body: GraphqlResponse) -> Result<Value> {
    if !body.errors.is_empty() {
        let message = body
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(OktetoError::Api(message));
    }
    Ok(body.data.unwrap_or(Value::Null))
}

/// Removes every complete line from `pending` and decodes it.
/// A trailing partial line stays buffered, so multi-byte characters split across chunks survive.
fn drain_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = pending.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
    }
    lines
}

/// Extracts the message of an SSE `data:` line
fn parse_log_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str::<LogEvent>(data) {
        Ok(event) if !event.message.is_empty() => Some(event.message),
        Ok(_) => None,
        Err(_) => Some(data.to_string()),
    }
}

#[async_trait::async_trait]
impl OktetoApi for OktetoClient {
    async fn destroy_all(&self, namespace: &str, destroy_volumes: bool) -> Result<()> {
        self.mutation(
            DESTROY_ALL_MUTATION,
            json!({ "namespace": namespace, "destroyVolumes": destroy_volumes }),
        )
        .await?;
        Ok(())
    }

    async fn destroy_pipeline(
        &self,
        name: &str,
        namespace: &str,
        destroy_volumes: bool,
    ) -> Result<()> {
        let data = self
            .mutation(
                DESTROY_PIPELINE_MUTATION,
                json!({ "name": name, "space": namespace, "destroyVolumes": destroy_volumes }),
            )
            .await?;
        debug!(
            "destroy of pipeline '{}' requested: {}",
            name,
            data["destroyGitRepository"]["status"]
        );
        Ok(())
    }

    async fn stream_destroy_all_logs(&self, namespace: &str) -> Result<()> {
        self.stream_logs(namespace).await.map_err(|e| {
            warn!("destroy all log stream closed: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_line() {
        assert_eq!(
            parse_log_line(r#"data: {"message":"Destroying volumes","level":"info"}"#).as_deref(),
            Some("Destroying volumes")
        );
        assert_eq!(parse_log_line("data: plain text").as_deref(), Some("plain text"));
        assert_eq!(parse_log_line("event: log"), None);
        assert_eq!(parse_log_line("data:"), None);
    }

    #[test]
    fn test_split_multibyte_character_is_kept() {
        let line = "data: Borrando volúmenes\n".as_bytes();
        let split = line.iter().position(|b| *b >= 0x80).unwrap() + 1;

        let mut pending = Vec::new();
        pending.extend_from_slice(&line[..split]);
        assert!(drain_lines(&mut pending).is_empty());

        pending.extend_from_slice(&line[split..]);
        assert_eq!(drain_lines(&mut pending), vec!["data: Borrando volúmenes"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_graphql_errors() {
        let body: GraphqlResponse = serde_json::from_str(
            r#"{"data":null,"errors":[{"message":"namespace not found"},{"message":"denied"}]}"#,
        )
        .unwrap();
        let err = graphql_result(body).unwrap_err();
        assert_eq!(err.to_string(), "Okteto API error: namespace not found; denied");

        let body: GraphqlResponse =
            serde_json::from_str(r#"{"data":{"destroyAll":{"id":"1"}}}"#).unwrap();
        assert_eq!(graphql_result(body).unwrap()["destroyAll"]["id"], "1");
    }

    #[test]
    fn test_requires_okteto_context() {
        let ctx = OktetoContext {
            name: "kind-local".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            OktetoClient::new(&ctx),
            Err(OktetoError::User { .. })
        ));
    }
}
