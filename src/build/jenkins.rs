use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use super::types::{Build, BuildParams, QueueItem};
use super::{BuildError, BuildService};

/// Jenkins JSON API client, authenticated with a user and API token.
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
}

impl JenkinsClient {
    pub fn new(base_url: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user: user.into(),
            password: password.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BuildError> {
        let response = request
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BuildError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BuildError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Ok(response.json().await?)
    }
}

/// True when any action of a build or queue item has parameter `id == token`.
/// Entries without the expected shape simply don't match.
pub(crate) fn carries_token(entry: &Value, token: &str) -> bool {
    let Some(actions) = entry.get("actions").and_then(Value::as_array) else {
        return false;
    };
    actions
        .iter()
        .filter_map(|action| action.get("parameters").and_then(Value::as_array))
        .flatten()
        .any(|param| {
            param.get("name").and_then(Value::as_str) == Some("id")
                && param.get("value").and_then(Value::as_str) == Some(token)
        })
}

/// First entry of `list[key]` carrying `token`, decoded as `T`.
pub(crate) fn find_by_token<T: DeserializeOwned>(list: &Value, key: &str, token: &str) -> Option<T> {
    list.get(key)?
        .as_array()?
        .iter()
        .filter(|entry| carries_token(entry, token))
        .find_map(|entry| serde_json::from_value(entry.clone()).ok())
}

#[async_trait]
impl BuildService for JenkinsClient {
    #[instrument(skip(self, params), fields(id = %params.id, branch = %params.branch))]
    async fn enqueue(&self, job: &str, params: &BuildParams) -> Result<(), BuildError> {
        let request = self
            .client
            .post(self.url(&format!("/job/{job}/buildWithParameters")))
            .form(params);
        self.send(request).await?;
        debug!("build enqueued");
        Ok(())
    }

    async fn find_queued(&self, token: &str) -> Result<Option<QueueItem>, BuildError> {
        let queue: Value = self.get_json("/queue/api/json").await?;
        Ok(find_by_token(&queue, "items", token))
    }

    async fn find_build(&self, job: &str, token: &str) -> Result<Option<Build>, BuildError> {
        let info: Value = self.get_json(&format!("/job/{job}/api/json?depth=1")).await?;
        Ok(find_by_token(&info, "builds", token))
    }

    #[instrument(skip(self))]
    async fn stop(&self, job: &str, build_number: u64) -> Result<(), BuildError> {
        let request = self
            .client
            .post(self.url(&format!("/job/{job}/{build_number}/stop")));
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cancel_queued(&self, queue_id: u64) -> Result<(), BuildError> {
        let request = self
            .client
            .post(self.url("/queue/cancelItem"))
            .query(&[("id", queue_id)]);
        self.send(request).await?;
        Ok(())
    }

    fn job_url(&self, job: &str) -> String {
        self.url(&format!("/job/{job}/"))
    }
}
