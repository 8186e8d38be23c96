use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::types::{CommitStatus, IssueComment, OpenPullRequest};
use super::{ReviewError, ReviewService};
use crate::config::GitHubAuth;

const USER_AGENT: &str = "woodhouse";
const PER_PAGE: usize = 100;

/// GitHub REST v3 client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    auth: GitHubAuth,
}

#[derive(Deserialize)]
struct PullHead {
    sha: String,
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    head: PullHead,
}

#[derive(Deserialize)]
struct CommentResponse {
    id: u64,
    #[serde(default)]
    body: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, auth: GitHubAuth) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.v3+json");
        match &self.auth {
            GitHubAuth::Token(token) => request.bearer_auth(token),
            GitHubAuth::Basic { login, password } => request.basic_auth(login, Some(password)),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ReviewError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Fetch every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ReviewError> {
        let mut items = Vec::new();
        let mut page = 1usize;
        loop {
            let request = self
                .client
                .get(self.url(path))
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let batch: Vec<T> = self.send(request).await?.json().await?;
            let count = batch.len();
            items.extend(batch);
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        debug!(path, count = items.len(), pages = page, "fetched list");
        Ok(items)
    }
}

#[async_trait]
impl ReviewService for GitHubClient {
    #[instrument(skip(self))]
    async fn list_open_prs(&self, org: &str, repo: &str) -> Result<Vec<OpenPullRequest>, ReviewError> {
        let pulls: Vec<PullResponse> = self
            .get_all(&format!("/repos/{org}/{repo}/pulls?state=open"))
            .await?;
        Ok(pulls
            .into_iter()
            .map(|pull| OpenPullRequest {
                number: pull.number,
                head_sha: pull.head.sha,
                head_ref: pull.head.git_ref,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_comments(&self, org: &str, repo: &str, pr: u64) -> Result<Vec<IssueComment>, ReviewError> {
        let comments: Vec<CommentResponse> = self
            .get_all(&format!("/repos/{org}/{repo}/issues/{pr}/comments"))
            .await?;
        Ok(comments
            .into_iter()
            .map(|comment| IssueComment {
                id: comment.id,
                body: comment.body.unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(skip(self, text))]
    async fn create_comment(&self, org: &str, repo: &str, pr: u64, text: &str) -> Result<(), ReviewError> {
        let request = self
            .client
            .post(self.url(&format!("/repos/{org}/{repo}/issues/{pr}/comments")))
            .json(&serde_json::json!({ "body": text }));
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_comment(&self, org: &str, repo: &str, comment_id: u64) -> Result<(), ReviewError> {
        let request = self
            .client
            .delete(self.url(&format!("/repos/{org}/{repo}/issues/comments/{comment_id}")));
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, status), fields(state = %status.state))]
    async fn create_commit_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> Result<(), ReviewError> {
        let request = self
            .client
            .post(self.url(&format!("/repos/{org}/{repo}/statuses/{sha}")))
            .json(status);
        self.send(request).await?;
        Ok(())
    }
}
