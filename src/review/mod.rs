pub mod command;
pub mod github;
pub mod messages;
pub mod types;

pub use command::Command;
pub use github::GitHubClient;
pub use types::{CommitState, CommitStatus, IssueComment, OpenPullRequest};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// The code-review service: where pull requests, comments and commit
/// statuses live.
#[async_trait]
pub trait ReviewService: Send + Sync {
    async fn list_open_prs(&self, org: &str, repo: &str) -> Result<Vec<OpenPullRequest>, ReviewError>;

    async fn list_comments(&self, org: &str, repo: &str, pr: u64) -> Result<Vec<IssueComment>, ReviewError>;

    async fn create_comment(&self, org: &str, repo: &str, pr: u64, text: &str) -> Result<(), ReviewError>;

    async fn delete_comment(&self, org: &str, repo: &str, comment_id: u64) -> Result<(), ReviewError>;

    async fn create_commit_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> Result<(), ReviewError>;
}
