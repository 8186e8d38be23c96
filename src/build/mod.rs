pub mod jenkins;
pub mod token;
pub mod types;

pub use jenkins::JenkinsClient;
pub use token::mint_job_id;
pub use types::{Build, BuildParams, BuildState, QueueItem};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Jenkins request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Jenkins returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No build or queue entry of {job} carries id {token}")]
    NotFound { job: String, token: String },
}

/// The build server. Builds are located by the `id` parameter they were
/// enqueued with.
#[async_trait]
pub trait BuildService: Send + Sync {
    async fn enqueue(&self, job: &str, params: &BuildParams) -> Result<(), BuildError>;

    async fn find_queued(&self, token: &str) -> Result<Option<QueueItem>, BuildError>;

    async fn find_build(&self, job: &str, token: &str) -> Result<Option<Build>, BuildError>;

    async fn stop(&self, job: &str, build_number: u64) -> Result<(), BuildError>;

    async fn cancel_queued(&self, queue_id: u64) -> Result<(), BuildError>;

    fn job_url(&self, job: &str) -> String;

    async fn is_queued(&self, token: &str) -> Result<bool, BuildError> {
        Ok(self.find_queued(token).await?.is_some())
    }
}

/// Where the build carrying `token` stands. Running or finished builds win
/// over queue entries; a token found in neither place is `NotFound`.
///
/// Jenkins can move a build from the queue to an executor between the two
/// reads, so a miss on both is confirmed by reading the builds once more.
pub async fn lookup_state(
    builds: &dyn BuildService,
    job: &str,
    token: &str,
) -> Result<BuildState, BuildError> {
    if let Some(build) = builds.find_build(job, token).await? {
        return Ok(BuildState::from_build(&build));
    }
    if builds.is_queued(token).await? {
        return Ok(BuildState::Queued);
    }
    if let Some(build) = builds.find_build(job, token).await? {
        debug!(job, number = build.number, "build left the queue during lookup");
        return Ok(BuildState::from_build(&build));
    }
    Ok(BuildState::NotFound)
}

/// Link for statuses and comments: the build page once there is one,
/// the job page otherwise.
pub async fn build_url(builds: &dyn BuildService, job: &str, token: &str) -> Result<String, BuildError> {
    Ok(match builds.find_build(job, token).await? {
        Some(build) => build.url,
        None => builds.job_url(job),
    })
}

async fn stop_build(builds: &dyn BuildService, job: &str, build: &Build) -> Result<(), BuildError> {
    if build.building {
        builds.stop(job, build.number).await
    } else {
        debug!(job, number = build.number, "build already finished, nothing to stop");
        Ok(())
    }
}

/// Stop whatever is live for `token`: abort the running build or pull the
/// entry out of the queue. A finished build needs nothing. Like
/// `lookup_state`, a miss on both reads is re-checked against the builds.
pub async fn stop_token(builds: &dyn BuildService, job: &str, token: &str) -> Result<(), BuildError> {
    if let Some(build) = builds.find_build(job, token).await? {
        return stop_build(builds, job, &build).await;
    }
    if let Some(item) = builds.find_queued(token).await? {
        return builds.cancel_queued(item.id).await;
    }
    match builds.find_build(job, token).await? {
        Some(build) => stop_build(builds, job, &build).await,
        None => Err(BuildError::NotFound {
            job: job.to_string(),
            token: token.to_string(),
        }),
    }
}
