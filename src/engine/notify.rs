use tracing::{info, warn};

use super::{EngineError, Services};
use crate::build::{self, BuildError};
use crate::review::messages::{FAILURE_DESCRIPTION, SUCCESS_DESCRIPTION};
use crate::review::{CommitState, CommitStatus};
use crate::state::{BuildStatus, PrKey, PrRecord, ReconciliationTable};

pub use crate::review::messages::{BUILD_ACK, STOPPED_MESSAGE};
pub const BUILDING_DESCRIPTION: &str = "This pull request is being built in Jenkins";

pub(crate) fn result_description(status: BuildStatus) -> &'static str {
    match status {
        BuildStatus::Success => SUCCESS_DESCRIPTION,
        _ => FAILURE_DESCRIPTION,
    }
}

pub(crate) fn result_comment(status: BuildStatus, url: &str) -> String {
    format!(
        "{} For more information, go to: {url}",
        result_description(status)
    )
}

fn commit_state(status: BuildStatus) -> CommitState {
    match status {
        BuildStatus::Pending => CommitState::Pending,
        BuildStatus::Success => CommitState::Success,
        BuildStatus::Failure => CommitState::Failure,
        BuildStatus::Stopped => CommitState::Error,
    }
}

pub(crate) async fn comment(
    services: &Services<'_>,
    org: &str,
    repo: &str,
    pr: u64,
    text: &str,
) -> Result<(), EngineError> {
    services.review.create_comment(org, repo, pr, text).await?;
    info!(org, repo, pr, "posted comment");
    Ok(())
}

pub(crate) async fn commit_status(
    services: &Services<'_>,
    org: &str,
    repo: &str,
    sha: &str,
    status: BuildStatus,
    description: &str,
    target_url: String,
) -> Result<(), EngineError> {
    let status = CommitStatus {
        state: commit_state(status),
        description: Some(description.to_string()),
        target_url: Some(target_url),
    };
    services
        .review
        .create_commit_status(org, repo, sha, &status)
        .await?;
    info!(org, repo, sha, state = %status.state, "posted commit status");
    Ok(())
}

/// Link to the build, or to the job when the build can't be reached.
pub(crate) async fn link(services: &Services<'_>, job: &str, token: &str) -> String {
    match build::build_url(services.builds, job, token).await {
        Ok(url) => url,
        Err(e) => {
            warn!(job, error = %e, "could not resolve build url, linking the job");
            services.builds.job_url(job)
        }
    }
}

/// Best-effort stop of whatever is live for `token`. The build may well be
/// gone already, so failures are only logged.
pub(crate) async fn stop_quietly(services: &Services<'_>, job: &str, token: &str) {
    match build::stop_token(services.builds, job, token).await {
        Ok(()) => info!(job, token, "stopped previous build"),
        Err(BuildError::NotFound { .. }) => {
            info!(job, token, "previous build already gone")
        }
        Err(e) => warn!(job, token, error = %e, "failed to stop previous build"),
    }
}

/// Record a finished build and tell the PR about it, once.
///
/// The table is saved before anything is posted. If the process dies in
/// between, the next run sees the stored outcome and stays quiet, so at
/// worst one notification is lost and none is repeated.
pub(crate) async fn announce_result(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
    key: &PrKey,
    job: &str,
    outcome: BuildStatus,
) -> Result<bool, EngineError> {
    let Some(record) = table.get_mut(&key.org, &key.repo, &key.pr) else {
        return Ok(false);
    };
    let Some(next) = record.status.advance(outcome) else {
        return Ok(false);
    };
    record.status = next;
    let PrRecord { sha, job_id, .. } = record.clone();
    services.persist(table)?;

    let url = link(services, job, &job_id).await;
    let description = result_description(next);
    commit_status(services, &key.org, &key.repo, &sha, next, description, url.clone()).await?;

    match key.number() {
        Some(pr) => comment(services, &key.org, &key.repo, pr, &result_comment(next, &url)).await?,
        None => warn!(pr = %key.pr, "record is not keyed by a PR number, skipping comment"),
    }
    Ok(true)
}
