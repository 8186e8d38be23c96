use tracing::{debug, info, info_span, Instrument};

use super::notify::{self, BUILDING_DESCRIPTION, BUILD_ACK, STOPPED_MESSAGE};
use super::{EngineError, Services};
use crate::build::{mint_job_id, BuildParams};
use crate::review::{Command, OpenPullRequest};
use crate::state::{BuildStatus, PrRecord, ReconciliationTable};

/// Where one repository's PRs are being scanned.
struct RepoScope<'a> {
    org: &'a str,
    repo: &'a str,
    job: &'a str,
}

/// Walk every open PR and start a build where one is needed.
pub async fn scan_for_work(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
) -> Result<(), EngineError> {
    for org in services.config.orgs() {
        for repo in services.config.repos_for(org)? {
            let scope = RepoScope {
                org,
                repo,
                job: services.config.job_name(repo)?,
            };
            let prs = services.review.list_open_prs(org, repo).await?;
            debug!(org, repo, open = prs.len(), "scanning pull requests");
            for pr in &prs {
                let span = info_span!("pr", org, repo, pr = pr.number);
                scan_one(services, table, &scope, pr).instrument(span).await?;
            }
        }
    }
    Ok(())
}

async fn scan_one(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
    scope: &RepoScope<'_>,
    pr: &OpenPullRequest,
) -> Result<(), EngineError> {
    if needs_build(services, table, scope, pr).await? {
        start_build(services, table, scope, pr).await?;
    }
    Ok(())
}

/// Decide whether `pr` needs a fresh build. Comment commands come first,
/// a build request before a stop request; otherwise a build is needed when
/// the PR was never built or its head moved.
async fn needs_build(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
    scope: &RepoScope<'_>,
    pr: &OpenPullRequest,
) -> Result<bool, EngineError> {
    let comments = services
        .review
        .list_comments(scope.org, scope.repo, pr.number)
        .await?;

    if let Some(command) = Command::Build.find(&comments) {
        info!(comment = command.id, "build requested");
        services
            .review
            .delete_comment(scope.org, scope.repo, command.id)
            .await?;
        notify::comment(services, scope.org, scope.repo, pr.number, BUILD_ACK).await?;
        return Ok(true);
    }

    if let Some(command) = Command::Stop.find(&comments) {
        info!(comment = command.id, "stop requested");
        services
            .review
            .delete_comment(scope.org, scope.repo, command.id)
            .await?;
        notify::comment(services, scope.org, scope.repo, pr.number, STOPPED_MESSAGE).await?;
        stop_build(services, table, scope, pr).await?;
        return Ok(false);
    }

    let key = pr.number.to_string();
    Ok(match table.get(scope.org, scope.repo, &key) {
        None => true,
        Some(record) if record.sha != pr.head_sha => {
            debug!(old = %record.sha, new = %pr.head_sha, "head moved");
            true
        }
        Some(_) => false,
    })
}

/// Handle a stop command. A running build is stopped and marked `STOPPED`;
/// an already finished one keeps its outcome.
async fn stop_build(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
    scope: &RepoScope<'_>,
    pr: &OpenPullRequest,
) -> Result<(), EngineError> {
    let key = pr.number.to_string();
    let Some(record) = table.get_mut(scope.org, scope.repo, &key) else {
        notify::commit_status(
            services,
            scope.org,
            scope.repo,
            &pr.head_sha,
            BuildStatus::Stopped,
            STOPPED_MESSAGE,
            services.builds.job_url(scope.job),
        )
        .await?;
        return Ok(());
    };
    let Some(next) = record.status.advance(BuildStatus::Stopped) else {
        debug!(status = %record.status, "build already finished, nothing to stop");
        return Ok(());
    };
    record.status = next;
    let PrRecord { sha, job_id, .. } = record.clone();

    notify::stop_quietly(services, scope.job, &job_id).await;
    services.persist(table)?;

    let url = notify::link(services, scope.job, &job_id).await;
    notify::commit_status(services, scope.org, scope.repo, &sha, next, STOPPED_MESSAGE, url).await
}

/// Replace whatever build the PR had with a new one on its current head.
async fn start_build(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
    scope: &RepoScope<'_>,
    pr: &OpenPullRequest,
) -> Result<(), EngineError> {
    let key = pr.number.to_string();
    if let Some(old) = table.get(scope.org, scope.repo, &key) {
        let old_token = old.job_id.clone();
        notify::stop_quietly(services, scope.job, &old_token).await;
    }

    let job_id = mint_job_id(scope.repo, &key);
    let params = BuildParams {
        id: job_id.clone(),
        branch: pr.head_ref.clone(),
    };
    services.builds.enqueue(scope.job, &params).await?;
    info!(job = scope.job, job_id = %job_id, sha = %pr.head_sha, "build enqueued");

    table.insert(scope.org, scope.repo, &key, PrRecord::pending(&pr.head_sha, &job_id));
    services.persist(table)?;

    let url = notify::link(services, scope.job, &job_id).await;
    notify::commit_status(
        services,
        scope.org,
        scope.repo,
        &pr.head_sha,
        BuildStatus::Pending,
        BUILDING_DESCRIPTION,
        url,
    )
    .await
}
