use tracing::{debug, info, info_span, warn, Instrument};

use super::notify::announce_result;
use super::{EngineError, Services};
use crate::build::{self, BuildState};
use crate::state::{BuildStatus, PrKey, ReconciliationTable};

/// Refresh every recorded build from Jenkins and announce the ones that
/// finished since the last run.
pub async fn update_build_statuses(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
) -> Result<(), EngineError> {
    for key in table.keys() {
        let span = info_span!("pr", org = %key.org, repo = %key.repo, pr = %key.pr);
        update_one(services, table, &key).instrument(span).await?;
    }
    Ok(())
}

async fn update_one(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
    key: &PrKey,
) -> Result<(), EngineError> {
    let Some(record) = table.get(&key.org, &key.repo, &key.pr).cloned() else {
        return Ok(());
    };
    // stopped on request; only a new commit or a build command revives it
    if record.status == BuildStatus::Stopped {
        debug!("build was stopped, skipping");
        return Ok(());
    }

    let job = services.config.job_name(&key.repo)?;
    let state = match build::lookup_state(services.builds, job, &record.job_id).await {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "could not reach Jenkins, keeping record as is");
            return Ok(());
        }
    };
    debug!(state = %state, stored = %record.status, "looked up build");

    match state {
        BuildState::Queued => {}
        BuildState::Building => {
            if let Some(next) = record.status.advance(BuildStatus::Pending) {
                if let Some(stored) = table.get_mut(&key.org, &key.repo, &key.pr) {
                    stored.status = next;
                }
                services.persist(table)?;
            }
        }
        BuildState::NotFound => {
            info!(job_id = %record.job_id, "build vanished, dropping record");
            table.remove(&key.org, &key.repo, &key.pr);
            services.persist(table)?;
        }
        BuildState::Finished(_) => {
            let outcome = if state.is_success() {
                BuildStatus::Success
            } else {
                BuildStatus::Failure
            };
            if announce_result(services, table, key, job, outcome).await? {
                info!(result = %state, "build finished");
            }
        }
    }
    Ok(())
}
