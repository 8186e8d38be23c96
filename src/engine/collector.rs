use std::collections::HashSet;
use tracing::{info, instrument};

use super::{EngineError, Services};
use crate::state::ReconciliationTable;

/// Forget PRs that are no longer open upstream.
#[instrument(skip_all)]
pub async fn collect_stale(
    services: &Services<'_>,
    table: &mut ReconciliationTable,
) -> Result<(), EngineError> {
    for org in services.config.orgs() {
        for repo in services.config.repos_for(org)? {
            let open: HashSet<String> = services
                .review
                .list_open_prs(org, repo)
                .await?
                .iter()
                .map(|pr| pr.number.to_string())
                .collect();
            let removed = table.retain_open(org, repo, &open);
            if !removed.is_empty() {
                info!(org, repo, prs = ?removed, "dropped closed pull requests");
                services.persist(table)?;
            }
        }
    }
    Ok(())
}
