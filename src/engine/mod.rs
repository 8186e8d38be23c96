pub mod collector;
pub mod notify;
pub mod scanner;
pub mod status;

use thiserror::Error;
use tracing::{info, info_span, Instrument};

use crate::build::{BuildError, BuildService};
use crate::config::{Config, ConfigError};
use crate::review::{ReviewError, ReviewService};
use crate::state::{ReconciliationTable, StateStore, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything a stage talks to besides the table itself.
pub struct Services<'a> {
    pub config: &'a Config,
    pub review: &'a dyn ReviewService,
    pub builds: &'a dyn BuildService,
    pub store: &'a dyn StateStore,
}

impl Services<'_> {
    /// Write the whole table. Called after every mutation so a killed
    /// process resumes from the last decision it made.
    pub fn persist(&self, table: &ReconciliationTable) -> Result<(), EngineError> {
        self.store.save_all(table)?;
        Ok(())
    }
}

/// One reconciliation pass: refresh build outcomes, drop closed PRs, then
/// start or stop builds for what is open now. Each stage relies on the table
/// the previous one left behind.
pub async fn run_cycle(services: &Services<'_>) -> Result<ReconciliationTable, EngineError> {
    let mut table = services.store.load_all()?;
    info!(records = table.len(), "loaded reconciliation table");

    status::update_build_statuses(services, &mut table)
        .instrument(info_span!("stage", name = "status"))
        .await?;
    collector::collect_stale(services, &mut table)
        .instrument(info_span!("stage", name = "collect"))
        .await?;
    scanner::scan_for_work(services, &mut table)
        .instrument(info_span!("stage", name = "scan"))
        .await?;

    info!(records = table.len(), "cycle complete");
    Ok(table)
}
