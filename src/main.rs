mod build;
mod config;
mod engine;
mod report;
mod review;
mod state;
#[cfg(test)]
mod testing;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use crate::build::JenkinsClient;
use crate::config::Config;
use crate::engine::{EngineError, Services};
use crate::review::GitHubClient;
use crate::state::{JsonFileStore, StateStore};

/// Woodhouse: builds open pull requests on Jenkins and reports the
/// outcome back to GitHub as commit statuses and comments.
#[derive(Parser, Debug)]
#[command(name = "woodhouse", version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Reconciliation data file (overrides `data_file` from the config)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Keep running, one cycle every SECONDS. Cycles never overlap.
    #[arg(long, value_name = "SECONDS")]
    watch: Option<u64>,

    /// Print the tracked pull requests and exit
    #[arg(long)]
    show: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.show {
        let data_file = match cli.data {
            Some(path) => path,
            None => Config::load(&cli.config)?.data_file,
        };
        let table = JsonFileStore::new(data_file).load_all()?;
        report::print_table(&table);
        return Ok(());
    }

    info!(path = %cli.config.display(), "loading configuration");
    let config = Config::load(&cli.config)?;
    let store = JsonFileStore::new(cli.data.clone().unwrap_or_else(|| config.data_file.clone()));
    info!(data = %store.path().display(), orgs = ?config.orgs(), "starting");
    let review = GitHubClient::new(config.github.api_url.clone(), config.github_auth()?);
    let builds = JenkinsClient::new(
        config.jenkins.url.clone(),
        config.jenkins.user.clone(),
        config.jenkins_password()?,
    );
    let services = Services {
        config: &config,
        review: &review,
        builds: &builds,
        store: &store,
    };

    let Some(seconds) = cli.watch else {
        run_once(&services).await?;
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match run_once(&services).await {
            Ok(()) => {}
            // misconfiguration won't fix itself
            Err(e @ EngineError::Config(_)) => return Err(e.into()),
            Err(e) => error!(error = %e, "cycle failed, retrying on next tick"),
        }
    }
}

async fn run_once(services: &Services<'_>) -> Result<(), EngineError> {
    let table = engine::run_cycle(services)
        .instrument(info_span!("cycle"))
        .await?;
    info!(tracked = table.len(), "reconciliation finished");
    Ok(())
}
