use serde::{Deserialize, Serialize};

/// Parameters every PR job takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildParams {
    /// Correlation token, see `token::mint_job_id`
    pub id: String,
    /// PR branch to check out
    pub branch: String,
}

/// A build that has left the queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Build {
    pub number: u64,
    pub url: String,
    #[serde(default)]
    pub building: bool,
    /// Jenkins result (SUCCESS, FAILURE, UNSTABLE, ABORTED, ...), null while running
    #[serde(default)]
    pub result: Option<String>,
}

/// A build still waiting in the Jenkins queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueItem {
    pub id: u64,
}

/// Where a build identified by its token currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    Queued,
    Building,
    /// Finished with the given Jenkins result string
    Finished(String),
    /// Neither a build nor a queue entry carries the token
    NotFound,
}

impl BuildState {
    pub fn from_build(build: &Build) -> Self {
        match (&build.result, build.building) {
            (Some(result), false) => BuildState::Finished(result.clone()),
            // Jenkins briefly reports building=false with no result while finalizing
            _ => BuildState::Building,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildState::Finished(result) if result == "SUCCESS")
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildState::Queued => write!(f, "QUEUED"),
            BuildState::Building => write!(f, "PENDING"),
            BuildState::Finished(result) => write!(f, "{result}"),
            BuildState::NotFound => write!(f, "ERROR"),
        }
    }
}
