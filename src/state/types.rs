use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Last known outcome of the build recorded for a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildStatus {
    Pending,
    Success,
    Failure,
    Stopped,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BuildStatus::Pending)
    }

    /// The status to store after observing `next`, or None when nothing changes.
    ///
    /// Only `Pending` may move; a terminal status stays put for the rest of the
    /// commit's life. A rebuild replaces the whole record instead.
    pub fn advance(self, next: BuildStatus) -> Option<BuildStatus> {
        if self.is_terminal() || self == next {
            None
        } else {
            Some(next)
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Pending => write!(f, "PENDING"),
            BuildStatus::Success => write!(f, "SUCCESS"),
            BuildStatus::Failure => write!(f, "FAILURE"),
            BuildStatus::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// What the bot remembers about one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrRecord {
    /// Head commit when the build was started
    pub sha: String,
    /// Correlation token passed to Jenkins as the `id` build parameter
    pub job_id: String,
    pub status: BuildStatus,
}

impl PrRecord {
    pub fn pending(sha: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            job_id: job_id.into(),
            status: BuildStatus::Pending,
        }
    }
}

pub type RepoRecords = BTreeMap<String, PrRecord>;

/// Location of a record in the table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrKey {
    pub org: String,
    pub repo: String,
    pub pr: String,
}

impl PrKey {
    pub fn number(&self) -> Option<u64> {
        self.pr.parse().ok()
    }
}

/// organization -> repository -> PR number -> record.
///
/// PR numbers are stored in string form so the persisted JSON keeps the
/// shape `{org: {repo: {"42": {...}}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReconciliationTable {
    orgs: BTreeMap<String, BTreeMap<String, RepoRecords>>,
}

impl ReconciliationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, org: &str, repo: &str, pr: &str) -> Option<&PrRecord> {
        self.repo(org, repo)?.get(pr)
    }

    pub fn get_mut(&mut self, org: &str, repo: &str, pr: &str) -> Option<&mut PrRecord> {
        self.orgs.get_mut(org)?.get_mut(repo)?.get_mut(pr)
    }

    pub fn repo(&self, org: &str, repo: &str) -> Option<&RepoRecords> {
        self.orgs.get(org)?.get(repo)
    }

    /// Records for a repository, creating the empty org and repo levels if needed.
    pub fn repo_or_create(&mut self, org: &str, repo: &str) -> &mut RepoRecords {
        self.orgs
            .entry(org.to_string())
            .or_default()
            .entry(repo.to_string())
            .or_default()
    }

    pub fn insert(&mut self, org: &str, repo: &str, pr: &str, record: PrRecord) -> Option<PrRecord> {
        self.repo_or_create(org, repo).insert(pr.to_string(), record)
    }

    pub fn remove(&mut self, org: &str, repo: &str, pr: &str) -> Option<PrRecord> {
        self.orgs.get_mut(org)?.get_mut(repo)?.remove(pr)
    }

    /// Drop every record of `org/repo` whose PR number is not in `open`.
    /// Returns the removed PR numbers.
    pub fn retain_open(&mut self, org: &str, repo: &str, open: &HashSet<String>) -> Vec<String> {
        let Some(records) = self.orgs.get_mut(org).and_then(|repos| repos.get_mut(repo)) else {
            return Vec::new();
        };
        let stale: Vec<String> = records
            .keys()
            .filter(|pr| !open.contains(pr.as_str()))
            .cloned()
            .collect();
        for pr in &stale {
            records.remove(pr);
        }
        stale
    }

    /// Snapshot of every key, for stages that mutate the table while walking it.
    pub fn keys(&self) -> Vec<PrKey> {
        self.iter()
            .map(|(org, repo, pr, _)| PrKey {
                org: org.to_string(),
                repo: repo.to_string(),
                pr: pr.to_string(),
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str, &PrRecord)> + '_ {
        self.orgs.iter().flat_map(|(org, repos)| {
            repos.iter().flat_map(move |(repo, records)| {
                records
                    .iter()
                    .map(move |(pr, record)| (org.as_str(), repo.as_str(), pr.as_str(), record))
            })
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
