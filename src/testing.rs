//! In-memory collaborators that record every call, for engine tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::build::{Build, BuildError, BuildParams, BuildService, QueueItem};
use crate::config::Config;
use crate::review::{CommitStatus, IssueComment, OpenPullRequest, ReviewError, ReviewService};
use crate::state::{ReconciliationTable, StateStore, StoreError};

/// One org with one repository, built by job `widgets-pr`.
pub fn test_config() -> Config {
    toml::from_str(
        r#"
[github]
token = "test-token"
orgs = ["acme"]

[jenkins]
url = "https://ci.example.com"
user = "bot"
password = "secret"

[repos]
acme = ["widgets"]

[jobs]
widgets = "widgets-pr"
"#,
    )
    .unwrap()
}

pub fn open_pr(number: u64, sha: &str) -> OpenPullRequest {
    OpenPullRequest {
        number,
        head_sha: sha.to_string(),
        head_ref: format!("branch-{number}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    pub org: String,
    pub repo: String,
    pub pr: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedStatus {
    pub org: String,
    pub repo: String,
    pub sha: String,
    pub status: CommitStatus,
}

#[derive(Default)]
struct ReviewState {
    prs: HashMap<(String, String), Vec<OpenPullRequest>>,
    comments: HashMap<(String, String, u64), Vec<IssueComment>>,
    posted: Vec<PostedComment>,
    deleted: Vec<u64>,
    statuses: Vec<PostedStatus>,
}

#[derive(Default)]
pub struct FakeReview {
    state: Mutex<ReviewState>,
}

impl FakeReview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_prs(&self, org: &str, repo: &str, prs: Vec<OpenPullRequest>) {
        let mut state = self.state.lock().unwrap();
        state.prs.insert((org.to_string(), repo.to_string()), prs);
    }

    pub fn add_comment(&self, org: &str, repo: &str, pr: u64, id: u64, body: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .comments
            .entry((org.to_string(), repo.to_string(), pr))
            .or_default()
            .push(IssueComment {
                id,
                body: body.to_string(),
            });
    }

    pub fn posted(&self) -> Vec<PostedComment> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn deleted(&self) -> Vec<u64> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn statuses(&self) -> Vec<PostedStatus> {
        self.state.lock().unwrap().statuses.clone()
    }

    /// Number of comments plus commit statuses posted so far.
    pub fn notification_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.posted.len() + state.statuses.len()
    }
}

#[async_trait]
impl ReviewService for FakeReview {
    async fn list_open_prs(&self, org: &str, repo: &str) -> Result<Vec<OpenPullRequest>, ReviewError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .prs
            .get(&(org.to_string(), repo.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_comments(&self, org: &str, repo: &str, pr: u64) -> Result<Vec<IssueComment>, ReviewError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .comments
            .get(&(org.to_string(), repo.to_string(), pr))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_comment(&self, org: &str, repo: &str, pr: u64, text: &str) -> Result<(), ReviewError> {
        let mut state = self.state.lock().unwrap();
        state.posted.push(PostedComment {
            org: org.to_string(),
            repo: repo.to_string(),
            pr,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_comment(&self, _org: &str, _repo: &str, comment_id: u64) -> Result<(), ReviewError> {
        let mut state = self.state.lock().unwrap();
        for comments in state.comments.values_mut() {
            comments.retain(|c| c.id != comment_id);
        }
        state.deleted.push(comment_id);
        Ok(())
    }

    async fn create_commit_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> Result<(), ReviewError> {
        let mut state = self.state.lock().unwrap();
        state.statuses.push(PostedStatus {
            org: org.to_string(),
            repo: repo.to_string(),
            sha: sha.to_string(),
            status: status.clone(),
        });
        Ok(())
    }
}

#[derive(Default)]
struct BuildsState {
    next_queue_id: u64,
    next_number: u64,
    queue: HashMap<String, QueueItem>,
    builds: HashMap<String, Build>,
    enqueued: Vec<(String, BuildParams)>,
    stopped: Vec<(String, u64)>,
    cancelled: Vec<u64>,
    unreachable: bool,
    start_on_miss: Option<String>,
}

impl BuildsState {
    fn start(&mut self, token: &str) {
        self.queue.remove(token);
        self.next_number += 1;
        let number = self.next_number;
        self.builds.insert(
            token.to_string(),
            Build {
                number,
                url: format!("https://ci.example.com/job/widgets-pr/{number}/"),
                building: true,
                result: None,
            },
        );
    }
}

/// A build server. Enqueued builds sit in the queue until `start` is called.
#[derive(Default)]
pub struct FakeBuilds {
    state: Mutex<BuildsState>,
}

impl FakeBuilds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a queued build onto an executor.
    pub fn start(&self, token: &str) {
        self.state.lock().unwrap().start(token);
    }

    /// The next `find_build` that misses `token` moves it onto an executor
    /// right after answering, as Jenkins does between two API reads.
    pub fn start_on_next_miss(&self, token: &str) {
        self.state.lock().unwrap().start_on_miss = Some(token.to_string());
    }

    pub fn finish(&self, token: &str, result: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(build) = state.builds.get_mut(token) {
            build.building = false;
            build.result = Some(result.to_string());
        }
    }

    /// Forget the build entirely, as after a Jenkins restart.
    pub fn vanish(&self, token: &str) {
        let mut state = self.state.lock().unwrap();
        state.queue.remove(token);
        state.builds.remove(token);
    }

    /// Make every lookup fail as if Jenkins were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    pub fn enqueued(&self) -> Vec<(String, BuildParams)> {
        self.state.lock().unwrap().enqueued.clone()
    }

    pub fn stopped(&self) -> Vec<(String, u64)> {
        self.state.lock().unwrap().stopped.clone()
    }

    pub fn cancelled(&self) -> Vec<u64> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// Tokens that are queued or building right now.
    pub fn live_tokens(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut live: Vec<String> = state.queue.keys().cloned().collect();
        live.extend(
            state
                .builds
                .iter()
                .filter(|(_, build)| build.building)
                .map(|(token, _)| token.clone()),
        );
        live
    }

    fn check_reachable(state: &BuildsState) -> Result<(), BuildError> {
        if state.unreachable {
            Err(BuildError::Api {
                status: 503,
                body: "Service Unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BuildService for FakeBuilds {
    async fn enqueue(&self, job: &str, params: &BuildParams) -> Result<(), BuildError> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        state.next_queue_id += 1;
        let id = state.next_queue_id;
        state.queue.insert(params.id.clone(), QueueItem { id });
        state.enqueued.push((job.to_string(), params.clone()));
        Ok(())
    }

    async fn find_queued(&self, token: &str) -> Result<Option<QueueItem>, BuildError> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        Ok(state.queue.get(token).cloned())
    }

    async fn find_build(&self, _job: &str, token: &str) -> Result<Option<Build>, BuildError> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        let found = state.builds.get(token).cloned();
        if found.is_none() && state.start_on_miss.as_deref() == Some(token) {
            state.start_on_miss = None;
            state.start(token);
        }
        Ok(found)
    }

    async fn stop(&self, job: &str, build_number: u64) -> Result<(), BuildError> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        for build in state.builds.values_mut() {
            if build.number == build_number {
                build.building = false;
                build.result = Some("ABORTED".to_string());
            }
        }
        state.stopped.push((job.to_string(), build_number));
        Ok(())
    }

    async fn cancel_queued(&self, queue_id: u64) -> Result<(), BuildError> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        state.queue.retain(|_, item| item.id != queue_id);
        state.cancelled.push(queue_id);
        Ok(())
    }

    fn job_url(&self, job: &str) -> String {
        format!("https://ci.example.com/job/{job}/")
    }
}

/// Keeps the last saved table and counts saves.
#[derive(Default)]
pub struct MemoryStore {
    table: Mutex<ReconciliationTable>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> ReconciliationTable {
        self.table.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl StateStore for MemoryStore {
    fn load_all(&self) -> Result<ReconciliationTable, StoreError> {
        Ok(self.table.lock().unwrap().clone())
    }

    fn save_all(&self, table: &ReconciliationTable) -> Result<(), StoreError> {
        *self.table.lock().unwrap() = table.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
