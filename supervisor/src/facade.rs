use crate::error::Result;
use crate::error::SupervisorError;
use agentloop_executor::ExecutorPool;
use agentloop_executor::WorkerState;
use agentloop_models::BackendKind;
use agentloop_models::ModelRegistry;
use agentloop_queue::PriorityQueue;
use agentloop_queue::QueueStats;
use agentloop_repo::CommitOutcome;
use agentloop_repo::PullOutcome;
use agentloop_repo::RepositoryRegistry;
use agentloop_repo::ScanResult;
use agentloop_reviewer::ReviewFindings;
use agentloop_reviewer::ReviewStatsSnapshot;
use agentloop_reviewer::ReviewerPool;
use agentloop_store::CommitRecord;
use agentloop_store::Event;
use agentloop_store::RepositoryBinding;
use agentloop_store::ReviewFinding;
use agentloop_store::Task;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::Notify;

/// Aggregated view backing `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub is_paused: bool,
    pub uptime_start: DateTime<Utc>,
    pub last_checkpoint: Option<DateTime<Utc>>,
    pub checkpoint_due: DateTime<Utc>,
    pub workers: Vec<WorkerStatusEntry>,
    pub queue: QueueStats,
    pub active_model: String,
    pub repositories: Vec<RepositoryBinding>,
}

#[derive(Debug, Serialize)]
pub struct WorkerStatusEntry {
    pub worker_id: String,
    #[serde(flatten)]
    pub state: WorkerState,
}

/// What `POST /pause {action}` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseAction {
    Pause,
    Resume,
    Toggle,
}

impl PauseAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pause" => Some(Self::Pause),
            "resume" => Some(Self::Resume),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

/// Everything `GET /repositories/connect` needs; maps directly onto
/// spec.md §6's `POST /repositories/connect` body.
pub struct ConnectRequest {
    pub remote: bool,
    pub location: String,
    pub alias: Option<String>,
    pub branch: Option<String>,
    pub initialize_git: bool,
}

/// Single façade every transport (the axum routes in `agentloop-api`, the
/// CLI's `serve` subcommand, this crate's own integration tests) calls
/// through. One method per `Control API` row in spec.md §6.
pub struct CommandFacade {
    pub(crate) store: agentloop_store::EventStore,
    pub(crate) queue: PriorityQueue,
    pub(crate) repos: Arc<RepositoryRegistry>,
    pub(crate) models: Arc<ModelRegistry>,
    pub(crate) executor: Arc<ExecutorPool>,
    pub(crate) reviewer: Arc<ReviewerPool>,
    pub(crate) uptime_start: DateTime<Utc>,
    pub(crate) last_checkpoint: Mutex<Option<DateTime<Utc>>>,
    pub(crate) checkpoint_days: i64,
    pub(crate) max_connected_repos: usize,
    pub(crate) default_branch: String,
    pub(crate) default_max_retries: u32,
    pub(crate) is_running: AtomicBool,
    pub(crate) resume_signal: Notify,
}

impl CommandFacade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: agentloop_store::EventStore,
        queue: PriorityQueue,
        repos: Arc<RepositoryRegistry>,
        models: Arc<ModelRegistry>,
        executor: Arc<ExecutorPool>,
        reviewer: Arc<ReviewerPool>,
        uptime_start: DateTime<Utc>,
        last_checkpoint: Option<DateTime<Utc>>,
        checkpoint_days: i64,
        max_connected_repos: usize,
        default_branch: String,
        default_max_retries: u32,
    ) -> Self {
        Self {
            store,
            queue,
            repos,
            models,
            executor,
            reviewer,
            uptime_start,
            last_checkpoint: Mutex::new(last_checkpoint),
            checkpoint_days,
            max_connected_repos,
            default_branch,
            default_max_retries,
            is_running: AtomicBool::new(true),
            resume_signal: Notify::new(),
        }
    }

    /// The `MAX_RETRIES` default applied to tasks enqueued without their
    /// own override, e.g. the CLI's `--load-tasks`.
    pub fn default_max_retries(&self) -> u32 {
        self.default_max_retries
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        let workers = self
            .executor
            .status()
            .await
            .into_iter()
            .map(|(worker_id, state)| WorkerStatusEntry { worker_id, state })
            .collect();
        let last_checkpoint = *self.last_checkpoint.lock().await;
        let checkpoint_due =
            (last_checkpoint.unwrap_or(self.uptime_start)) + chrono::Duration::days(self.checkpoint_days);
        Ok(StatusSnapshot {
            is_running: self.is_running.load(Ordering::SeqCst),
            is_paused: self.executor.is_paused(),
            uptime_start: self.uptime_start,
            last_checkpoint,
            checkpoint_due,
            workers,
            queue: self.queue.stats().await,
            active_model: self.models.active_kind().await.as_str().to_string(),
            repositories: self.repos.list().await,
        })
    }

    pub async fn logs(&self, limit: i64) -> Result<Vec<Event>> {
        Ok(self.store.recent_events(None, limit).await?)
    }

    pub async fn enqueue_task(
        &self,
        description: String,
        priority: i64,
        target_repo: Option<String>,
    ) -> Result<String> {
        let task = Task::new(
            uuid::Uuid::new_v4().to_string(),
            description,
            priority,
            self.default_max_retries,
            target_repo,
        );
        let task_id = task.id.clone();
        self.queue.put(task).await?;
        Ok(task_id)
    }

    /// `POST /pause`. Only the primary worker pool is paused: the reviewer
    /// keeps running, matching the checkpoint sequence's own scope (spec.md
    /// §4.8 pauses "workers", not the reviewer).
    pub fn pause(&self, action: PauseAction) -> bool {
        let currently_paused = self.executor.is_paused();
        let should_pause = match action {
            PauseAction::Pause => true,
            PauseAction::Resume => false,
            PauseAction::Toggle => !currently_paused,
        };
        if should_pause {
            self.executor.pause();
        } else {
            self.executor.resume();
            self.resume_signal.notify_waiters();
        }
        should_pause
    }

    pub async fn restart_worker(&self, worker_id: &str) -> Result<()> {
        Ok(self.executor.restart(worker_id).await?)
    }

    pub async fn switch_model(&self, kind: BackendKind) -> bool {
        self.models.switch(kind).await
    }

    pub async fn recent_commits(&self, limit: i64) -> Result<Vec<CommitRecord>> {
        Ok(self.store.recent_commits(limit).await?)
    }

    pub async fn list_repositories(&self) -> Vec<RepositoryBinding> {
        self.repos.list().await
    }

    pub async fn connect_repository(&self, request: ConnectRequest) -> Result<RepositoryBinding> {
        if self.repos.list().await.len() >= self.max_connected_repos {
            return Err(SupervisorError::Configuration(format!(
                "MAX_CONNECTED_REPOS ({}) reached",
                self.max_connected_repos
            )));
        }
        let binding = if request.remote {
            let branch = request.branch.unwrap_or_else(|| self.default_branch.clone());
            self.repos
                .connect_remote(&request.location, request.alias, &branch)
                .await?
        } else {
            self.repos
                .connect_local(
                    std::path::Path::new(&request.location),
                    request.alias,
                    request.initialize_git,
                )
                .await?
        };
        Ok(binding)
    }

    pub async fn disconnect_repository(&self, alias: &str) -> Result<()> {
        Ok(self.repos.disconnect(alias, false).await?)
    }

    pub async fn pull_repository(&self, alias: &str) -> Result<PullOutcome> {
        Ok(self.repos.pull(alias).await?)
    }

    pub async fn push_repository(&self, alias: &str) -> Result<CommitOutcome> {
        Ok(self.repos.commit_and_push(alias, None).await?)
    }

    pub async fn scan_repository(&self, alias: &str) -> Result<ScanResult> {
        Ok(self.repos.scan(alias).await?)
    }

    pub async fn reviewer_status(&self) -> ReviewStatsSnapshot {
        self.reviewer.stats().await
    }

    pub async fn force_review(&self, task_id: &str) -> Result<ReviewFindings> {
        Ok(self.reviewer.force_review(task_id).await?)
    }

    pub async fn review_results(&self, task_id: &str) -> Result<Vec<ReviewFinding>> {
        Ok(self.store.review_findings_for_task(task_id).await?)
    }
}
