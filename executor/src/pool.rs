use crate::context::WorkerContext;
use crate::error::ExecutorError;
use crate::error::Result;
use crate::state::WorkerState;
use crate::worker;
use agentloop_models::ModelRegistry;
use agentloop_queue::PriorityQueue;
use agentloop_repo::RepositoryRegistry;
use agentloop_store::EventStore;
use agentloop_validator::TestRunConfig;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tunables the original hardcoded into `task_executor.py`'s module scope,
/// lifted into named fields (REDESIGN FLAGS, spec.md §9).
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// How long a worker blocks on an empty queue before rechecking for
    /// cancellation, spec.md §4.6 step 2.
    pub get_timeout: Duration,
    /// How long a paused worker sleeps between checks of the pause flag.
    pub pause_poll_interval: Duration,
    /// Alias a task with no `target_repo` commits against.
    pub default_repo_alias: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            get_timeout: Duration::from_secs(2),
            pause_poll_interval: Duration::from_millis(200),
            default_repo_alias: "default".to_string(),
        }
    }
}

struct WorkerHandle {
    state: Arc<RwLock<WorkerState>>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Owns the pool of Task Executor workers: spawns them as independent
/// tokio tasks, tracks their state, and exposes the control surface
/// spec.md §4.6 lists (`start`/`stop`/`pause`/`resume`/`restart`/`status`).
pub struct ExecutorPool {
    ctx: WorkerContext,
    workers: RwLock<HashMap<String, WorkerHandle>>,
    next_id: AtomicU64,
}

impl ExecutorPool {
    pub fn new(
        store: EventStore,
        queue: PriorityQueue,
        models: Arc<ModelRegistry>,
        repos: Arc<RepositoryRegistry>,
        test_config: TestRunConfig,
        options: ExecutorOptions,
    ) -> Self {
        let ctx = WorkerContext::new(
            store,
            queue,
            models,
            repos,
            test_config,
            Arc::new(AtomicBool::new(false)),
            options.get_timeout,
            options.pause_poll_interval,
            options.default_repo_alias,
        );
        Self {
            ctx,
            workers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Spawns `n` additional workers.
    pub async fn start(&self, n: usize) {
        for _ in 0..n {
            self.spawn_worker().await;
        }
    }

    async fn spawn_worker(&self) -> String {
        let id = format!("worker-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let (state, cancel, join) = self.launch(id.clone());
        self.workers
            .write()
            .await
            .insert(id.clone(), WorkerHandle { state, cancel, join });
        id
    }

    fn launch(
        &self,
        worker_id: String,
    ) -> (Arc<RwLock<WorkerState>>, CancellationToken, JoinHandle<()>) {
        let state = Arc::new(RwLock::new(WorkerState::new()));
        let cancel = CancellationToken::new();
        let ctx = self.ctx.clone();
        let state_for_task = Arc::clone(&state);
        let cancel_for_task = cancel.clone();
        let join = tokio::spawn(async move {
            worker::run(ctx, worker_id, state_for_task, cancel_for_task).await;
        });
        (state, cancel, join)
    }

    /// Cooperatively cancels and joins every worker.
    pub async fn stop(&self) {
        let handles: Vec<WorkerHandle> = self.workers.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.cancel.cancel();
            let _ = handle.join.await;
        }
    }

    pub fn pause(&self) {
        self.ctx.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.ctx.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.ctx.paused.load(Ordering::SeqCst)
    }

    /// Cancels and rejoins the named worker, then respawns it under the
    /// same id with its counters reset.
    pub async fn restart(&self, worker_id: &str) -> Result<()> {
        let existing = self
            .workers
            .write()
            .await
            .remove(worker_id)
            .ok_or_else(|| ExecutorError::WorkerNotFound {
                worker_id: worker_id.to_string(),
            })?;
        existing.cancel.cancel();
        let _ = existing.join.await;

        let (state, cancel, join) = self.launch(worker_id.to_string());
        self.workers
            .write()
            .await
            .insert(worker_id.to_string(), WorkerHandle { state, cancel, join });
        Ok(())
    }

    pub async fn status(&self) -> Vec<(String, WorkerState)> {
        let workers = self.workers.read().await;
        let mut snapshot = Vec::with_capacity(workers.len());
        for (id, handle) in workers.iter() {
            snapshot.push((id.clone(), handle.state.read().await.clone()));
        }
        snapshot
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.read().await.len()
    }
}
