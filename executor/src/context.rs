use agentloop_models::ModelRegistry;
use agentloop_queue::PriorityQueue;
use agentloop_repo::RepositoryRegistry;
use agentloop_store::EventStore;
use agentloop_validator::TestRunConfig;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Everything a worker needs, cloned cheaply (every field is an `Arc` or a
/// handle type that is already `Clone`) into each spawned worker task.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) store: EventStore,
    pub(crate) queue: PriorityQueue,
    pub(crate) models: Arc<ModelRegistry>,
    pub(crate) repos: Arc<RepositoryRegistry>,
    pub(crate) test_config: Arc<TestRunConfig>,
    pub(crate) paused: Arc<AtomicBool>,
    pub(crate) get_timeout: Duration,
    pub(crate) pause_poll_interval: Duration,
    pub(crate) default_repo_alias: Arc<str>,
    repo_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl WorkerContext {
    pub(crate) fn new(
        store: EventStore,
        queue: PriorityQueue,
        models: Arc<ModelRegistry>,
        repos: Arc<RepositoryRegistry>,
        test_config: TestRunConfig,
        paused: Arc<AtomicBool>,
        get_timeout: Duration,
        pause_poll_interval: Duration,
        default_repo_alias: String,
    ) -> Self {
        Self {
            store,
            queue,
            models,
            repos,
            test_config: Arc::new(test_config),
            paused,
            get_timeout,
            pause_poll_interval,
            default_repo_alias: Arc::from(default_repo_alias.as_str()),
            repo_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the mutex guarding commits to `alias`, creating it on first
    /// use. Serializes same-repo writers without blocking workers touching
    /// a different repository (REDESIGN FLAG, spec.md §9).
    pub(crate) async fn repo_lock(&self, alias: &str) -> Arc<Mutex<()>> {
        let mut locks = self.repo_locks.lock().await;
        Arc::clone(
            locks
                .entry(alias.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
