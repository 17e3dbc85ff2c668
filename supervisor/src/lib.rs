mod checkpoint;
mod config;
mod error;
mod facade;
mod task_file;

pub use config::Config;
pub use config::TASK_FILE_NAME;
pub use error::Result;
pub use error::SupervisorError;
pub use facade::CommandFacade;
pub use facade::ConnectRequest;
pub use facade::PauseAction;
pub use facade::StatusSnapshot;

/// Parses and enqueues one task file, for the CLI's `--load-tasks FILE`
/// (spec.md §6); the supervisor's own startup/watch path calls the same
/// underlying routine.
pub async fn load_task_file_once(
    path: &std::path::Path,
    queue: &agentloop_queue::PriorityQueue,
    default_max_retries: u32,
) -> anyhow::Result<usize> {
    task_file::load_and_enqueue(path, queue, default_max_retries).await
}

use agentloop_executor::ExecutorOptions;
use agentloop_executor::ExecutorPool;
use agentloop_models::FileBackedAdapter;
use agentloop_models::HostedApiAdapter;
use agentloop_models::HttpLocalAdapter;
use agentloop_models::ModelAdapter;
use agentloop_models::ModelRegistry;
use agentloop_queue::PriorityQueue;
use agentloop_repo::RepositoryRegistry;
use agentloop_reviewer::ReviewerOptions;
use agentloop_reviewer::ReviewerPool;
use agentloop_store::EventStore;
use agentloop_validator::TestRunConfig;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Initializes every component, loads any prior snapshot, and owns the
/// three background timers plus the task-file loader. One `Supervisor` per
/// process, constructed once by `agentloop-cli`'s `serve` path (or directly
/// by integration tests), never a module-level singleton (REDESIGN FLAGS,
/// spec.md §9).
pub struct Supervisor {
    pub facade: Arc<CommandFacade>,
    store: EventStore,
    queue: PriorityQueue,
    config: Config,
    cancel: CancellationToken,
}

impl Supervisor {
    pub async fn init(config: Config) -> Result<Self> {
        let store = EventStore::open(&config.db_path).await?;
        let queue = PriorityQueue::new(store.clone());
        let restored = queue.initialize().await?;
        tracing::info!(restored, "restored open tasks from the event store");

        let repos_base = config.repos_base_dir.clone();
        let default_working_dir = repos_base.join("default");
        let repos = Arc::new(
            RepositoryRegistry::open(
                store.clone(),
                repos_base.join("cloned"),
                repos_base.join("repositories.json"),
                default_working_dir.clone(),
            )
            .await?,
        );

        // Tasks without a `target_repo` resolve to the alias "default"
        // (agentloop_executor::worker, agentloop_reviewer::pool); that
        // alias must actually be a registered binding, not just the
        // registry's fallback path, or `repos.get("default")` fails with
        // `RepoError::NotFound` and the commit/review steps silently
        // no-op. Idempotent: a restart finds the binding already present.
        if repos.get("default").await.is_err() {
            tokio::fs::create_dir_all(&default_working_dir).await?;
            repos
                .connect_local(&default_working_dir, Some("default".to_string()), true)
                .await?;
        }

        let adapters: Vec<Arc<dyn ModelAdapter>> = vec![
            Arc::new(HttpLocalAdapter::new(
                config.model_base_url.clone(),
                config.model_name.clone(),
            )),
            Arc::new(HostedApiAdapter::new(
                config.model_base_url.clone(),
                config.model_api_key.clone().unwrap_or_default(),
                config.model_name.clone(),
            )),
            Arc::new(FileBackedAdapter::new(
                config.model_file_path.clone(),
                config.model_name.clone(),
            )),
        ];
        let models = Arc::new(ModelRegistry::new(adapters, config.model_type, store.clone()).await?);

        let test_config = TestRunConfig {
            test_command: config.test_command.clone(),
            install_command: config.install_command.clone(),
            timeout: config.task_timeout,
        };
        let executor = Arc::new(ExecutorPool::new(
            store.clone(),
            queue.clone(),
            Arc::clone(&models),
            Arc::clone(&repos),
            test_config,
            ExecutorOptions::default(),
        ));

        let reviewer = Arc::new(ReviewerPool::new(
            store.clone(),
            queue.clone(),
            Arc::clone(&repos),
            Arc::clone(&models),
            ReviewerOptions {
                review_interval: config.review_interval,
                deep_analysis_interval: config.deep_review_interval,
                major_task_grace_period: std::time::Duration::from_secs(
                    config.major_task_grace_period_days.max(0) as u64 * 86_400,
                ),
                create_follow_ups: config.create_followup_tasks,
                ..ReviewerOptions::default()
            },
        ));

        let snapshot = store.load_snapshot().await?;
        let uptime_start = snapshot
            .as_ref()
            .map(|snapshot| snapshot.uptime_start)
            .unwrap_or_else(Utc::now);
        let last_checkpoint = snapshot.as_ref().and_then(|snapshot| snapshot.last_checkpoint);

        let facade = Arc::new(CommandFacade::new(
            store.clone(),
            queue.clone(),
            Arc::clone(&repos),
            Arc::clone(&models),
            Arc::clone(&executor),
            Arc::clone(&reviewer),
            uptime_start,
            last_checkpoint,
            config.checkpoint_days,
            config.max_connected_repos,
            config.branch.clone(),
            config.max_retries,
        ));

        Ok(Self {
            facade,
            store,
            queue,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Starts every worker and background timer, then blocks until either a
    /// shutdown signal (SIGINT/SIGTERM) arrives or [`Supervisor::shutdown`]
    /// is called from elsewhere (e.g. the HTTP façade's own signal handler
    /// sharing this token). Returns once every task has joined.
    pub async fn run(&self) -> Result<()> {
        self.facade.executor.start(self.config.worker_count).await;
        if self.config.reviewer_enabled {
            self.facade.reviewer.start().await;
        }

        self.spawn_snapshot_timer();
        self.spawn_retention_timer();
        self.spawn_checkpoint_timer();
        self.spawn_task_file_watcher();

        tokio::select! {
            _ = wait_for_shutdown_signal() => {}
            _ = self.cancel.cancelled() => {}
        }
        self.cancel.cancel();

        tracing::info!("shutting down: stopping workers and reviewers");
        self.facade.executor.stop().await;
        self.facade.reviewer.stop().await;
        self.save_snapshot().await;
        Ok(())
    }

    /// Cooperative shutdown trigger for callers embedding the Supervisor
    /// alongside another task (e.g. the HTTP server in `agentloop-api`).
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// A cloned queue handle for callers that need to enqueue outside the
    /// façade, e.g. the CLI's `--load-tasks`.
    pub fn queue_handle(&self) -> PriorityQueue {
        self.queue.clone()
    }

    async fn save_snapshot(&self) {
        let worker_states = serde_json::json!(
            self.facade
                .executor
                .status()
                .await
                .into_iter()
                .map(|(id, state)| (id, state))
                .collect::<std::collections::HashMap<_, _>>()
        );
        let queue_stats = serde_json::json!(self.queue.stats().await);
        let last_checkpoint = *self.facade.last_checkpoint.lock().await;
        if let Err(err) = self
            .store
            .save_snapshot(self.facade.uptime_start, last_checkpoint, &worker_states, &queue_stats)
            .await
        {
            tracing::error!(error = %err, "failed to save final snapshot");
        }
    }

    fn spawn_snapshot_timer(&self) {
        let store = self.store.clone();
        let facade = Arc::clone(&self.facade);
        let queue = self.queue.clone();
        let uptime_start = self.facade.uptime_start;
        let interval = self.config.state_save_interval;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
                let worker_states = serde_json::json!(
                    facade
                        .executor
                        .status()
                        .await
                        .into_iter()
                        .collect::<std::collections::HashMap<_, _>>()
                );
                let queue_stats = serde_json::json!(queue.stats().await);
                let last_checkpoint = *facade.last_checkpoint.lock().await;
                if let Err(err) = store
                    .save_snapshot(uptime_start, last_checkpoint, &worker_states, &queue_stats)
                    .await
                {
                    tracing::error!(error = %err, "periodic snapshot save failed");
                }
            }
        });
    }

    fn spawn_retention_timer(&self) {
        let store = self.store.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(config::RETENTION_INTERVAL) => {}
                }
                match store
                    .prune_events(config::EVENT_RETENTION_DAYS * 86_400)
                    .await
                {
                    Ok(pruned) if pruned > 0 => tracing::info!(pruned, "pruned old events"),
                    Ok(_) => {}
                    Err(err) => tracing::error!(error = %err, "event retention pass failed"),
                }
                match store
                    .prune_completed(config::COMPLETED_TASK_RETENTION_DAYS * 86_400)
                    .await
                {
                    Ok(pruned) if pruned > 0 => tracing::info!(pruned, "pruned old completed tasks"),
                    Ok(_) => {}
                    Err(err) => tracing::error!(error = %err, "task retention pass failed"),
                }
            }
        });
    }

    fn spawn_checkpoint_timer(&self) {
        let facade = Arc::clone(&self.facade);
        let store = self.store.clone();
        let checkpoint_days = self.config.checkpoint_days;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(config::CHECKPOINT_POLL_INTERVAL) => {}
                }

                let last_checkpoint = *facade.last_checkpoint.lock().await;
                let baseline = last_checkpoint.unwrap_or(facade.uptime_start);
                let days_since = (Utc::now() - baseline).num_days();
                if days_since < checkpoint_days {
                    continue;
                }

                tracing::info!("checkpoint due, pausing workers");
                run_checkpoint(&facade, &store, baseline, &cancel).await;
            }
        });
    }

    fn spawn_task_file_watcher(&self) {
        let path = PathBuf::from(TASK_FILE_NAME);
        let queue = self.queue.clone();
        let default_max_retries = self.config.max_retries;
        let cancel = self.cancel.clone();

        if path.exists() {
            let queue_initial = queue.clone();
            let path_initial = path.clone();
            tokio::spawn(async move {
                match task_file::load_and_enqueue(&path_initial, &queue_initial, default_max_retries).await
                {
                    Ok(count) => tracing::info!(count, "loaded tasks from tasks.yaml at startup"),
                    Err(err) => tracing::warn!(error = %err, "failed to load tasks.yaml at startup"),
                }
            });
        }

        task_file::spawn_watcher(path, queue, default_max_retries, cancel);
    }
}

/// Runs the checkpoint sequence: pause, render, mark, wait for resume. A
/// failing render still resumes workers (spec.md §4.8: "a failing
/// checkpoint must still resume workers").
async fn run_checkpoint(
    facade: &Arc<CommandFacade>,
    store: &EventStore,
    window_start: chrono::DateTime<Utc>,
    cancel: &CancellationToken,
) {
    facade.executor.pause();
    let now = Utc::now();

    match checkpoint::render_summary(store, window_start, now).await {
        Ok(body) => match checkpoint::write_report(window_start, now, &body).await {
            Ok(path) => tracing::info!(path = %path.display(), "wrote checkpoint report"),
            Err(err) => tracing::error!(error = %err, "failed to write checkpoint report"),
        },
        Err(err) => tracing::error!(error = %err, "failed to render checkpoint report"),
    }

    *facade.last_checkpoint.lock().await = Some(now);

    tracing::info!("checkpoint complete, waiting for operator resume");
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = facade.resume_signal.notified() => {}
    }
    facade.executor.resume();
    tracing::info!("resumed after checkpoint");
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::signal;
        use tokio::signal::unix::SignalKind;
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
