mod analysis;
mod error;
mod pool;
mod stats;

pub use analysis::is_major_task;
pub use analysis::DeepFindings;
pub use analysis::ReviewFindings;
pub use error::ReviewerError;
pub use error::Result;
pub use pool::ReviewerOptions;
pub use pool::ReviewerPool;
pub use stats::ReviewStatsSnapshot;

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_models::BackendKind;
    use agentloop_models::FileBackedAdapter;
    use agentloop_models::ModelRegistry;
    use agentloop_queue::PriorityQueue;
    use agentloop_repo::RepositoryRegistry;
    use agentloop_store::EventStore;
    use agentloop_store::Task;
    use agentloop_store::TaskStatus;
    use std::process::Command;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn run_git(dir: &std::path::Path, args: &[&str]) {
        let status = Command::new("git")
            .current_dir(dir)
            .args(args)
            .status()
            .expect("git command");
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo(dir: &std::path::Path) {
        run_git(dir, &["init", "--initial-branch=main"]);
        run_git(dir, &["config", "user.email", "test@example.com"]);
        run_git(dir, &["config", "user.name", "Test"]);
        std::fs::write(dir.join(".gitkeep"), "").unwrap();
        run_git(dir, &["add", "."]);
        run_git(dir, &["commit", "-m", "init"]);
    }

    async fn wait_for<F, Fut>(mut poll: F, attempts: usize)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..attempts {
            if poll().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not met in time");
    }

    async fn make_registry(
        store: &EventStore,
        repo_dir: &std::path::Path,
    ) -> Arc<RepositoryRegistry> {
        let registry_base = tempdir().unwrap();
        let repos = Arc::new(
            RepositoryRegistry::open(
                store.clone(),
                registry_base.path().join("repos"),
                registry_base.path().join("repositories.json"),
                registry_base.path().join("default"),
            )
            .await
            .unwrap(),
        );
        repos
            .connect_local(repo_dir, Some("default".to_string()), false)
            .await
            .unwrap();
        // Keep the tempdir alive by leaking it; the registry only stores a path.
        std::mem::forget(registry_base);
        repos
    }

    async fn fixture_models(store: &EventStore, response: &str) -> Arc<ModelRegistry> {
        let fixture_dir = tempdir().unwrap();
        let fixture_path = fixture_dir.path().join("response.txt");
        std::fs::write(&fixture_path, response).unwrap();
        std::mem::forget(fixture_dir);
        Arc::new(
            ModelRegistry::new(
                vec![Arc::new(FileBackedAdapter::new(
                    fixture_path,
                    "fixture".to_string(),
                ))],
                BackendKind::FileBacked,
                store.clone(),
            )
            .await
            .unwrap(),
        )
    }

    async fn completed_task_with_files(
        store: &EventStore,
        repo_dir: &std::path::Path,
        task_id: &str,
        description: &str,
        files: &[(&str, &str)],
    ) -> Task {
        for (name, content) in files {
            std::fs::write(repo_dir.join(name), content).unwrap();
        }
        let payload = serde_json::json!({
            "files": files.iter().map(|(name, _)| name).collect::<Vec<_>>(),
        });
        let task = Task::new(task_id.to_string(), description.to_string(), 1, 1, None);
        store.record_task_created(&task).await.unwrap();
        store.mark_started(task_id, "worker-1").await.unwrap();
        store
            .mark_completed(task_id, &payload.to_string())
            .await
            .unwrap();
        store.get_task(task_id).await.unwrap()
    }

    #[tokio::test]
    async fn force_review_flags_bare_except_and_creates_a_follow_up() {
        let repo_dir = tempdir().unwrap();
        init_repo(repo_dir.path());

        let store = EventStore::open_in_memory().await.unwrap();
        let queue = PriorityQueue::new(store.clone());
        let repos = make_registry(&store, repo_dir.path()).await;
        let models = fixture_models(&store, "no code here").await;

        let task = completed_task_with_files(
            &store,
            repo_dir.path(),
            "rev-1",
            "a quick fix",
            &[(
                "bad.py",
                "def f():\n    try:\n        pass\n    except:\n        print('x')\n",
            )],
        )
        .await;
        assert_eq!(task.status, TaskStatus::Completed);

        let reviewer = ReviewerPool::new(
            store.clone(),
            queue.clone(),
            repos,
            models,
            ReviewerOptions {
                follow_up_issue_threshold: 1,
                ..ReviewerOptions::default()
            },
        );

        let findings = reviewer.force_review("rev-1").await.unwrap();
        assert!(findings.syntax_issues.iter().any(|i| i.contains("Bare except")));
        assert!(findings.syntax_issues.iter().any(|i| i.contains("Print statement")));

        let stored = store.review_findings_for_task("rev-1").await.unwrap();
        assert!(!stored.is_empty());
    }

    #[tokio::test]
    async fn force_review_rejects_a_task_that_has_not_completed() {
        let repo_dir = tempdir().unwrap();
        init_repo(repo_dir.path());
        let store = EventStore::open_in_memory().await.unwrap();
        let queue = PriorityQueue::new(store.clone());
        let repos = make_registry(&store, repo_dir.path()).await;
        let models = fixture_models(&store, "no code here").await;

        let task = Task::new("pending-1".into(), "still running".into(), 1, 1, None);
        store.record_task_created(&task).await.unwrap();

        let reviewer = ReviewerPool::new(
            store.clone(),
            queue.clone(),
            repos,
            models,
            ReviewerOptions::default(),
        );

        let err = reviewer.force_review("pending-1").await.unwrap_err();
        assert!(matches!(err, ReviewerError::NotCompleted { .. }));
    }

    #[tokio::test]
    async fn primary_loop_reviews_recently_completed_tasks_on_a_short_interval() {
        let repo_dir = tempdir().unwrap();
        init_repo(repo_dir.path());
        let store = EventStore::open_in_memory().await.unwrap();
        let queue = PriorityQueue::new(store.clone());
        let repos = make_registry(&store, repo_dir.path()).await;
        let models = fixture_models(&store, "no code here").await;

        completed_task_with_files(
            &store,
            repo_dir.path(),
            "rev-2",
            "minor tweak",
            &[("weird.py", "eval(x)\n")],
        )
        .await;

        let reviewer = ReviewerPool::new(
            store.clone(),
            queue.clone(),
            repos,
            models,
            ReviewerOptions {
                review_interval: Duration::from_millis(20),
                deep_analysis_interval: Duration::from_secs(3600),
                ..ReviewerOptions::default()
            },
        );
        reviewer.start().await;

        wait_for(
            || async { reviewer.stats().await.tasks_reviewed > 0 },
            200,
        )
        .await;

        reviewer.stop().await;

        let stats = reviewer.stats().await;
        assert!(stats.tasks_reviewed > 0);
        assert!(stats.issues_discovered > 0);
    }

    #[tokio::test]
    async fn major_tasks_are_respected_within_the_grace_period() {
        let repo_dir = tempdir().unwrap();
        init_repo(repo_dir.path());
        let store = EventStore::open_in_memory().await.unwrap();
        let queue = PriorityQueue::new(store.clone());
        let repos = make_registry(&store, repo_dir.path()).await;
        let models = fixture_models(&store, "no code here").await;

        completed_task_with_files(
            &store,
            repo_dir.path(),
            "rev-3",
            "major refactor of the billing module",
            &[("danger.py", "eval(x)\n")],
        )
        .await;

        let reviewer = ReviewerPool::new(
            store.clone(),
            queue.clone(),
            repos,
            models,
            ReviewerOptions {
                review_interval: Duration::from_millis(20),
                deep_analysis_interval: Duration::from_secs(3600),
                major_task_grace_period: Duration::from_secs(7 * 24 * 3600),
                ..ReviewerOptions::default()
            },
        );
        reviewer.start().await;

        wait_for(
            || async { reviewer.stats().await.major_tasks_respected > 0 },
            200,
        )
        .await;

        reviewer.stop().await;

        let stats = reviewer.stats().await;
        assert_eq!(stats.tasks_reviewed, 0);
        assert!(stats.major_tasks_respected > 0);
    }
}
