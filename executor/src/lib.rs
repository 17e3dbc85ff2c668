mod context;
mod error;
mod pool;
mod state;
mod worker;

pub use error::ExecutorError;
pub use error::Result;
pub use pool::ExecutorOptions;
pub use pool::ExecutorPool;
pub use state::TaskCompletionSummary;
pub use state::WorkerState;
pub use state::WorkerStatus;

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
    use agentloop_validator::TestRunConfig;
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

    #[tokio::test]
    async fn a_worker_generates_validates_and_commits_a_task() {
        let repo_dir = tempdir().unwrap();
        init_repo(repo_dir.path());

        let fixture_dir = tempdir().unwrap();
        let fixture_path = fixture_dir.path().join("response.txt");
        std::fs::write(&fixture_path, "# File: hello.txt\nhello world\n").unwrap();

        let store = EventStore::open_in_memory().await.unwrap();
        let queue = PriorityQueue::new(store.clone());
        let models = Arc::new(
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
        );

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
            .connect_local(repo_dir.path(), Some("default".to_string()), false)
            .await
            .unwrap();

        let test_config = TestRunConfig {
            test_command: vec!["true".to_string()],
            install_command: None,
            timeout: Duration::from_secs(5),
        };

        let pool = ExecutorPool::new(
            store.clone(),
            queue.clone(),
            models,
            repos,
            test_config,
            ExecutorOptions {
                get_timeout: Duration::from_millis(100),
                ..ExecutorOptions::default()
            },
        );

        let task = Task::new("t1".into(), "say hello".into(), 1, 3, None);
        queue.put(task).await.unwrap();
        pool.start(1).await;

        wait_for(
            || async {
                store
                    .get_task("t1")
                    .await
                    .map(|task| task.status.is_final())
                    .unwrap_or(false)
            },
            100,
        )
        .await;

        pool.stop().await;

        let completed = store.get_task("t1").await.unwrap();
        assert_eq!(completed.status, TaskStatus::Completed);
        assert!(repo_dir.path().join("hello.txt").exists());

        let commits = store.commits_for_task("t1").await.unwrap();
        assert_eq!(commits.len(), 1);
    }

    #[tokio::test]
    async fn a_task_that_never_produces_code_is_retried_then_fails() {
        let fixture_dir = tempdir().unwrap();
        let fixture_path = fixture_dir.path().join("response.txt");
        std::fs::write(&fixture_path, "no code here, just prose").unwrap();

        let store = EventStore::open_in_memory().await.unwrap();
        let queue = PriorityQueue::new(store.clone());
        let models = Arc::new(
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
        );

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

        let test_config = TestRunConfig {
            test_command: vec!["true".to_string()],
            install_command: None,
            timeout: Duration::from_secs(5),
        };

        let pool = ExecutorPool::new(
            store.clone(),
            queue.clone(),
            models,
            repos,
            test_config,
            ExecutorOptions {
                get_timeout: Duration::from_millis(50),
                ..ExecutorOptions::default()
            },
        );

        let task = Task::new("t2".into(), "say nothing useful".into(), 1, 1, None);
        queue.put(task).await.unwrap();
        pool.start(1).await;

        wait_for(
            || async {
                store
                    .get_task("t2")
                    .await
                    .map(|task| task.status == TaskStatus::Failed && task.retry_count >= 1)
                    .unwrap_or(false)
            },
            200,
        )
        .await;

        pool.stop().await;
        let final_task = store.get_task("t2").await.unwrap();
        assert_eq!(final_task.status, TaskStatus::Failed);
        assert_eq!(final_task.retry_count, 1);
    }

    #[tokio::test]
    async fn pause_stops_a_worker_from_picking_up_new_tasks() {
        let fixture_dir = tempdir().unwrap();
        let fixture_path = fixture_dir.path().join("response.txt");
        std::fs::write(&fixture_path, "# File: a.txt\nhi\n").unwrap();

        let store = EventStore::open_in_memory().await.unwrap();
        let queue = PriorityQueue::new(store.clone());
        let models = Arc::new(
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
        );
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

        let pool = ExecutorPool::new(
            store.clone(),
            queue.clone(),
            models,
            repos,
            TestRunConfig {
                test_command: vec!["true".to_string()],
                install_command: None,
                timeout: Duration::from_secs(5),
            },
            ExecutorOptions {
                get_timeout: Duration::from_millis(50),
                pause_poll_interval: Duration::from_millis(20),
                ..ExecutorOptions::default()
            },
        );
        pool.start(1).await;
        pool.pause();

        queue.put(Task::new("t3".into(), "x".into(), 1, 0, None)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(queue.size().await, 1, "paused worker must not dequeue tasks");

        pool.resume();
        wait_for(|| async { queue.is_empty().await }, 200).await;
        pool.stop().await;
    }
}
