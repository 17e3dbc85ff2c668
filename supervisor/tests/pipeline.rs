//! End-to-end coverage of the scenarios in spec.md §8: a real `Supervisor`
//! wired against a `FileBackedAdapter` fixture and `tempfile`/`git`-backed
//! repositories, driving tasks through the full generate→validate→commit
//! pipeline exactly as `agentloop-cli`'s `serve` subcommand would.

use agentloop_models::BackendKind;
use agentloop_store::EventStore;
use agentloop_store::TaskStatus;
use agentloop_supervisor::ConnectRequest;
use agentloop_supervisor::PauseAction;
use agentloop_supervisor::Config;
use agentloop_supervisor::Supervisor;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(dir)
        .args(args)
        .status()
        .expect("git command");
    assert!(status.success(), "git {args:?} failed");
}

/// A repository with an identity already configured, so `commit_and_push`
/// never fails on a missing `user.email`/`user.name` the way a bare `git
/// init` (as the Supervisor itself performs for an unbound alias) would if
/// the host has no global git config.
fn init_repo(dir: &Path) {
    run_git(dir, &["init", "--initial-branch=main"]);
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test"]);
    std::fs::write(dir.join(".gitkeep"), "").unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-m", "init"]);
}

fn base_config(tmp: &Path, fixture_path: PathBuf) -> Config {
    Config {
        model_type: BackendKind::FileBacked,
        model_name: "fixture".to_string(),
        model_base_url: "http://localhost:0".to_string(),
        model_api_key: None,
        model_file_path: fixture_path,

        worker_count: 1,
        max_retries: 3,
        task_timeout: Duration::from_secs(5),

        http_host: "127.0.0.1".to_string(),
        http_port: 0,

        db_path: tmp.join("agentloop.sqlite"),

        branch: "main".to_string(),
        auto_push: false,

        checkpoint_days: 7,
        state_save_interval: Duration::from_secs(3600),

        log_level: "error".to_string(),
        max_log_entries: 10_000,

        reviewer_workers: 1,
        review_interval: Duration::from_secs(300),
        deep_review_interval: Duration::from_secs(1800),
        reviewer_enabled: false,
        create_followup_tasks: true,
        major_task_grace_period_days: 7,

        repos_base_dir: tmp.join("repos"),
        max_connected_repos: 10,
        auto_pull_updates: false,
        auto_scan_repos: false,

        test_command: vec!["true".to_string()],
        install_command: None,
    }
}

/// Pre-creates and `git init`s the implicit default repository's working
/// directory before `Supervisor::init` runs, so the binding it wires in
/// gets a working identity rather than a bare `git init` with none.
fn prepare_default_repo(config: &Config) -> PathBuf {
    let default_dir = config.repos_base_dir.join("default");
    std::fs::create_dir_all(&default_dir).unwrap();
    init_repo(&default_dir);
    default_dir
}

async fn spawn_supervisor(config: Config) -> (Arc<Supervisor>, tokio::task::JoinHandle<()>) {
    let supervisor = Arc::new(Supervisor::init(config).await.unwrap());
    let handle = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            let _ = supervisor.run().await;
        })
    };
    (supervisor, handle)
}

async fn shutdown(supervisor: Arc<Supervisor>, handle: tokio::task::JoinHandle<()>) {
    supervisor.shutdown_handle().cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
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

/// Scenario 1 (spec.md §8): a task with no `target_repo` resolves to the
/// implicit "default" repository, commits, and is recorded as completed.
/// Regression coverage for the default-alias binding never being wired at
/// startup.
#[tokio::test]
async fn happy_path_commits_to_the_implicit_default_repository() {
    let tmp = tempdir().unwrap();
    let fixture_path = tmp.path().join("response.txt");
    std::fs::write(
        &fixture_path,
        "# File: factorial.txt\nfn factorial(n: u64) -> u64 { if n == 0 { 1 } else { n * factorial(n - 1) } }\n",
    )
    .unwrap();

    let config = base_config(tmp.path(), fixture_path);
    let default_dir = prepare_default_repo(&config);
    let (supervisor, handle) = spawn_supervisor(config.clone()).await;

    let task_id = supervisor
        .facade
        .enqueue_task("Write a factorial function".to_string(), 0, None)
        .await
        .unwrap();

    let store = EventStore::open(&config.db_path).await.unwrap();
    wait_for(
        || async {
            store
                .get_task(&task_id)
                .await
                .map(|task| task.status.is_final())
                .unwrap_or(false)
        },
        200,
    )
    .await;

    let completed = store.get_task(&task_id).await.unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);

    let commits = store.commits_for_task(&task_id).await.unwrap();
    assert_eq!(commits.len(), 1, "expected exactly one commit for the task");
    assert!(default_dir.join("factorial.txt").exists());

    shutdown(supervisor, handle).await;
}

/// Scenario 2: the first attempt produces unparseable code (InvalidGeneration),
/// the task retries with a decremented priority, and the second attempt
/// succeeds once the fixture is corrected.
#[tokio::test]
async fn a_task_retries_after_invalid_generation_then_succeeds() {
    let tmp = tempdir().unwrap();
    let fixture_path = tmp.path().join("response.txt");
    std::fs::write(&fixture_path, "# File: script.txt\nfn broken( {\n").unwrap();

    let mut config = base_config(tmp.path(), fixture_path.clone());
    config.max_retries = 5;
    prepare_default_repo(&config);
    let (supervisor, handle) = spawn_supervisor(config.clone()).await;

    let task_id = supervisor
        .facade
        .enqueue_task("fix the broken function".to_string(), 3, None)
        .await
        .unwrap();

    let store = EventStore::open(&config.db_path).await.unwrap();
    wait_for(
        || async {
            store
                .get_task(&task_id)
                .await
                .map(|task| task.retry_count >= 1)
                .unwrap_or(false)
        },
        200,
    )
    .await;

    std::fs::write(&fixture_path, "# File: script.txt\nfn fixed() {}\n").unwrap();

    wait_for(
        || async {
            store
                .get_task(&task_id)
                .await
                .map(|task| task.status.is_final())
                .unwrap_or(false)
        },
        200,
    )
    .await;

    let completed = store.get_task(&task_id).await.unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);
    assert!(completed.retry_count >= 1);
    assert!(
        completed.priority < 3,
        "priority should have been decremented on retry, was {}",
        completed.priority
    );

    shutdown(supervisor, handle).await;
}

/// Scenario 3 / boundary: `max_retries = 0` means a failing task never
/// re-enters the queue and ends up terminally failed after one attempt.
#[tokio::test]
async fn exhausting_retries_leaves_the_task_terminally_failed() {
    let tmp = tempdir().unwrap();
    let fixture_path = tmp.path().join("response.txt");
    std::fs::write(&fixture_path, "# File: script.txt\nfn broken( {\n").unwrap();

    let mut config = base_config(tmp.path(), fixture_path);
    config.max_retries = 0;
    prepare_default_repo(&config);
    let (supervisor, handle) = spawn_supervisor(config.clone()).await;

    let task_id = supervisor
        .facade
        .enqueue_task("write something".to_string(), 0, None)
        .await
        .unwrap();

    let store = EventStore::open(&config.db_path).await.unwrap();
    wait_for(
        || async {
            store
                .get_task(&task_id)
                .await
                .map(|task| task.status.is_final())
                .unwrap_or(false)
        },
        200,
    )
    .await;

    let failed = store.get_task(&task_id).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.retry_count, 0);

    let status = supervisor.facade.status().await.unwrap();
    assert_eq!(status.queue.size, 0, "a terminally failed task must not grow the queue");

    shutdown(supervisor, handle).await;
}

/// Scenario 6: two connected repositories stay isolated — each task's
/// commit lands only in its own target repository, and a scan of one
/// alias never surfaces the other's issues.
#[tokio::test]
async fn two_target_repositories_stay_isolated() {
    let tmp = tempdir().unwrap();
    let fixture_path = tmp.path().join("response.txt");
    std::fs::write(&fixture_path, "# File: note.txt\nhello\n").unwrap();

    let mut config = base_config(tmp.path(), fixture_path);
    config.worker_count = 2;
    prepare_default_repo(&config);

    let alpha_dir = tmp.path().join("alpha");
    let beta_dir = tmp.path().join("beta");
    std::fs::create_dir_all(&alpha_dir).unwrap();
    std::fs::create_dir_all(&beta_dir).unwrap();
    // Pre-existing content, not generated by either task: proves `scan` is a
    // read-only per-alias walk rather than something keyed off the task.
    std::fs::write(alpha_dir.join("notes.rs"), "// TODO: fix this\nfn main() {}\n").unwrap();
    init_repo(&alpha_dir);
    init_repo(&beta_dir);

    let (supervisor, handle) = spawn_supervisor(config.clone()).await;

    supervisor
        .facade
        .connect_repository(ConnectRequest {
            remote: false,
            location: alpha_dir.to_string_lossy().to_string(),
            alias: Some("alpha".to_string()),
            branch: None,
            initialize_git: false,
        })
        .await
        .unwrap();
    supervisor
        .facade
        .connect_repository(ConnectRequest {
            remote: false,
            location: beta_dir.to_string_lossy().to_string(),
            alias: Some("beta".to_string()),
            branch: None,
            initialize_git: false,
        })
        .await
        .unwrap();

    let alpha_task = supervisor
        .facade
        .enqueue_task("write to alpha".to_string(), 0, Some("alpha".to_string()))
        .await
        .unwrap();
    let beta_task = supervisor
        .facade
        .enqueue_task("write to beta".to_string(), 0, Some("beta".to_string()))
        .await
        .unwrap();

    let store = EventStore::open(&config.db_path).await.unwrap();
    wait_for(
        || async {
            let alpha_done = store
                .get_task(&alpha_task)
                .await
                .map(|task| task.status.is_final())
                .unwrap_or(false);
            let beta_done = store
                .get_task(&beta_task)
                .await
                .map(|task| task.status.is_final())
                .unwrap_or(false);
            alpha_done && beta_done
        },
        300,
    )
    .await;

    assert_eq!(store.get_task(&alpha_task).await.unwrap().status, TaskStatus::Completed);
    assert_eq!(store.get_task(&beta_task).await.unwrap().status, TaskStatus::Completed);
    assert!(alpha_dir.join("note.txt").exists());
    assert!(beta_dir.join("note.txt").exists());
    assert!(
        !config.repos_base_dir.join("default").join("note.txt").exists(),
        "a targeted task must not write into the default repository"
    );

    let alpha_scan = supervisor.facade.scan_repository("alpha").await.unwrap();
    assert!(alpha_scan.tasks.iter().any(|task| task.file.contains("notes.rs")));

    let beta_scan = supervisor.facade.scan_repository("beta").await.unwrap();
    assert!(
        beta_scan.tasks.is_empty(),
        "beta's scan must not surface alpha's TODO comments"
    );

    shutdown(supervisor, handle).await;
}

/// Scenario 4 (checkpoint pause/resume primitive): `POST /pause` toggles the
/// worker pool independent of the real checkpoint timer, which the
/// Supervisor also drives through the same `CommandFacade::pause` path.
#[tokio::test]
async fn pause_then_resume_round_trips_through_is_paused() {
    let tmp = tempdir().unwrap();
    let fixture_path = tmp.path().join("response.txt");
    std::fs::write(&fixture_path, "# File: a.txt\nhi\n").unwrap();

    let config = base_config(tmp.path(), fixture_path);
    prepare_default_repo(&config);
    let (supervisor, handle) = spawn_supervisor(config).await;

    let paused = supervisor.facade.pause(PauseAction::Pause);
    assert!(paused);
    assert!(supervisor.facade.status().await.unwrap().is_paused);

    let resumed = supervisor.facade.pause(PauseAction::Resume);
    assert!(!resumed);
    assert!(!supervisor.facade.status().await.unwrap().is_paused);

    shutdown(supervisor, handle).await;
}

/// Scenario 5: a completed task whose generated file trips the reviewer's
/// heuristics (bare `except:`, a `print(` call) surfaces findings and, once
/// the critical-issue threshold is met, enqueues a follow-up task.
#[tokio::test]
async fn a_reviewed_task_surfaces_findings_and_enqueues_a_followup() {
    let tmp = tempdir().unwrap();
    let fixture_path = tmp.path().join("response.txt");
    std::fs::write(
        &fixture_path,
        "# File: risky.py\ndef handler():\n    try:\n        eval('1')\n    except:\n        print('bad')\n",
    )
    .unwrap();

    let config = base_config(tmp.path(), fixture_path);
    prepare_default_repo(&config);
    let (supervisor, handle) = spawn_supervisor(config.clone()).await;

    let task_id = supervisor
        .facade
        .enqueue_task("implement the handler".to_string(), 0, None)
        .await
        .unwrap();

    let store = EventStore::open(&config.db_path).await.unwrap();
    wait_for(
        || async {
            store
                .get_task(&task_id)
                .await
                .map(|task| task.status == TaskStatus::Completed)
                .unwrap_or(false)
        },
        200,
    )
    .await;

    let size_before = supervisor.facade.status().await.unwrap().queue.size;

    let findings = supervisor.facade.force_review(&task_id).await.unwrap();
    assert!(!findings.syntax_issues.is_empty(), "expected the bare except/print(..) heuristics to fire");
    assert!(
        findings.syntax_issues.len() + findings.logic_errors.len() >= 3,
        "expected the follow-up threshold to be met: {:?} / {:?}",
        findings.syntax_issues,
        findings.logic_errors,
    );

    let persisted = supervisor.facade.review_results(&task_id).await.unwrap();
    assert!(!persisted.is_empty());

    let size_after = supervisor.facade.status().await.unwrap().queue.size;
    assert_eq!(
        size_after,
        size_before + 1,
        "a follow-up task should have been enqueued once the critical-issue threshold was met"
    );

    shutdown(supervisor, handle).await;
}
