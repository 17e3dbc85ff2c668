mod error;
mod model;
mod runtime;

pub use error::Result;
pub use error::StoreError;
pub use model::CommitRecord;
pub use model::Event;
pub use model::EventLevel;
pub use model::ModelCallStat;
pub use model::NewCommitRecord;
pub use model::NewEvent;
pub use model::NewModelCallStat;
pub use model::NewReviewFinding;
pub use model::RepositoryBinding;
pub use model::RepositoryKind;
pub use model::ReviewFinding;
pub use model::SystemSnapshot;
pub use model::Task;
pub use model::TaskStatus;
pub use runtime::EventStore;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> EventStore {
        EventStore::open_in_memory().await.expect("open store")
    }

    #[tokio::test]
    async fn records_and_loads_open_tasks_in_priority_order() {
        let store = store().await;
        let low = Task::new("low".into(), "do a small thing".into(), 1, 3, None);
        let high = Task::new("high".into(), "do an important thing".into(), 10, 3, None);
        store.record_task_created(&low).await.unwrap();
        store.record_task_created(&high).await.unwrap();

        let open = store.load_open_tasks().await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].id, "high");
        assert_eq!(open[1].id, "low");
    }

    #[tokio::test]
    async fn record_task_created_is_idempotent() {
        let store = store().await;
        let task = Task::new("dup".into(), "a task".into(), 1, 3, None);
        store.record_task_created(&task).await.unwrap();
        store.record_task_created(&task).await.unwrap();

        let open = store.load_open_tasks().await.unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_transitions_update_status_and_timestamps() {
        let store = store().await;
        let task = Task::new("t1".into(), "write a function".into(), 5, 3, None);
        store.record_task_created(&task).await.unwrap();

        store.mark_started("t1", "worker-1").await.unwrap();
        let running = store.get_task("t1").await.unwrap();
        assert_eq!(running.status, TaskStatus::Running);
        assert_eq!(running.worker_id.as_deref(), Some("worker-1"));

        store.mark_completed("t1", "done").await.unwrap();
        let completed = store.get_task("t1").await.unwrap();
        assert_eq!(completed.status, TaskStatus::Completed);
        assert_eq!(completed.result.as_deref(), Some("done"));
        assert!(completed.completed_at.is_some());
    }

    #[tokio::test]
    async fn a_crashed_running_task_is_recovered_as_pending() {
        let store = store().await;
        let task = Task::new("t2".into(), "write a function".into(), 1, 3, None);
        store.record_task_created(&task).await.unwrap();
        store.mark_started("t2", "worker-1").await.unwrap();

        // simulate restart: load_open_tasks should reclaim the stranded task
        let open = store.load_open_tasks().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].status, TaskStatus::Pending);
        assert!(open[0].worker_id.is_none());
    }

    #[tokio::test]
    async fn retry_task_increments_retry_count_and_resets_status() {
        let store = store().await;
        let task = Task::new("t3".into(), "flaky task".into(), 1, 3, None);
        store.record_task_created(&task).await.unwrap();
        store.mark_started("t3", "worker-1").await.unwrap();
        store.mark_failed("t3", "boom").await.unwrap();

        store.retry_task("t3").await.unwrap();
        let retried = store.get_task("t3").await.unwrap();
        assert_eq!(retried.status, TaskStatus::Pending);
        assert_eq!(retried.retry_count, 1);
        assert!(retried.started_at.is_none());
    }

    #[tokio::test]
    async fn appends_and_queries_events() {
        let store = store().await;
        store
            .append_event(NewEvent {
                task_id: Some("t1".into()),
                worker_id: Some("worker-1".into()),
                component: "executor".into(),
                level: EventLevel::Info,
                message: "task started".into(),
                details: Some(json!({"attempt": 1})),
            })
            .await
            .unwrap();

        let events = store.recent_events(Some("t1"), 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "task started");
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let store = store().await;
        let uptime = chrono::Utc::now();
        store
            .save_snapshot(uptime, None, &json!({"worker-1": "idle"}), &json!({"size": 0}))
            .await
            .unwrap();

        let snapshot = store.load_snapshot().await.unwrap().expect("snapshot saved");
        assert_eq!(snapshot.worker_states, json!({"worker-1": "idle"}));
    }

    #[tokio::test]
    async fn repository_binding_round_trips() {
        let store = store().await;
        let binding = RepositoryBinding {
            alias: "primary".into(),
            kind: RepositoryKind::Local,
            working_dir: "/tmp/primary".into(),
            remote_url: None,
            branch: Some("main".into()),
            active: true,
            connected_at: chrono::Utc::now(),
            last_pull: None,
        };
        store.upsert_repository_binding(&binding).await.unwrap();

        let fetched = store.get_repository_binding("primary").await.unwrap();
        assert_eq!(fetched.working_dir, "/tmp/primary");
        assert!(fetched.active);
    }

    #[tokio::test]
    async fn backend_success_rate_reflects_recorded_calls() {
        let store = store().await;
        let task = Task::new("t4".into(), "call a model".into(), 1, 3, None);
        store.record_task_created(&task).await.unwrap();

        for ok in [true, true, false] {
            store
                .append_model_stat(NewModelCallStat {
                    task_id: "t4".into(),
                    backend_kind: "http_local".into(),
                    backend_model: "codellama".into(),
                    prompt_tokens: 100,
                    completion_tokens: 50,
                    elapsed_ms: 250,
                    ok,
                    error: if ok { None } else { Some("timeout".into()) },
                })
                .await
                .unwrap();
        }

        let rates = store.backend_success_rates().await.unwrap();
        assert_eq!(rates.len(), 1);
        let (backend, rate) = &rates[0];
        assert_eq!(backend, "http_local");
        assert!((*rate - (2.0 / 3.0)).abs() < 1e-9);
    }
}
