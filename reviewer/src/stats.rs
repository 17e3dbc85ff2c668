use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;

/// Review metrics, spec.md §4.7: `tasks_reviewed`, `issues_discovered`,
/// `improvements_suggested`, `last_review`, `major_tasks_respected`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewStatsSnapshot {
    pub tasks_reviewed: u64,
    pub issues_discovered: u64,
    pub improvements_suggested: u64,
    pub last_review: Option<DateTime<Utc>>,
    pub major_tasks_respected: u64,
}

pub(crate) struct ReviewStats(Mutex<ReviewStatsSnapshot>);

impl ReviewStats {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(ReviewStatsSnapshot::default()))
    }

    pub(crate) async fn mutate(&self, f: impl FnOnce(&mut ReviewStatsSnapshot)) {
        let mut guard = self.0.lock().await;
        f(&mut guard);
    }

    pub(crate) async fn snapshot(&self) -> ReviewStatsSnapshot {
        self.0.lock().await.clone()
    }
}
