use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

/// Per-worker lifecycle state, spec.md §4.6. Mutated only by the worker
/// that owns it (plus the pool on `start`/`restart`, where the worker does
/// not yet exist).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Waiting,
    Working,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerState {
    pub status: WorkerStatus,
    pub current_task: Option<String>,
    pub completed_count: u64,
    pub failed_count: u64,
    pub started_at: DateTime<Utc>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self {
            status: WorkerStatus::Idle,
            current_task: None,
            completed_count: 0,
            failed_count: 0,
            started_at: Utc::now(),
        }
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured outcome of one task's run, stored as the task's JSON `result`
/// column. Replaces the original's `eval(result_str)` deserialization: the
/// reviewer and API read this shape, never a freeform string.
#[derive(Debug, Clone, Serialize)]
pub struct TaskCompletionSummary {
    pub files: Vec<String>,
    pub backend_kind: String,
    pub backend_model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub test_ok: bool,
    pub test_exit_code: i32,
    pub commit_id: Option<String>,
}
