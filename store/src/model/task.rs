use crate::error::StoreError;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, StoreError> {
        match value {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(StoreError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A unit of work dequeued by a Primary Worker and driven through
/// generate→validate→commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub priority: i64,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub result: Option<String>,
    pub error: Option<String>,
    pub target_repo: Option<String>,
}

impl Task {
    /// Build a brand-new task awaiting its first run.
    pub fn new(
        id: String,
        description: String,
        priority: i64,
        max_retries: u32,
        target_repo: Option<String>,
    ) -> Self {
        Self {
            id,
            description,
            priority,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            worker_id: None,
            retry_count: 0,
            max_retries,
            result: None,
            error: None,
            target_repo,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TaskRow {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) priority: i64,
    pub(crate) status: String,
    pub(crate) created_at: i64,
    pub(crate) started_at: Option<i64>,
    pub(crate) completed_at: Option<i64>,
    pub(crate) worker_id: Option<String>,
    pub(crate) retry_count: i64,
    pub(crate) max_retries: i64,
    pub(crate) result: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) target_repo: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            description: row.description,
            priority: row.priority,
            status: TaskStatus::parse(&row.status)?,
            created_at: epoch_seconds_to_datetime(row.created_at)?,
            started_at: row.started_at.map(epoch_seconds_to_datetime).transpose()?,
            completed_at: row
                .completed_at
                .map(epoch_seconds_to_datetime)
                .transpose()?,
            worker_id: row.worker_id,
            retry_count: u32::try_from(row.retry_count).unwrap_or_default(),
            max_retries: u32::try_from(row.max_retries).unwrap_or_default(),
            result: row.result,
            error: row.error,
            target_repo: row.target_repo,
        })
    }
}

pub(crate) fn epoch_seconds_to_datetime(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or(StoreError::InvalidTimestamp {
        epoch_seconds: secs,
    })
}

pub(crate) fn datetime_to_epoch_seconds(value: DateTime<Utc>) -> i64 {
    value.timestamp()
}
