use crate::error::StoreError;
use crate::model::task::epoch_seconds_to_datetime;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// A completed write to a target repository, recorded for audit and
/// rollback purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: i64,
    pub task_id: String,
    pub commit_id: String,
    pub message: String,
    pub files_changed: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCommitRecord {
    pub task_id: String,
    pub commit_id: String,
    pub message: String,
    pub files_changed: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CommitRow {
    pub(crate) id: i64,
    pub(crate) task_id: String,
    pub(crate) commit_id: String,
    pub(crate) message: String,
    pub(crate) files_changed: String,
    pub(crate) created_at: i64,
}

impl TryFrom<CommitRow> for CommitRecord {
    type Error = StoreError;

    fn try_from(row: CommitRow) -> Result<Self, Self::Error> {
        Ok(CommitRecord {
            id: row.id,
            task_id: row.task_id,
            commit_id: row.commit_id,
            message: row.message,
            files_changed: serde_json::from_str(&row.files_changed)?,
            created_at: epoch_seconds_to_datetime(row.created_at)?,
        })
    }
}
