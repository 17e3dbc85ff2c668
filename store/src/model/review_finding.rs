use crate::error::StoreError;
use crate::model::task::epoch_seconds_to_datetime;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// A batch of issues raised by a Tireless Reviewer pass over a task's
/// output. `review_kind` distinguishes the primary (fast) cadence from
/// the deep cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub id: i64,
    pub task_id: String,
    pub review_kind: String,
    pub issues: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReviewFinding {
    pub task_id: String,
    pub review_kind: String,
    pub issues: Value,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReviewFindingRow {
    pub(crate) id: i64,
    pub(crate) task_id: String,
    pub(crate) review_kind: String,
    pub(crate) issues: String,
    pub(crate) created_at: i64,
}

impl TryFrom<ReviewFindingRow> for ReviewFinding {
    type Error = StoreError;

    fn try_from(row: ReviewFindingRow) -> Result<Self, Self::Error> {
        Ok(ReviewFinding {
            id: row.id,
            task_id: row.task_id,
            review_kind: row.review_kind,
            issues: serde_json::from_str(&row.issues)?,
            created_at: epoch_seconds_to_datetime(row.created_at)?,
        })
    }
}
