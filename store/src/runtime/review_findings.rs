use crate::error::Result;
use crate::model::datetime_to_epoch_seconds;
use crate::model::NewReviewFinding;
use crate::model::ReviewFinding;
use crate::model::ReviewFindingRow;
use crate::runtime::EventStore;
use chrono::Utc;

impl EventStore {
    pub async fn append_review_finding(&self, finding: NewReviewFinding) -> Result<i64> {
        let issues = serde_json::to_string(&finding.issues)?;
        let now = datetime_to_epoch_seconds(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO review_findings (task_id, review_kind, issues, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&finding.task_id)
        .bind(&finding.review_kind)
        .bind(&issues)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn review_findings_for_task(&self, task_id: &str) -> Result<Vec<ReviewFinding>> {
        let rows = sqlx::query_as::<_, ReviewFindingRow>(
            "SELECT * FROM review_findings WHERE task_id = ? ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(ReviewFinding::try_from).collect()
    }
}
