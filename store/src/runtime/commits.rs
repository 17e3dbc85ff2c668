use crate::error::Result;
use crate::model::datetime_to_epoch_seconds;
use crate::model::CommitRecord;
use crate::model::CommitRow;
use crate::model::NewCommitRecord;
use crate::runtime::EventStore;
use chrono::Utc;

impl EventStore {
    pub async fn append_commit(&self, commit: NewCommitRecord) -> Result<i64> {
        let files_changed = serde_json::to_string(&commit.files_changed)?;
        let now = datetime_to_epoch_seconds(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO commits (task_id, commit_id, message, files_changed, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&commit.task_id)
        .bind(&commit.commit_id)
        .bind(&commit.message)
        .bind(&files_changed)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn commits_for_task(&self, task_id: &str) -> Result<Vec<CommitRecord>> {
        let rows = sqlx::query_as::<_, CommitRow>(
            "SELECT * FROM commits WHERE task_id = ? ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(CommitRecord::try_from).collect()
    }

    /// Most recent commits across every task, newest first. Backs
    /// `GET /git/commits?limit=N`.
    pub async fn recent_commits(&self, limit: i64) -> Result<Vec<CommitRecord>> {
        let rows = sqlx::query_as::<_, CommitRow>(
            "SELECT * FROM commits ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(CommitRecord::try_from).collect()
    }
}
