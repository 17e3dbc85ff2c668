use crate::error::Result;
use crate::error::StoreError;
use crate::model::datetime_to_epoch_seconds;
use crate::model::Task;
use crate::model::TaskRow;
use crate::model::TaskStatus;
use crate::runtime::EventStore;
use chrono::Utc;

impl EventStore {
    /// Persist a brand-new task. Idempotent: re-inserting the same id is a
    /// no-op rather than an error, so a crashed loader can safely replay
    /// its task file.
    pub async fn record_task_created(&self, task: &Task) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, description, priority, status, created_at, started_at,
                completed_at, worker_id, retry_count, max_retries, result,
                error, target_repo
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&task.id)
        .bind(&task.description)
        .bind(task.priority)
        .bind(task.status.as_str())
        .bind(datetime_to_epoch_seconds(task.created_at))
        .bind(task.started_at.map(datetime_to_epoch_seconds))
        .bind(task.completed_at.map(datetime_to_epoch_seconds))
        .bind(&task.worker_id)
        .bind(i64::from(task.retry_count))
        .bind(i64::from(task.max_retries))
        .bind(&task.result)
        .bind(&task.error)
        .bind(&task.target_repo)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StoreError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;
        Task::try_from(row)
    }

    pub async fn mark_started(&self, task_id: &str, worker_id: &str) -> Result<()> {
        let now = datetime_to_epoch_seconds(Utc::now());
        sqlx::query(
            "UPDATE tasks SET status = ?, started_at = ?, worker_id = ? WHERE id = ?",
        )
        .bind(TaskStatus::Running.as_str())
        .bind(now)
        .bind(worker_id)
        .bind(task_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn mark_completed(&self, task_id: &str, result: &str) -> Result<()> {
        let now = datetime_to_epoch_seconds(Utc::now());
        sqlx::query(
            "UPDATE tasks SET status = ?, completed_at = ?, result = ?, error = NULL WHERE id = ?",
        )
        .bind(TaskStatus::Completed.as_str())
        .bind(now)
        .bind(result)
        .bind(task_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, task_id: &str, error: &str) -> Result<()> {
        let now = datetime_to_epoch_seconds(Utc::now());
        sqlx::query(
            "UPDATE tasks SET status = ?, completed_at = ?, error = ? WHERE id = ?",
        )
        .bind(TaskStatus::Failed.as_str())
        .bind(now)
        .bind(error)
        .bind(task_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Requeue a task for another attempt, incrementing its retry counter,
    /// dropping its priority by one (floored at 0, spec.md §4.2) so repeated
    /// failures don't monopolize the head of the queue, and clearing the
    /// fields a fresh run will repopulate.
    pub async fn retry_task(&self, task_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks SET
                status = ?,
                started_at = NULL,
                completed_at = NULL,
                worker_id = NULL,
                retry_count = retry_count + 1,
                priority = MAX(priority - 1, 0)
            WHERE id = ?
            "#,
        )
        .bind(TaskStatus::Pending.as_str())
        .bind(task_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Tasks that are not yet in a final state, ordered highest-priority
    /// first and, within a priority, oldest first. Any task still marked
    /// `running` from a previous process is reset to `pending` here so a
    /// crash mid-execution doesn't strand it forever.
    pub async fn load_open_tasks(&self) -> Result<Vec<Task>> {
        sqlx::query("UPDATE tasks SET status = ?, worker_id = NULL WHERE status = ?")
            .bind(TaskStatus::Pending.as_str())
            .bind(TaskStatus::Running.as_str())
            .execute(self.pool())
            .await?;

        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT * FROM tasks
            WHERE status = ?
            ORDER BY priority DESC, created_at ASC
            "#,
        )
        .bind(TaskStatus::Pending.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    /// Completed tasks whose `completed_at` falls within `[start, end]`,
    /// most recent first, capped at `limit` rows. Used by the Tireless
    /// Reviewer's primary (last 24h) and deep (24h-168h) selection queries.
    pub async fn completed_between(
        &self,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT * FROM tasks
            WHERE status = ? AND completed_at BETWEEN ? AND ?
            ORDER BY completed_at DESC
            LIMIT ?
            "#,
        )
        .bind(TaskStatus::Completed.as_str())
        .bind(datetime_to_epoch_seconds(start))
        .bind(datetime_to_epoch_seconds(end))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    /// Aggregate counts by status, used by the `/stats` endpoint.
    pub async fn task_stats(&self) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(self.pool())
                .await?;
        Ok(rows)
    }

    /// Delete completed/failed tasks older than `older_than_secs`, keeping
    /// the database from growing without bound.
    pub async fn prune_completed(&self, older_than_secs: i64) -> Result<u64> {
        let cutoff = datetime_to_epoch_seconds(Utc::now()) - older_than_secs;
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE status IN (?, ?) AND completed_at IS NOT NULL AND completed_at < ?
            "#,
        )
        .bind(TaskStatus::Completed.as_str())
        .bind(TaskStatus::Failed.as_str())
        .bind(cutoff)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
