use crate::error::Result;
use crate::model::datetime_to_epoch_seconds;
use crate::model::Event;
use crate::model::EventRow;
use crate::model::NewEvent;
use crate::runtime::EventStore;
use chrono::Utc;

impl EventStore {
    /// Append one entry to the audit trail. Never fails the caller's
    /// operation: event writes are best-effort bookkeeping, so callers
    /// should log and continue rather than abort on error.
    pub async fn append_event(&self, event: NewEvent) -> Result<i64> {
        let details = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = datetime_to_epoch_seconds(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO events (timestamp, task_id, worker_id, component, level, message, details)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(now)
        .bind(&event.task_id)
        .bind(&event.worker_id)
        .bind(&event.component)
        .bind(event.level.as_str())
        .bind(&event.message)
        .bind(&details)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Most recent events, newest first, optionally filtered to one task.
    pub async fn recent_events(&self, task_id: Option<&str>, limit: i64) -> Result<Vec<Event>> {
        let rows = match task_id {
            Some(task_id) => {
                sqlx::query_as::<_, EventRow>(
                    "SELECT * FROM events WHERE task_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
                )
                .bind(task_id)
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, EventRow>(
                    "SELECT * FROM events ORDER BY timestamp DESC, id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
        };

        rows.into_iter().map(Event::try_from).collect()
    }

    /// Delete events older than `older_than_secs`.
    pub async fn prune_events(&self, older_than_secs: i64) -> Result<u64> {
        let cutoff = datetime_to_epoch_seconds(Utc::now()) - older_than_secs;
        let result = sqlx::query("DELETE FROM events WHERE timestamp < ?")
            .bind(cutoff)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
