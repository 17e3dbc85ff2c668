use crate::error::Result;
use crate::model::datetime_to_epoch_seconds;
use crate::model::SystemSnapshot;
use crate::model::SystemSnapshotRow;
use crate::runtime::EventStore;
use chrono::Utc;
use serde_json::Value;

impl EventStore {
    /// Overwrite the single checkpoint row. Called on a timer by the
    /// Supervisor so a restart can resume without replaying every event.
    ///
    /// `last_checkpoint` is the timestamp of the last *weekly* checkpoint
    /// sequence (spec.md §4.8), not this periodic save itself; passing
    /// `None` leaves any previously recorded value untouched.
    pub async fn save_snapshot(
        &self,
        uptime_start: chrono::DateTime<Utc>,
        last_checkpoint: Option<chrono::DateTime<Utc>>,
        worker_states: &Value,
        queue_stats: &Value,
    ) -> Result<()> {
        let now = datetime_to_epoch_seconds(Utc::now());
        let last_checkpoint = last_checkpoint.map(datetime_to_epoch_seconds);
        let worker_states = serde_json::to_string(worker_states)?;
        let queue_stats = serde_json::to_string(queue_stats)?;
        sqlx::query(
            r#"
            INSERT INTO system_snapshot (id, uptime_start, last_checkpoint, worker_states, queue_stats, timestamp)
            VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                last_checkpoint = COALESCE(excluded.last_checkpoint, system_snapshot.last_checkpoint),
                worker_states = excluded.worker_states,
                queue_stats = excluded.queue_stats,
                timestamp = excluded.timestamp
            "#,
        )
        .bind(datetime_to_epoch_seconds(uptime_start))
        .bind(last_checkpoint)
        .bind(&worker_states)
        .bind(&queue_stats)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn load_snapshot(&self) -> Result<Option<SystemSnapshot>> {
        let row = sqlx::query_as::<_, SystemSnapshotRow>(
            "SELECT uptime_start, last_checkpoint, worker_states, queue_stats, timestamp FROM system_snapshot WHERE id = 1",
        )
        .fetch_optional(self.pool())
        .await?;

        row.map(SystemSnapshot::try_from).transpose()
    }
}
