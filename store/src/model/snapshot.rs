use crate::error::StoreError;
use crate::model::task::epoch_seconds_to_datetime;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// The single-row checkpoint of overall system state, written on a timer
/// and read back on restart to resume worker/queue bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub uptime_start: DateTime<Utc>,
    pub last_checkpoint: Option<DateTime<Utc>>,
    pub worker_states: Value,
    pub queue_stats: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SystemSnapshotRow {
    pub(crate) uptime_start: i64,
    pub(crate) last_checkpoint: Option<i64>,
    pub(crate) worker_states: String,
    pub(crate) queue_stats: String,
    pub(crate) timestamp: i64,
}

impl TryFrom<SystemSnapshotRow> for SystemSnapshot {
    type Error = StoreError;

    fn try_from(row: SystemSnapshotRow) -> Result<Self, Self::Error> {
        Ok(SystemSnapshot {
            uptime_start: epoch_seconds_to_datetime(row.uptime_start)?,
            last_checkpoint: row
                .last_checkpoint
                .map(epoch_seconds_to_datetime)
                .transpose()?,
            worker_states: serde_json::from_str(&row.worker_states)?,
            queue_stats: serde_json::from_str(&row.queue_stats)?,
            timestamp: epoch_seconds_to_datetime(row.timestamp)?,
        })
    }
}
