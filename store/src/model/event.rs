use crate::error::StoreError;
use crate::model::task::epoch_seconds_to_datetime;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl EventLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventLevel::Debug => "debug",
            EventLevel::Info => "info",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Result<Self, StoreError> {
        match value {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(StoreError::InvalidLevel {
                level: other.to_string(),
            }),
        }
    }
}

/// One append-only entry in the system's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub task_id: Option<String>,
    pub worker_id: Option<String>,
    pub component: String,
    pub level: EventLevel,
    pub message: String,
    pub details: Option<Value>,
}

/// Fields supplied by a caller appending a new event; `id` and `timestamp`
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub task_id: Option<String>,
    pub worker_id: Option<String>,
    pub component: String,
    pub level: EventLevel,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub(crate) id: i64,
    pub(crate) timestamp: i64,
    pub(crate) task_id: Option<String>,
    pub(crate) worker_id: Option<String>,
    pub(crate) component: String,
    pub(crate) level: String,
    pub(crate) message: String,
    pub(crate) details: Option<String>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            timestamp: epoch_seconds_to_datetime(row.timestamp)?,
            task_id: row.task_id,
            worker_id: row.worker_id,
            component: row.component,
            level: EventLevel::parse(&row.level)?,
            message: row.message,
            details: row.details.map(|raw| serde_json::from_str(&raw)).transpose()?,
        })
    }
}
