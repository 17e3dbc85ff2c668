use crate::error::StoreError;
use crate::model::task::epoch_seconds_to_datetime;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Per-call telemetry for a Model Adapter invocation, used to drive
/// adapter selection and the `/stats` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCallStat {
    pub id: i64,
    pub task_id: String,
    pub backend_kind: String,
    pub backend_model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub elapsed_ms: u64,
    pub ok: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewModelCallStat {
    pub task_id: String,
    pub backend_kind: String,
    pub backend_model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub elapsed_ms: u64,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ModelCallStatRow {
    pub(crate) id: i64,
    pub(crate) task_id: String,
    pub(crate) backend_kind: String,
    pub(crate) backend_model: String,
    pub(crate) prompt_tokens: i64,
    pub(crate) completion_tokens: i64,
    pub(crate) elapsed_ms: i64,
    pub(crate) ok: i64,
    pub(crate) error: Option<String>,
    pub(crate) created_at: i64,
}

impl TryFrom<ModelCallStatRow> for ModelCallStat {
    type Error = StoreError;

    fn try_from(row: ModelCallStatRow) -> Result<Self, Self::Error> {
        Ok(ModelCallStat {
            id: row.id,
            task_id: row.task_id,
            backend_kind: row.backend_kind,
            backend_model: row.backend_model,
            prompt_tokens: u64::try_from(row.prompt_tokens).unwrap_or_default(),
            completion_tokens: u64::try_from(row.completion_tokens).unwrap_or_default(),
            elapsed_ms: u64::try_from(row.elapsed_ms).unwrap_or_default(),
            ok: row.ok != 0,
            error: row.error,
            created_at: epoch_seconds_to_datetime(row.created_at)?,
        })
    }
}
