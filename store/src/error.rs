use thiserror::Error;

/// Errors surfaced by [`crate::EventStore`] operations.
///
/// Every variant is a `PersistenceError` in spec terms (§7); callers decide
/// whether a failure is retried or fatal, the store never does that itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to (de)serialize JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid task status {status:?}")]
    InvalidStatus { status: String },

    #[error("invalid repository kind {kind:?}")]
    InvalidRepositoryKind { kind: String },

    #[error("invalid event level {level:?}")]
    InvalidLevel { level: String },

    #[error("task {task_id} not found")]
    TaskNotFound { task_id: String },

    #[error("repository binding {alias:?} not found")]
    RepositoryNotFound { alias: String },

    #[error("invalid stored timestamp {epoch_seconds}")]
    InvalidTimestamp { epoch_seconds: i64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
