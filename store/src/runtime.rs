mod commits;
mod events;
mod model_stats;
mod repository;
mod review_findings;
mod snapshot;
mod tasks;

use crate::error::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::sqlite::SqliteSynchronous;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Durable event store backing every other component: tasks, the audit
/// trail, commit records, model call telemetry, repository bindings, the
/// system snapshot and reviewer findings all live in one SQLite database.
#[derive(Debug, Clone)]
pub struct EventStore {
    pool: Arc<SqlitePool>,
}

impl EventStore {
    /// Open (creating if absent) the SQLite database at `path`, run
    /// pending migrations and return a ready-to-use store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = open_sqlite(path.as_ref()).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Open an in-memory database, mainly for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn open_sqlite(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
