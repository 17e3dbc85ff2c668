use crate::error::Result;
use crate::model::datetime_to_epoch_seconds;
use crate::model::NewModelCallStat;
use crate::runtime::EventStore;
use chrono::Utc;

impl EventStore {
    pub async fn append_model_stat(&self, stat: NewModelCallStat) -> Result<i64> {
        let now = datetime_to_epoch_seconds(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO model_call_stats (
                task_id, backend_kind, backend_model, prompt_tokens,
                completion_tokens, elapsed_ms, ok, error, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stat.task_id)
        .bind(&stat.backend_kind)
        .bind(&stat.backend_model)
        .bind(i64::try_from(stat.prompt_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(stat.completion_tokens).unwrap_or(i64::MAX))
        .bind(i64::try_from(stat.elapsed_ms).unwrap_or(i64::MAX))
        .bind(i64::from(stat.ok))
        .bind(&stat.error)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Success rate per backend over all recorded calls, used by the
    /// Model Adapter Registry to decide whether to keep using a backend
    /// or fall back to the next one in priority order.
    pub async fn backend_success_rates(&self) -> Result<Vec<(String, f64)>> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT backend_kind, SUM(ok), COUNT(*)
            FROM model_call_stats
            GROUP BY backend_kind
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(backend, ok_count, total)| {
                let rate = if total == 0 {
                    0.0
                } else {
                    ok_count as f64 / total as f64
                };
                (backend, rate)
            })
            .collect())
    }
}
