use crate::error::Result;
use crate::error::StoreError;
use crate::model::datetime_to_epoch_seconds;
use crate::model::RepositoryBinding;
use crate::model::RepositoryBindingRow;
use crate::runtime::EventStore;
use chrono::Utc;

impl EventStore {
    pub async fn upsert_repository_binding(&self, binding: &RepositoryBinding) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO repository_bindings (
                alias, kind, working_dir, remote_url, branch, active, connected_at, last_pull
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(alias) DO UPDATE SET
                kind = excluded.kind,
                working_dir = excluded.working_dir,
                remote_url = excluded.remote_url,
                branch = excluded.branch,
                active = excluded.active,
                last_pull = excluded.last_pull
            "#,
        )
        .bind(&binding.alias)
        .bind(binding.kind.as_str())
        .bind(&binding.working_dir)
        .bind(&binding.remote_url)
        .bind(&binding.branch)
        .bind(i64::from(binding.active))
        .bind(datetime_to_epoch_seconds(binding.connected_at))
        .bind(binding.last_pull.map(datetime_to_epoch_seconds))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_repository_binding(&self, alias: &str) -> Result<RepositoryBinding> {
        let row = sqlx::query_as::<_, RepositoryBindingRow>(
            "SELECT * FROM repository_bindings WHERE alias = ?",
        )
        .bind(alias)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| StoreError::RepositoryNotFound {
            alias: alias.to_string(),
        })?;
        RepositoryBinding::try_from(row)
    }

    pub async fn list_repository_bindings(&self) -> Result<Vec<RepositoryBinding>> {
        let rows = sqlx::query_as::<_, RepositoryBindingRow>(
            "SELECT * FROM repository_bindings ORDER BY alias ASC",
        )
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(RepositoryBinding::try_from).collect()
    }

    pub async fn set_repository_active(&self, alias: &str, active: bool) -> Result<()> {
        sqlx::query("UPDATE repository_bindings SET active = ? WHERE alias = ?")
            .bind(i64::from(active))
            .bind(alias)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn touch_repository_pull(&self, alias: &str) -> Result<()> {
        let now = datetime_to_epoch_seconds(Utc::now());
        sqlx::query("UPDATE repository_bindings SET last_pull = ? WHERE alias = ?")
            .bind(now)
            .bind(alias)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn remove_repository_binding(&self, alias: &str) -> Result<()> {
        sqlx::query("DELETE FROM repository_bindings WHERE alias = ?")
            .bind(alias)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
