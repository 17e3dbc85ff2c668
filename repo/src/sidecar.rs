use crate::error::Result;
use agentloop_store::RepositoryBinding;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk mirror of the repository bindings, matching the original's
/// `connected_repos.json` `_load_repo_connections`/`_save_repo_connections`
/// pair. The `EventStore` is the source of truth; this file is a
/// human-readable fallback read at startup before the store is consulted.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Sidecar {
    pub(crate) repositories: BTreeMap<String, RepositoryBinding>,
    pub(crate) last_updated: Option<DateTime<Utc>>,
}

pub(crate) async fn load(path: &Path) -> Result<Sidecar> {
    if !path.exists() {
        return Ok(Sidecar::default());
    }
    let raw = tokio::fs::read_to_string(path).await?;
    if raw.trim().is_empty() {
        return Ok(Sidecar::default());
    }
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) async fn save(path: &Path, sidecar: &Sidecar) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let raw = serde_json::to_string_pretty(sidecar)?;
    tokio::fs::write(path, raw).await?;
    Ok(())
}
