use crate::error::StoreError;
use crate::model::task::epoch_seconds_to_datetime;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepositoryKind {
    Local,
    Remote,
}

impl RepositoryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RepositoryKind::Local => "local",
            RepositoryKind::Remote => "remote",
        }
    }

    pub fn parse(value: &str) -> Result<Self, StoreError> {
        match value {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(StoreError::InvalidRepositoryKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// The Repository Registry's durable view of one connected repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryBinding {
    pub alias: String,
    pub kind: RepositoryKind,
    pub working_dir: String,
    pub remote_url: Option<String>,
    pub branch: Option<String>,
    pub active: bool,
    pub connected_at: DateTime<Utc>,
    pub last_pull: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RepositoryBindingRow {
    pub(crate) alias: String,
    pub(crate) kind: String,
    pub(crate) working_dir: String,
    pub(crate) remote_url: Option<String>,
    pub(crate) branch: Option<String>,
    pub(crate) active: i64,
    pub(crate) connected_at: i64,
    pub(crate) last_pull: Option<i64>,
}

impl TryFrom<RepositoryBindingRow> for RepositoryBinding {
    type Error = StoreError;

    fn try_from(row: RepositoryBindingRow) -> Result<Self, Self::Error> {
        Ok(RepositoryBinding {
            alias: row.alias,
            kind: RepositoryKind::parse(&row.kind)?,
            working_dir: row.working_dir,
            remote_url: row.remote_url,
            branch: row.branch,
            active: row.active != 0,
            connected_at: epoch_seconds_to_datetime(row.connected_at)?,
            last_pull: row.last_pull.map(epoch_seconds_to_datetime).transpose()?,
        })
    }
}
