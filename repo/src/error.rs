use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository alias {alias:?} already exists")]
    AliasExists { alias: String },

    #[error("repository {alias:?} is not connected")]
    NotFound { alias: String },

    #[error("path {path} does not exist")]
    PathNotFound { path: String },

    #[error("path {path} is not a directory")]
    NotADirectory { path: String },

    #[error("repository {alias:?} is not version-controlled")]
    Untracked { alias: String },

    #[error("git {args:?} failed: {message}")]
    GitCommand { args: Vec<String>, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize sidecar: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] agentloop_store::StoreError),
}

pub type Result<T> = std::result::Result<T, RepoError>;
