use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no model adapter is available")]
    NoAdapterAvailable,

    #[error("requested backend {kind} is not available")]
    BackendUnavailable { kind: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read fixture file {path}: {source}")]
    FixtureRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] agentloop_store::StoreError),
}

pub type Result<T> = std::result::Result<T, ModelError>;
