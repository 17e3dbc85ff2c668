use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("store error: {0}")]
    Store(#[from] agentloop_store::StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] agentloop_queue::QueueError),

    #[error("model error: {0}")]
    Model(#[from] agentloop_models::ModelError),

    #[error("repository error: {0}")]
    Repo(#[from] agentloop_repo::RepoError),

    #[error("executor error: {0}")]
    Executor(#[from] agentloop_executor::ExecutorError),

    #[error("reviewer error: {0}")]
    Reviewer(#[from] agentloop_reviewer::ReviewerError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
