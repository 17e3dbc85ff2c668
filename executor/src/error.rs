use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("store error: {0}")]
    Store(#[from] agentloop_store::StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] agentloop_queue::QueueError),

    #[error("model error: {0}")]
    Model(#[from] agentloop_models::ModelError),

    #[error("repository error: {0}")]
    Repo(#[from] agentloop_repo::RepoError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker {worker_id} not found")]
    WorkerNotFound { worker_id: String },
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
