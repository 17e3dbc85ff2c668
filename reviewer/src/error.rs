use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewerError {
    #[error("store error: {0}")]
    Store(#[from] agentloop_store::StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] agentloop_queue::QueueError),

    #[error("repository error: {0}")]
    Repo(#[from] agentloop_repo::RepoError),

    #[error("model error: {0}")]
    Model(#[from] agentloop_models::ModelError),

    #[error("task {task_id} has not completed, nothing to review")]
    NotCompleted { task_id: String },
}

pub type Result<T> = std::result::Result<T, ReviewerError>;
