mod commit;
mod event;
mod model_stat;
mod repository;
mod review_finding;
mod snapshot;
mod task;

pub use commit::CommitRecord;
pub use commit::NewCommitRecord;
pub(crate) use commit::CommitRow;
pub use event::Event;
pub use event::EventLevel;
pub use event::NewEvent;
pub(crate) use event::EventRow;
pub use model_stat::ModelCallStat;
pub use model_stat::NewModelCallStat;
pub(crate) use model_stat::ModelCallStatRow;
pub use repository::RepositoryBinding;
pub use repository::RepositoryKind;
pub(crate) use repository::RepositoryBindingRow;
pub use review_finding::NewReviewFinding;
pub use review_finding::ReviewFinding;
pub(crate) use review_finding::ReviewFindingRow;
pub use snapshot::SystemSnapshot;
pub(crate) use snapshot::SystemSnapshotRow;
pub use task::Task;
pub use task::TaskStatus;
pub(crate) use task::datetime_to_epoch_seconds;
pub(crate) use task::TaskRow;
