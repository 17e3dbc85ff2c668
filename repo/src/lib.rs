mod error;
mod git;
mod registry;
mod scan;
mod sidecar;

pub use error::RepoError;
pub use error::Result;
pub use registry::CommitOutcome;
pub use registry::PullOutcome;
pub use registry::RepositoryRegistry;
pub use scan::FileNode;
pub use scan::ScanIssue;
pub use scan::ScanResult;
pub use scan::ScanTask;
