//! The CLI surface from spec.md §6: "a thin wrapper" over the same
//! [`agentloop_supervisor::CommandFacade`] the HTTP control plane calls
//! through. Every flag below maps onto exactly one façade method; `serve`
//! is the only subcommand that actually starts workers.

mod dispatch;

use agentloop_models::BackendKind;
use clap::Parser;
use std::path::PathBuf;

pub use dispatch::run;

/// `agentloop [OPTIONS] [DESCRIPTION]`. With no flags and a description,
/// enqueues one task; with `serve`, runs the long-lived supervisor plus
/// its HTTP control plane. Every other flag performs one façade call
/// against the store the `serve` process shares and exits.
#[derive(Debug, Parser)]
#[command(
    name = "agentloop",
    author,
    version,
    about = "Autonomous coding-agent task supervisor"
)]
pub struct Cli {
    /// Free-form description of the task to enqueue.
    pub description: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Priority for a newly enqueued task; higher runs sooner.
    #[arg(long, default_value_t = 0)]
    pub priority: i64,

    /// Target repository alias for a newly enqueued task.
    #[arg(long)]
    pub repo: Option<String>,

    /// Print the aggregated status view and exit.
    #[arg(long)]
    pub status: bool,

    /// Pause the primary worker pool.
    #[arg(long)]
    pub pause: bool,

    /// Resume the primary worker pool.
    #[arg(long)]
    pub resume: bool,

    /// Print the N most recent events.
    #[arg(long, value_name = "N")]
    pub logs: Option<i64>,

    /// Load and enqueue tasks from a JSON or YAML task file.
    #[arg(long, value_name = "FILE")]
    pub load_tasks: Option<PathBuf>,

    /// Connect a repository: `--connect-repo TYPE URL|PATH ALIAS`, where
    /// TYPE is `remote` or `local`.
    #[arg(long, num_args = 3, value_names = ["TYPE", "URL_OR_PATH", "ALIAS"])]
    pub connect_repo: Option<Vec<String>>,

    /// List every connected repository binding.
    #[arg(long)]
    pub list_repos: bool,

    /// Scan a connected repository for TODOs and heuristic issues.
    #[arg(long, value_name = "ALIAS")]
    pub scan_repo: Option<String>,

    /// Pull updates into a connected repository.
    #[arg(long, value_name = "ALIAS")]
    pub pull_repo: Option<String>,

    /// Commit and push a connected repository's pending changes.
    #[arg(long, value_name = "ALIAS")]
    pub push_repo: Option<String>,

    /// Disconnect a repository binding.
    #[arg(long, value_name = "ALIAS")]
    pub disconnect_repo: Option<String>,

    /// Print Tireless Reviewer statistics.
    #[arg(long)]
    pub tireless_reviewer_status: bool,

    /// Force an immediate review of one task.
    #[arg(long, value_name = "TASK_ID")]
    pub force_review: Option<String>,

    /// Print review findings recorded for one task.
    #[arg(long, value_name = "TASK_ID")]
    pub review_results: Option<String>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Run the supervisor loop and its HTTP control plane until shutdown.
    Serve,
    /// Switch the active model adapter.
    SetModel {
        #[arg(value_parser = parse_backend_kind)]
        kind: BackendKind,
    },
    /// Restart one primary worker.
    RestartWorker { worker_id: String },
}

fn parse_backend_kind(raw: &str) -> Result<BackendKind, String> {
    BackendKind::parse(raw).ok_or_else(|| format!("unknown model backend {raw:?}"))
}
