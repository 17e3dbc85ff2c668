use crate::config::TASK_FILE_DEBOUNCE;
use agentloop_queue::PriorityQueue;
use agentloop_store::Task;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One element of a task file, spec.md §4.8/§6: either a bare description
/// string (priority 0) or an object carrying priority/metadata/an explicit
/// id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskFileEntry {
    Description(String),
    Full {
        #[serde(alias = "prompt")]
        description: String,
        #[serde(default)]
        priority: i64,
        task_id: Option<String>,
        #[serde(default)]
        metadata: Option<serde_json::Value>,
        #[serde(default)]
        target_repo: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskFileShape {
    List(Vec<TaskFileEntry>),
    Wrapped { tasks: Vec<TaskFileEntry> },
}

fn parse_task_file(raw: &str) -> Option<Vec<TaskFileEntry>> {
    if let Ok(shape) = serde_json::from_str::<TaskFileShape>(raw) {
        return Some(match shape {
            TaskFileShape::List(entries) => entries,
            TaskFileShape::Wrapped { tasks } => tasks,
        });
    }
    if let Ok(shape) = serde_yaml::from_str::<TaskFileShape>(raw) {
        return Some(match shape {
            TaskFileShape::List(entries) => entries,
            TaskFileShape::Wrapped { tasks } => tasks,
        });
    }
    None
}

/// Reads `path`, parses it (JSON first, then YAML), and enqueues every
/// valid entry. Ports `main.py`'s `load_tasks_from_file`.
pub async fn load_and_enqueue(
    path: &Path,
    queue: &PriorityQueue,
    default_max_retries: u32,
) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path).await?;
    let Some(entries) = parse_task_file(&raw) else {
        anyhow::bail!("{} is neither valid JSON nor YAML task list", path.display());
    };

    let mut enqueued = 0;
    for entry in entries {
        let task = match entry {
            TaskFileEntry::Description(description) => Task::new(
                uuid::Uuid::new_v4().to_string(),
                description,
                0,
                default_max_retries,
                None,
            ),
            TaskFileEntry::Full {
                description,
                priority,
                task_id,
                metadata: _,
                target_repo,
            } => Task::new(
                task_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                description,
                priority,
                default_max_retries,
                target_repo,
            ),
        };
        queue.put(task).await?;
        enqueued += 1;
    }
    Ok(enqueued)
}

/// Watches `path`'s parent directory with the `notify` crate (the same
/// dependency `codex-core::file_watcher` uses) and reloads the task file on
/// every modification, debounced at [`TASK_FILE_DEBOUNCE`].
pub fn spawn_watcher(
    path: PathBuf,
    queue: PriorityQueue,
    default_max_retries: u32,
    cancel: CancellationToken,
) {
    let Some(parent) = path.parent().map(Path::to_path_buf) else {
        tracing::warn!(path = %path.display(), "task file has no parent directory, not watching");
        return;
    };

    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
    let watcher = notify::recommended_watcher(move |res| {
        let _ = raw_tx.send(res);
    });
    let mut watcher: RecommendedWatcher = match watcher {
        Ok(watcher) => watcher,
        Err(err) => {
            tracing::warn!(error = %err, "failed to create task file watcher");
            return;
        }
    };
    if let Err(err) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
        tracing::warn!(error = %err, path = %parent.display(), "failed to watch task file directory");
        return;
    }

    tokio::spawn(async move {
        let _watcher = watcher;
        let mut last_reload: Option<tokio::time::Instant> = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                event = raw_rx.recv() => {
                    let Some(Ok(event)) = event else { continue };
                    if !event.paths.iter().any(|changed| changed == &path) {
                        continue;
                    }
                    let now = tokio::time::Instant::now();
                    if let Some(last) = last_reload {
                        if now.duration_since(last) < TASK_FILE_DEBOUNCE {
                            continue;
                        }
                    }
                    last_reload = Some(now);
                    match load_and_enqueue(&path, &queue, default_max_retries).await {
                        Ok(count) => tracing::info!(count, path = %path.display(), "reloaded task file"),
                        Err(err) => tracing::warn!(error = %err, path = %path.display(), "failed to reload task file"),
                    }
                }
            }
        }
    });
}
