use crate::context::WorkerContext;
use crate::state::TaskCompletionSummary;
use crate::state::WorkerState;
use crate::state::WorkerStatus;
use agentloop_store::NewCommitRecord;
use agentloop_store::Task;
use indexmap::IndexMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Runs one worker to completion (until cancelled). Ported from
/// `task_executor.py`'s `_worker_loop`, one tokio task per worker instead of
/// one asyncio task sharing a thread pool.
pub(crate) async fn run(
    ctx: WorkerContext,
    worker_id: String,
    state: Arc<RwLock<WorkerState>>,
    cancel: CancellationToken,
) {
    loop {
        if ctx.paused.load(Ordering::SeqCst) {
            state.write().await.status = WorkerStatus::Paused;
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(ctx.pause_poll_interval) => {}
            }
            continue;
        }

        state.write().await.status = WorkerStatus::Waiting;
        let task = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = tokio::time::timeout(ctx.get_timeout, ctx.queue.get()) => {
                match outcome {
                    Ok(task) => task,
                    Err(_) => continue,
                }
            }
        };

        {
            let mut guard = state.write().await;
            guard.status = WorkerStatus::Working;
            guard.current_task = Some(task.id.clone());
        }

        if let Err(err) = ctx.store.mark_started(&task.id, &worker_id).await {
            tracing::error!(task_id = %task.id, error = %err, "failed to mark task started");
        }

        match process_task(&ctx, &task).await {
            Ok(summary) => {
                let payload = serde_json::to_string(&summary).unwrap_or_default();
                if let Err(err) = ctx.store.mark_completed(&task.id, &payload).await {
                    tracing::error!(task_id = %task.id, error = %err, "failed to mark task completed");
                }
                let mut guard = state.write().await;
                guard.completed_count += 1;
                guard.current_task = None;
            }
            Err(reason) => {
                tracing::warn!(task_id = %task.id, reason = %reason, "task failed");
                if let Err(err) = ctx.store.mark_failed(&task.id, &reason).await {
                    tracing::error!(task_id = %task.id, error = %err, "failed to mark task failed");
                }
                if task.retry_count < task.max_retries {
                    if let Err(err) = retry(&ctx, &task.id).await {
                        tracing::error!(task_id = %task.id, error = %err, "failed to requeue task for retry");
                    }
                }
                let mut guard = state.write().await;
                guard.failed_count += 1;
                guard.current_task = None;
            }
        }
    }
}

async fn retry(ctx: &WorkerContext, task_id: &str) -> agentloop_store::Result<()> {
    ctx.store.retry_task(task_id).await?;
    let task = ctx.store.get_task(task_id).await?;
    ctx.queue
        .retry(task)
        .await
        .map_err(|err| match err {
            agentloop_queue::QueueError::Store(source) => source,
        })
}

/// The generate -> validate syntax -> run tests -> commit pipeline,
/// spec.md §4.6 steps 5-9. Returns `Err(reason)` on the first failing
/// step; the caller is responsible for `mark_failed`/retry bookkeeping.
async fn process_task(ctx: &WorkerContext, task: &Task) -> Result<TaskCompletionSummary, String> {
    let generation = ctx
        .models
        .generate(&task.description, &task.id)
        .await
        .map_err(|err| format!("generation error: {err}"))?;

    if !generation.ok || generation.code_text.trim().is_empty() {
        return Err(generation
            .error
            .clone()
            .unwrap_or_else(|| "model produced empty output".to_string()));
    }

    let files = agentloop_validator::extract_code_blocks(&generation.code_text);
    if files.is_empty() {
        return Err("no code blocks could be extracted from the generated text".to_string());
    }

    let syntax = agentloop_validator::check_syntax(&files);
    let failing: Vec<String> = syntax
        .iter()
        .filter(|(_, result)| !result.valid)
        .map(|(name, result)| {
            format!(
                "{name}: {}",
                result.error.clone().unwrap_or_else(|| "invalid".to_string())
            )
        })
        .collect();
    if !failing.is_empty() {
        return Err(format!("syntax check failed: {}", failing.join("; ")));
    }

    let test_result = agentloop_validator::run_tests(&files, &ctx.test_config)
        .await
        .map_err(|err| format!("failed to run tests: {err}"))?;
    if !test_result.ok {
        return Err(format!(
            "tests failed with exit code {}: {}",
            test_result.exit_code, test_result.stderr
        ));
    }

    let alias = task
        .target_repo
        .clone()
        .unwrap_or_else(|| ctx.default_repo_alias.to_string());
    let commit_id = commit_to_repository(ctx, task, &alias, &files).await;

    Ok(TaskCompletionSummary {
        files: files.keys().cloned().collect(),
        backend_kind: generation.backend_kind.as_str().to_string(),
        backend_model: generation.backend_model,
        prompt_tokens: generation.prompt_tokens,
        completion_tokens: generation.completion_tokens,
        test_ok: test_result.ok,
        test_exit_code: test_result.exit_code,
        commit_id,
    })
}

/// Materializes generated files into the target repository and commits
/// them. A commit-level failure is logged and swallowed: the generated
/// artifact is still considered produced even if the commit could not be
/// made (spec.md §4.6 step 8).
async fn commit_to_repository(
    ctx: &WorkerContext,
    task: &Task,
    alias: &str,
    files: &IndexMap<String, String>,
) -> Option<String> {
    let lock = ctx.repo_lock(alias).await;
    let _guard = lock.lock().await;

    let binding = match ctx.repos.get(alias).await {
        Ok(binding) => binding,
        Err(err) => {
            tracing::warn!(alias, error = %err, "target repository is not bound, skipping commit");
            return None;
        }
    };

    let working_dir = PathBuf::from(&binding.working_dir);
    if let Err(err) = materialize_files(&working_dir, files).await {
        tracing::warn!(alias, error = %err, "failed to write generated files to repository");
        return None;
    }

    let message = format!("Task {}: {}", task.id, task.description);
    let outcome = match ctx.repos.commit_and_push(alias, Some(message.clone())).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(alias, error = %err, "commit failed");
            return None;
        }
    };

    if !outcome.ok {
        tracing::warn!(alias, error = ?outcome.error, "commit reported failure");
    }

    if let Some(commit_id) = &outcome.commit {
        let record = NewCommitRecord {
            task_id: task.id.clone(),
            commit_id: commit_id.clone(),
            message,
            files_changed: files.keys().cloned().collect(),
        };
        if let Err(err) = ctx.store.append_commit(record).await {
            tracing::error!(task_id = %task.id, error = %err, "failed to record commit");
        }
    }

    outcome.commit
}

async fn materialize_files(
    working_dir: &Path,
    files: &IndexMap<String, String>,
) -> std::io::Result<()> {
    tokio::fs::create_dir_all(working_dir).await?;
    for (filename, source) in files {
        let path = working_dir.join(filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(source.as_bytes()).await?;
    }
    Ok(())
}
