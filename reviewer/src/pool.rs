use crate::analysis;
use crate::analysis::DeepFindings;
use crate::analysis::ReviewFindings;
use crate::error::ReviewerError;
use crate::error::Result;
use crate::stats::ReviewStats;
use crate::stats::ReviewStatsSnapshot;
use agentloop_models::ModelRegistry;
use agentloop_queue::PriorityQueue;
use agentloop_repo::RepositoryRegistry;
use agentloop_store::EventStore;
use agentloop_store::NewReviewFinding;
use agentloop_store::Task;
use agentloop_store::TaskStatus;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tunables the original hardcoded as instance attributes
/// (`review_interval`, `deep_analysis_interval`, `major_task_grace_period`).
#[derive(Debug, Clone)]
pub struct ReviewerOptions {
    pub review_interval: Duration,
    pub deep_analysis_interval: Duration,
    pub major_task_grace_period: Duration,
    /// Number of `syntax_issues ∪ logic_errors` findings that triggers a
    /// follow-up task (spec.md §4.7).
    pub follow_up_issue_threshold: usize,
    pub create_follow_ups: bool,
    pub default_repo_alias: String,
    /// Upper bound on rows fetched for the primary (last-24h) query.
    pub primary_batch_limit: i64,
}

impl Default for ReviewerOptions {
    fn default() -> Self {
        Self {
            review_interval: Duration::from_secs(300),
            deep_analysis_interval: Duration::from_secs(1800),
            major_task_grace_period: Duration::from_secs(7 * 24 * 3600),
            follow_up_issue_threshold: 3,
            create_follow_ups: true,
            default_repo_alias: "default".to_string(),
            primary_batch_limit: 200,
        }
    }
}

#[derive(Deserialize, Default)]
struct CompletionPayload {
    #[serde(default)]
    files: Vec<String>,
}

struct Shared {
    store: EventStore,
    queue: PriorityQueue,
    repos: Arc<RepositoryRegistry>,
    models: Arc<ModelRegistry>,
    options: ReviewerOptions,
    stats: ReviewStats,
}

/// Owns the Tireless Reviewer's primary and deep cadence loops, spec.md
/// §4.7, grounded in `tireless_reviewer.py`'s `TirelessReviewer` class.
pub struct ReviewerPool {
    shared: Arc<Shared>,
    primary: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
    deep: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl ReviewerPool {
    pub fn new(
        store: EventStore,
        queue: PriorityQueue,
        repos: Arc<RepositoryRegistry>,
        models: Arc<ModelRegistry>,
        options: ReviewerOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                queue,
                repos,
                models,
                options,
                stats: ReviewStats::new(),
            }),
            primary: Mutex::new(None),
            deep: Mutex::new(None),
        }
    }

    /// Spawns the primary and deep review loops if not already running.
    pub async fn start(&self) {
        let mut primary = self.primary.lock().await;
        if primary.is_none() {
            let cancel = CancellationToken::new();
            let shared = Arc::clone(&self.shared);
            let token = cancel.clone();
            let join = tokio::spawn(async move { primary_loop(shared, token).await });
            *primary = Some((cancel, join));
        }

        let mut deep = self.deep.lock().await;
        if deep.is_none() {
            let cancel = CancellationToken::new();
            let shared = Arc::clone(&self.shared);
            let token = cancel.clone();
            let join = tokio::spawn(async move { deep_loop(shared, token).await });
            *deep = Some((cancel, join));
        }
    }

    pub async fn stop(&self) {
        if let Some((cancel, join)) = self.primary.lock().await.take() {
            cancel.cancel();
            let _ = join.await;
        }
        if let Some((cancel, join)) = self.deep.lock().await.take() {
            cancel.cancel();
            let _ = join.await;
        }
    }

    pub async fn stats(&self) -> ReviewStatsSnapshot {
        self.shared.stats.snapshot().await
    }

    /// Manually triggers a primary review of one task, ports
    /// `force_review_task`.
    pub async fn force_review(&self, task_id: &str) -> Result<ReviewFindings> {
        let task = self.shared.store.get_task(task_id).await?;
        if task.status != TaskStatus::Completed {
            return Err(ReviewerError::NotCompleted {
                task_id: task_id.to_string(),
            });
        }
        review_completed_task(&self.shared, &task).await
    }
}

async fn primary_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    loop {
        let now = Utc::now();
        let window_start = now - chrono::Duration::hours(24);
        match shared
            .store
            .completed_between(window_start, now, shared.options.primary_batch_limit)
            .await
        {
            Ok(tasks) => {
                for task in tasks {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if should_respect_major_task(&task, shared.options.major_task_grace_period) {
                        shared
                            .stats
                            .mutate(|stats| stats.major_tasks_respected += 1)
                            .await;
                        continue;
                    }
                    if let Err(err) = review_completed_task(&shared, &task).await {
                        tracing::error!(task_id = %task.id, error = %err, "primary review failed");
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load recently completed tasks");
            }
        }

        shared.stats.mutate(|stats| stats.last_review = Some(now)).await;

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(shared.options.review_interval) => {}
        }
    }
}

async fn deep_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    loop {
        let now = Utc::now();
        let window_start = now - chrono::Duration::hours(168);
        let window_end = now - chrono::Duration::hours(24);
        match shared.store.completed_between(window_start, window_end, 50).await {
            Ok(tasks) => {
                for task in tasks {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if let Err(err) = deep_review_task(&shared, &task).await {
                        tracing::error!(task_id = %task.id, error = %err, "deep review failed");
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_secs(2)) => {}
                    }
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load tasks for deep review");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(shared.options.deep_analysis_interval) => {}
        }
    }
}

fn should_respect_major_task(task: &Task, grace_period: Duration) -> bool {
    let Some(completed_at) = task.completed_at else {
        return false;
    };
    let elapsed = Utc::now() - completed_at;
    let within_grace = elapsed
        .to_std()
        .map(|elapsed| elapsed < grace_period)
        .unwrap_or(false);
    analysis::is_major_task(&task.description) && within_grace
}

async fn load_files(
    shared: &Shared,
    task: &Task,
) -> Option<(PathBuf, Vec<(String, String)>, HashSet<String>)> {
    let payload: CompletionPayload = match &task.result {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw).unwrap_or_default(),
        _ => return None,
    };
    if payload.files.is_empty() {
        return None;
    }

    let alias = task
        .target_repo
        .clone()
        .unwrap_or_else(|| shared.options.default_repo_alias.clone());
    let binding = shared.repos.get(&alias).await.ok()?;
    let working_dir = PathBuf::from(&binding.working_dir);

    let local_modules: HashSet<String> = payload
        .files
        .iter()
        .filter_map(|name| name.strip_suffix(".py"))
        .map(|stem| stem.rsplit('/').next().unwrap_or(stem).to_string())
        .collect();

    let mut contents = Vec::with_capacity(payload.files.len());
    for filename in payload.files {
        let path = working_dir.join(&filename);
        if let Ok(content) = tokio::fs::read_to_string(&path).await {
            contents.push((filename, content));
        }
    }
    Some((working_dir, contents, local_modules))
}

async fn review_completed_task(shared: &Shared, task: &Task) -> Result<ReviewFindings> {
    let Some((_, files, local_modules)) = load_files(shared, task).await else {
        return Ok(ReviewFindings::default());
    };

    let mut findings = ReviewFindings::default();
    for (filename, content) in &files {
        findings
            .syntax_issues
            .extend(analysis::syntax_issues(filename, content));
        findings
            .integration_problems
            .extend(analysis::integration_issues(filename, content, &local_modules));
        findings
            .improvement_suggestions
            .extend(analysis::improvement_suggestions(filename, content));
        findings
            .consistency_issues
            .extend(analysis::consistency_issues(filename));
    }
    findings
        .logic_errors
        .extend(check_logic_consistency(shared, task).await);

    if !findings.is_empty() {
        shared
            .stats
            .mutate(|stats| stats.issues_discovered += findings.total() as u64)
            .await;
        persist_findings(shared, &task.id, "primary", &findings).await;
        maybe_create_followup(shared, task, &findings).await;
    }
    shared.stats.mutate(|stats| stats.tasks_reviewed += 1).await;
    Ok(findings)
}

async fn check_logic_consistency(shared: &Shared, task: &Task) -> Vec<String> {
    let prompt = format!(
        "Analyze the following task and its implementation for logical consistency:\n\n\
         Task Description: {}\n\nImplementation Summary: {}\n\n\
         Check for:\n1. Does the implementation actually solve the described problem?\n\
         2. Are there logical gaps or missing functionality?\n\
         3. Are there contradictions between requirements and implementation?\n\
         4. Are edge cases properly handled?\n\n\
         Return a JSON list of issues found, or empty list if no issues.",
        task.description,
        task.result.clone().unwrap_or_default(),
    );

    let outcome = match shared
        .models
        .generate(&prompt, &format!("{}_validation", task.id))
        .await
    {
        Ok(outcome) if outcome.ok => outcome,
        _ => return Vec::new(),
    };

    let trimmed = outcome.code_text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Ok(issues) = serde_json::from_str::<Vec<String>>(trimmed) {
        return issues;
    }
    if !trimmed.to_lowercase().contains("no issues") {
        let preview: String = trimmed.chars().take(200).collect();
        return vec![format!("Logic analysis suggests: {preview}...")];
    }
    Vec::new()
}

async fn deep_review_task(shared: &Shared, task: &Task) -> Result<DeepFindings> {
    let Some((_, files, _)) = load_files(shared, task).await else {
        return Ok(DeepFindings::default());
    };

    let mut findings = DeepFindings::default();
    for (filename, content) in &files {
        findings
            .performance
            .extend(analysis::performance_issues(filename, content));
        findings
            .security
            .extend(analysis::security_issues(filename, content));
        findings
            .documentation
            .extend(analysis::documentation_issues(filename, content));
        findings
            .maintainability
            .extend(analysis::maintainability_issues(filename, content));
    }

    if !findings.is_empty() {
        shared
            .stats
            .mutate(|stats| stats.improvements_suggested += findings.total() as u64)
            .await;
        persist_deep_findings(shared, &task.id, &findings).await;
    }
    Ok(findings)
}

async fn persist_findings(shared: &Shared, task_id: &str, prefix: &str, findings: &ReviewFindings) {
    let categories: [(&str, &Vec<String>); 5] = [
        ("syntax_issues", &findings.syntax_issues),
        ("logic_errors", &findings.logic_errors),
        ("integration_problems", &findings.integration_problems),
        ("consistency_issues", &findings.consistency_issues),
        ("improvement_suggestions", &findings.improvement_suggestions),
    ];
    for (category, issues) in categories {
        if issues.is_empty() {
            continue;
        }
        let finding = NewReviewFinding {
            task_id: task_id.to_string(),
            review_kind: format!("{prefix}_{category}"),
            issues: serde_json::json!(issues),
        };
        if let Err(err) = shared.store.append_review_finding(finding).await {
            tracing::error!(task_id, error = %err, "failed to persist review finding");
        }
    }
}

async fn persist_deep_findings(shared: &Shared, task_id: &str, findings: &DeepFindings) {
    let categories: [(&str, &Vec<String>); 4] = [
        ("performance", &findings.performance),
        ("security", &findings.security),
        ("documentation", &findings.documentation),
        ("maintainability", &findings.maintainability),
    ];
    for (category, issues) in categories {
        if issues.is_empty() {
            continue;
        }
        let finding = NewReviewFinding {
            task_id: task_id.to_string(),
            review_kind: format!("deep_{category}"),
            issues: serde_json::json!(issues),
        };
        if let Err(err) = shared.store.append_review_finding(finding).await {
            tracing::error!(task_id, error = %err, "failed to persist deep review finding");
        }
    }
}

async fn maybe_create_followup(shared: &Shared, task: &Task, findings: &ReviewFindings) {
    if !shared.options.create_follow_ups {
        return;
    }
    let critical: Vec<&String> = findings
        .syntax_issues
        .iter()
        .chain(findings.logic_errors.iter())
        .collect();
    if critical.len() < shared.options.follow_up_issue_threshold {
        return;
    }

    let short_id: String = task.id.chars().take(8).collect();
    let bullet_list: String = critical
        .iter()
        .take(5)
        .map(|issue| format!("- {issue}"))
        .collect::<Vec<_>>()
        .join("\n");
    let description = format!(
        "Tireless Reviewer follow-up for task {short_id}:\n\n\
         Critical issues discovered:\n{bullet_list}\n\n\
         These quality findings should be addressed to improve reliability and maintainability."
    );

    let follow_up = Task::new(
        uuid::Uuid::new_v4().to_string(),
        description,
        2,
        task.max_retries,
        task.target_repo.clone(),
    );
    let follow_up_id = follow_up.id.clone();
    if let Err(err) = shared.queue.put(follow_up).await {
        tracing::error!(task_id = %task.id, error = %err, "failed to enqueue follow-up task");
    } else {
        tracing::info!(task_id = %task.id, follow_up_id, "created follow-up task for review findings");
    }
}
