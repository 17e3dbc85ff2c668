use crate::config::REPORTS_DIR;
use agentloop_store::EventStore;
use chrono::DateTime;
use chrono::Utc;

/// Renders the weekly summary report for the window `[start, end)`, spec.md
/// §4.8's checkpoint sequence. Reads from the store only; presentation is
/// replaceable (spec.md §1 calls the renderer out as an external
/// collaborator) but the core still needs *a* renderer to produce a runnable
/// checkpoint, so this is the plain-markdown version.
pub async fn render_summary(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<String> {
    let task_stats = store.task_stats().await?;
    let commits = store.recent_commits(1000).await?;
    let commits_in_window: Vec<_> = commits
        .into_iter()
        .filter(|commit| commit.created_at >= start && commit.created_at < end)
        .collect();
    let completed = store.completed_between(start, end, 1000).await?;

    let mut report = String::new();
    report.push_str(&format!(
        "# Weekly Summary: {} to {}\n\n",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    ));

    report.push_str("## Task Status\n\n");
    for (status, count) in &task_stats {
        report.push_str(&format!("- {status}: {count}\n"));
    }

    report.push_str(&format!(
        "\n## Tasks Completed This Window: {}\n\n",
        completed.len()
    ));
    for task in completed.iter().take(50) {
        report.push_str(&format!("- `{}`: {}\n", task.id, task.description));
    }

    report.push_str(&format!(
        "\n## Commits This Window: {}\n\n",
        commits_in_window.len()
    ));
    for commit in &commits_in_window {
        report.push_str(&format!(
            "- `{}` ({} files): {}\n",
            commit.commit_id,
            commit.files_changed.len(),
            commit.message
        ));
    }

    Ok(report)
}

/// Writes the rendered report to `reports/weekly_summary_{start}_{end}.md`,
/// creating the directory if absent.
pub async fn write_report(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    body: &str,
) -> anyhow::Result<std::path::PathBuf> {
    tokio::fs::create_dir_all(REPORTS_DIR).await?;
    let path = std::path::Path::new(REPORTS_DIR).join(format!(
        "weekly_summary_{}_{}.md",
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    ));
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_store::Task;

    #[tokio::test]
    async fn renders_a_report_with_task_and_commit_sections() {
        let store = EventStore::open_in_memory().await.unwrap();
        let task = Task::new("t1".into(), "write a function".into(), 1, 3, None);
        store.record_task_created(&task).await.unwrap();
        store.mark_started(&task.id, "worker-0").await.unwrap();
        store.mark_completed(&task.id, "{}").await.unwrap();

        let start = Utc::now() - chrono::Duration::days(7);
        let end = Utc::now() + chrono::Duration::minutes(1);
        let report = render_summary(&store, start, end).await.unwrap();
        assert!(report.contains("Weekly Summary"));
        assert!(report.contains("t1"));
    }
}
