use crate::error::RepoError;
use crate::error::Result;
use std::path::Path;
use tokio::process::Command;

/// Runs `git <args>` in `dir` and returns trimmed stdout, following the
/// teacher's git-wrapping convention of shelling out to the `git` binary
/// rather than linking `git2`.
pub(crate) async fn run(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        return Err(RepoError::GitCommand {
            args: args.iter().map(|a| a.to_string()).collect(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Like [`run`], but tolerates a non-zero exit and returns it alongside
/// stdout/stderr instead of converting it into an error. Used for
/// operations like `status --porcelain` style probes where failure is a
/// legitimate outcome a caller branches on.
pub(crate) async fn run_allow_failure(
    dir: &Path,
    args: &[&str],
) -> Result<(bool, String, String)> {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .await?;
    Ok((
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
    ))
}

pub(crate) async fn is_git_repository(dir: &Path) -> bool {
    run(dir, &["rev-parse", "--is-inside-work-tree"])
        .await
        .map(|out| out == "true")
        .unwrap_or(false)
}

pub(crate) async fn current_branch(dir: &Path) -> Option<String> {
    run(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await.ok()
}

pub(crate) async fn remote_url(dir: &Path) -> Option<String> {
    run(dir, &["remote", "get-url", "origin"]).await.ok()
}

pub(crate) async fn has_remote(dir: &Path) -> bool {
    remote_url(dir).await.is_some()
}

pub(crate) async fn is_dirty(dir: &Path) -> Result<bool> {
    let status = run(dir, &["status", "--porcelain"]).await?;
    Ok(!status.is_empty())
}

pub(crate) async fn clone(url: &str, dest: &Path, branch: &str) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    run(
        Path::new("."),
        &[
            "clone",
            "--branch",
            branch,
            url,
            dest.to_string_lossy().as_ref(),
        ],
    )
    .await?;
    Ok(())
}

pub(crate) async fn init(dir: &Path) -> Result<()> {
    run(dir, &["init"]).await?;
    Ok(())
}

pub(crate) async fn pull(dir: &Path) -> Result<String> {
    run(dir, &["pull"]).await
}

pub(crate) async fn add_all(dir: &Path) -> Result<()> {
    run(dir, &["add", "-A"]).await?;
    Ok(())
}

pub(crate) async fn commit(dir: &Path, message: &str) -> Result<String> {
    run(dir, &["commit", "-m", message]).await?;
    run(dir, &["rev-parse", "HEAD"]).await
}

pub(crate) async fn push(dir: &Path) -> Result<()> {
    run(dir, &["push"]).await?;
    Ok(())
}

pub(crate) async fn changed_files(dir: &Path, commit_id: &str) -> Result<Vec<String>> {
    let out = run(
        dir,
        &["show", "--name-only", "--pretty=format:", commit_id],
    )
    .await?;
    Ok(out
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
