use indexmap::IndexMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Configuration for [`run_tests`], generalizing
/// `test_runner.py::_run_pytest`'s hardcoded `python -m pytest` invocation
/// into a project-declared command.
#[derive(Debug, Clone)]
pub struct TestRunConfig {
    pub test_command: Vec<String>,
    pub install_command: Option<Vec<String>>,
    pub timeout: Duration,
}

/// Outcome of materializing and exercising generated files in a temporary
/// workspace. `exit_code = 124` distinguishes a timeout from an ordinary
/// test failure, matching `subprocess.TimeoutExpired`'s conventional code.
#[derive(Debug, Clone)]
pub struct TestRunResult {
    pub ok: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
}

/// Materializes `files` into a fresh temp directory, synthesizes a basic
/// smoke test for any Python file that has no accompanying test, optionally
/// installs declared dependencies, then runs the configured test command
/// under `timeout`. The workspace is removed on every exit path (the
/// `TempDir` guard is dropped at the end of the function).
///
/// Never mutates the caller's repository: everything happens inside the
/// temp directory returned by `tempfile::tempdir`.
pub async fn run_tests(
    files: &IndexMap<String, String>,
    config: &TestRunConfig,
) -> std::io::Result<TestRunResult> {
    if files.is_empty() {
        return Ok(TestRunResult {
            ok: false,
            exit_code: 1,
            stdout: String::new(),
            stderr: String::new(),
            error: Some("no code blocks found in generated text".to_string()),
        });
    }

    let workspace = tempfile::tempdir()?;
    let workspace_path = workspace.path();

    let mut has_test_file = false;
    for (filename, source) in files {
        if source.trim().is_empty() {
            continue;
        }
        write_file(workspace_path, filename, source).await?;
        if filename.contains("test") {
            has_test_file = true;
        }
    }

    if !has_test_file {
        for (filename, source) in files {
            if source.trim().is_empty() {
                continue;
            }
            if let Some((test_name, test_source)) = synthesize_basic_test(filename) {
                write_file(workspace_path, &test_name, &test_source).await?;
            }
        }
    }

    if let Some(install_command) = &config.install_command {
        let _ = run_command(workspace_path, install_command, config.timeout).await;
    }

    run_command(workspace_path, &config.test_command, config.timeout).await
}

async fn write_file(workspace: &Path, filename: &str, source: &str) -> std::io::Result<PathBuf> {
    let path = workspace.join(filename);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(source.as_bytes()).await?;
    Ok(path)
}

async fn run_command(
    workspace: &Path,
    command: &[String],
    timeout: Duration,
) -> std::io::Result<TestRunResult> {
    let Some((program, args)) = command.split_first() else {
        return Ok(TestRunResult {
            ok: true,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
        });
    };

    // `kill_on_drop` ensures the child is reaped if the `wait_with_output`
    // future below is dropped on timeout, matching `subprocess.run(...,
    // timeout=...)`'s behavior of killing the child on `TimeoutExpired`
    // (original_source/test_runner.py:256,298-305) instead of orphaning it.
    let child = Command::new(program)
        .args(args)
        .current_dir(workspace)
        .kill_on_drop(true)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let exit_code = output.status.code().unwrap_or(1);
            Ok(TestRunResult {
                ok: output.status.success(),
                exit_code,
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                error: if output.status.success() {
                    None
                } else {
                    Some(format!("command exited with status {exit_code}"))
                },
            })
        }
        Ok(Err(err)) => Err(err),
        Err(_) => Ok(TestRunResult {
            ok: false,
            exit_code: 124,
            stdout: String::new(),
            stderr: format!("tests timed out after {timeout:?}"),
            error: Some("timeout".to_string()),
        }),
    }
}

/// Ports `test_runner.py::create_basic_test` for Python files, the one
/// language the original ever synthesized a test for. Other languages are
/// left to the project's own test suite (see DESIGN.md).
fn synthesize_basic_test(filename: &str) -> Option<(String, String)> {
    let stem = filename.strip_suffix(".py")?;
    let module = stem.replace('/', "_");
    let test_name = format!("test_{module}_smoke.py");
    let test_source = format!(
        r#"import importlib.util
import pathlib

def test_{module}_parses():
    source = pathlib.Path("{filename}").read_text()
    compile(source, "{filename}", "exec")

def test_{module}_imports():
    spec = importlib.util.spec_from_file_location("{module}", "{filename}")
    module = importlib.util.module_from_spec(spec)
    spec.loader.exec_module(module)
"#
    );
    Some((test_name, test_source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[tokio::test]
    async fn runs_a_trivial_echo_command_successfully() {
        let files = indexmap! { "main.txt".to_string() => "hello".to_string() };
        let config = TestRunConfig {
            test_command: vec!["true".to_string()],
            install_command: None,
            timeout: Duration::from_secs(5),
        };
        let result = run_tests(&files, &config).await.unwrap();
        assert!(result.ok);
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn reports_a_nonzero_exit_code_as_failure() {
        let files = indexmap! { "main.txt".to_string() => "hello".to_string() };
        let config = TestRunConfig {
            test_command: vec!["false".to_string()],
            install_command: None,
            timeout: Duration::from_secs(5),
        };
        let result = run_tests(&files, &config).await.unwrap();
        assert!(!result.ok);
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn a_hanging_command_times_out_with_exit_code_124() {
        let files = indexmap! { "main.txt".to_string() => "hello".to_string() };
        let config = TestRunConfig {
            test_command: vec!["sleep".to_string(), "5".to_string()],
            install_command: None,
            timeout: Duration::from_millis(50),
        };
        let result = run_tests(&files, &config).await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.exit_code, 124);
    }

    #[tokio::test]
    async fn a_timed_out_command_does_not_leave_an_orphaned_process() {
        let pidfile = tempfile::NamedTempFile::new().unwrap();
        let pidfile_path = pidfile.path().to_string_lossy().to_string();
        let files = indexmap! { "main.txt".to_string() => "hello".to_string() };
        let config = TestRunConfig {
            test_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("echo $$ > {pidfile_path}; sleep 5"),
            ],
            install_command: None,
            timeout: Duration::from_millis(100),
        };
        let result = run_tests(&files, &config).await.unwrap();
        assert_eq!(result.exit_code, 124);

        let pid: i32 = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(contents) = tokio::fs::read_to_string(&pidfile_path).await {
                    if let Ok(pid) = contents.trim().parse() {
                        return pid;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("child never wrote its pid");

        let still_alive = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !std::path::Path::new(&format!("/proc/{pid}")).exists() {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap_or(true);
        assert!(!still_alive, "child process {pid} was not reaped after timeout");
    }

    #[tokio::test]
    async fn empty_file_map_is_reported_as_failure_without_running_anything() {
        let files = IndexMap::new();
        let config = TestRunConfig {
            test_command: vec!["true".to_string()],
            install_command: None,
            timeout: Duration::from_secs(5),
        };
        let result = run_tests(&files, &config).await.unwrap();
        assert!(!result.ok);
        assert!(result.error.is_some());
    }
}
