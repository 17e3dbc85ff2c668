use crate::error::Result;
use crate::error::SupervisorError;
use agentloop_models::BackendKind;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Name the task-file loader watches in the current working directory,
/// ported from `main.py`'s hardcoded `'tasks.yaml'`.
pub const TASK_FILE_NAME: &str = "tasks.yaml";

/// Minimum gap between successive reloads of the same task file, spec.md
/// §4.8 ("debounce rapid modification events (>= 2s)").
pub const TASK_FILE_DEBOUNCE: Duration = Duration::from_secs(2);

/// Directory the checkpoint sequence writes `weekly_summary_*.md` reports
/// into, spec.md §6's persisted-state layout.
pub const REPORTS_DIR: &str = "reports";

/// How long an event or a completed task survives before the retention
/// timer prunes it. Not an explicit spec.md §6 key (the spec names the
/// operation but not its schedule); kept as a named tunable rather than an
/// inlined magic number, per spec.md §9's guidance on preserved constants.
pub const EVENT_RETENTION_DAYS: i64 = 30;
pub const COMPLETED_TASK_RETENTION_DAYS: i64 = 30;

/// How often the retention timer runs, spec.md §4.8 ("every 1 h").
pub const RETENTION_INTERVAL: Duration = Duration::from_secs(3600);

/// How often the checkpoint timer re-checks whether a checkpoint is due,
/// spec.md §4.8 ("checkpoint timer (every tick)").
pub const CHECKPOINT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Every configuration key from spec.md §6, loaded from the environment
/// with typed defaults. Plain `std::env::var` + `FromStr` rather than an
/// extra config-loading crate, since nothing in the teacher's own
/// dependency tree pulls one in for this purpose.
#[derive(Debug, Clone)]
pub struct Config {
    pub model_type: BackendKind,
    pub model_name: String,
    pub model_base_url: String,
    pub model_api_key: Option<String>,
    pub model_file_path: PathBuf,

    pub worker_count: usize,
    pub max_retries: u32,
    pub task_timeout: Duration,

    pub http_host: String,
    pub http_port: u16,

    pub db_path: PathBuf,

    pub branch: String,
    pub auto_push: bool,

    pub checkpoint_days: i64,
    pub state_save_interval: Duration,

    pub log_level: String,
    pub max_log_entries: i64,

    pub reviewer_workers: usize,
    pub review_interval: Duration,
    pub deep_review_interval: Duration,
    pub reviewer_enabled: bool,
    pub create_followup_tasks: bool,
    pub major_task_grace_period_days: i64,

    pub repos_base_dir: PathBuf,
    pub max_connected_repos: usize,
    pub auto_pull_updates: bool,
    pub auto_scan_repos: bool,

    /// Not a spec.md §6 key: the spec names "the project's declared test
    /// command" without saying where it is declared. We source it from the
    /// environment like every other tunable rather than inventing a
    /// separate per-project manifest format.
    pub test_command: Vec<String>,
    pub install_command: Option<Vec<String>>,
}

impl Config {
    /// Load every key, falling back to its default when unset or
    /// unparsable for a variable whose presence is itself optional
    /// (`model_api_key` aside, which is absent by design when unset).
    pub fn from_env() -> Result<Self> {
        let model_type = match env_var("MODEL_TYPE") {
            Some(raw) => BackendKind::parse(&raw).ok_or_else(|| {
                SupervisorError::Configuration(format!("invalid MODEL_TYPE {raw:?}"))
            })?,
            None => BackendKind::HttpLocal,
        };

        Ok(Self {
            model_type,
            model_name: env_var("MODEL_NAME").unwrap_or_else(|| "codellama".to_string()),
            model_base_url: env_var("MODEL_BASE_URL")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            model_api_key: env_var("MODEL_API_KEY"),
            model_file_path: env_path("MODEL_FILE_PATH", "./models/fixture.txt"),

            worker_count: env_parse("WORKER_COUNT", 3)?,
            max_retries: env_parse("MAX_RETRIES", 3)?,
            task_timeout: Duration::from_secs(env_parse("TASK_TIMEOUT", 300)?),

            http_host: env_var("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            http_port: env_parse("HTTP_PORT", 8000)?,

            db_path: env_path("DB_PATH", "./agentloop.sqlite"),

            branch: env_var("BRANCH").unwrap_or_else(|| "main".to_string()),
            auto_push: env_bool("AUTO_PUSH", true)?,

            checkpoint_days: env_parse("CHECKPOINT_DAYS", 7)?,
            state_save_interval: Duration::from_secs(env_parse("STATE_SAVE_INTERVAL", 3600)?),

            log_level: env_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            max_log_entries: env_parse("MAX_LOG_ENTRIES", 10_000)?,

            reviewer_workers: env_parse("REVIEWER_WORKERS", 2)?,
            review_interval: Duration::from_secs(env_parse("REVIEW_INTERVAL", 300)?),
            deep_review_interval: Duration::from_secs(env_parse("DEEP_REVIEW_INTERVAL", 1800)?),
            reviewer_enabled: env_bool("REVIEWER_ENABLED", true)?,
            create_followup_tasks: env_bool("CREATE_FOLLOWUP_TASKS", true)?,
            major_task_grace_period_days: env_parse("MAJOR_TASK_GRACE_PERIOD_DAYS", 7)?,

            repos_base_dir: env_path("REPOS_BASE_DIR", "./connected_repositories"),
            max_connected_repos: env_parse("MAX_CONNECTED_REPOS", 10)?,
            auto_pull_updates: env_bool("AUTO_PULL_UPDATES", false)?,
            auto_scan_repos: env_bool("AUTO_SCAN_REPOS", true)?,

            test_command: env_var("TEST_COMMAND")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| vec!["true".to_string()]),
            install_command: env_var("INSTALL_COMMAND")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect()),
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env_var(key).unwrap_or_else(|| default.to_string()))
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
{
    match env_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| SupervisorError::Configuration(format!("invalid {key} {raw:?}"))),
        None => Ok(default),
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env_var(key) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(SupervisorError::Configuration(format!(
                "invalid boolean {key} {raw:?}"
            ))),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        // SAFETY: single-threaded test process, no concurrent env mutation.
        unsafe {
            std::env::remove_var("WORKER_COUNT");
            std::env::remove_var("MODEL_TYPE");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.model_type, BackendKind::HttpLocal);
        assert_eq!(config.branch, "main");
    }

    #[test]
    fn rejects_an_unparsable_model_type() {
        // SAFETY: single-threaded test process, no concurrent env mutation.
        unsafe {
            std::env::set_var("MODEL_TYPE", "not-a-backend");
        }
        let result = Config::from_env();
        unsafe {
            std::env::remove_var("MODEL_TYPE");
        }
        assert!(matches!(result, Err(SupervisorError::Configuration(_))));
    }
}
