use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    HttpLocal,
    Hosted,
    FileBacked,
}

impl BackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendKind::HttpLocal => "http-local",
            BackendKind::Hosted => "hosted",
            BackendKind::FileBacked => "file-backed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "http-local" => Some(Self::HttpLocal),
            "hosted" => Some(Self::Hosted),
            "file-backed" => Some(Self::FileBacked),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model invocation's generated text plus the telemetry the caller
/// appends to the store as a `ModelCallStat`.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub code_text: String,
    pub backend_kind: BackendKind,
    pub backend_model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub elapsed: Duration,
    pub ok: bool,
    pub error: Option<String>,
}

#[async_trait]
pub trait ModelAdapter: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn model_name(&self) -> &str;

    /// Cheap reachability check: endpoint ping, API key present, fixture
    /// file exists. Never performs a full generation call.
    async fn is_available(&self) -> bool;

    /// Prompt construction is the adapter's own responsibility; callers
    /// only ever supply the task description.
    async fn generate(&self, prompt: &str, task_id: &str) -> Result<GenerationOutcome>;
}
