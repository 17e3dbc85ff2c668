use crate::adapter::BackendKind;
use crate::adapter::GenerationOutcome;
use crate::adapter::ModelAdapter;
use crate::error::ModelError;
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Instant;

/// Reads a canned response from a fixture file on disk, standing in for
/// an offline local model. Useful for tests and offline operation.
pub struct FileBackedAdapter {
    file_path: PathBuf,
    model_name: String,
}

impl FileBackedAdapter {
    pub fn new(file_path: PathBuf, model_name: String) -> Self {
        Self {
            file_path,
            model_name,
        }
    }
}

#[async_trait]
impl ModelAdapter for FileBackedAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::FileBacked
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.file_path).await.is_ok()
    }

    async fn generate(&self, _prompt: &str, _task_id: &str) -> Result<GenerationOutcome> {
        let started = Instant::now();
        let contents = tokio::fs::read_to_string(&self.file_path)
            .await
            .map_err(|source| ModelError::FixtureRead {
                path: self.file_path.display().to_string(),
                source,
            })?;
        let elapsed = started.elapsed();

        Ok(GenerationOutcome {
            prompt_tokens: 0,
            completion_tokens: contents.split_whitespace().count() as u64,
            code_text: contents,
            backend_kind: BackendKind::FileBacked,
            backend_model: self.model_name.clone(),
            elapsed,
            ok: true,
            error: None,
        })
    }
}
