use crate::adapter::BackendKind;
use crate::adapter::GenerationOutcome;
use crate::adapter::ModelAdapter;
use crate::error::ModelError;
use crate::error::Result;
use agentloop_store::EventStore;
use agentloop_store::NewModelCallStat;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds every configured adapter and the currently preferred one. Falls
/// back to the first available adapter (logging a warning) when the
/// preferred kind is down, and records a `ModelCallStat` for every
/// `generate` call regardless of outcome.
pub struct ModelRegistry {
    adapters: Vec<Arc<dyn ModelAdapter>>,
    active: RwLock<usize>,
    store: EventStore,
}

impl ModelRegistry {
    /// `preferred` selects the initial active adapter by kind; if it is
    /// unavailable (or absent from `adapters`) the first available adapter
    /// is used instead.
    pub async fn new(
        adapters: Vec<Arc<dyn ModelAdapter>>,
        preferred: BackendKind,
        store: EventStore,
    ) -> Result<Self> {
        if adapters.is_empty() {
            return Err(ModelError::NoAdapterAvailable);
        }

        let mut active = adapters
            .iter()
            .position(|adapter| adapter.kind() == preferred);

        if let Some(index) = active {
            if !adapters[index].is_available().await {
                active = None;
            }
        }

        let active = match active {
            Some(index) => index,
            None => {
                let mut fallback = None;
                for (index, adapter) in adapters.iter().enumerate() {
                    if adapter.is_available().await {
                        fallback = Some(index);
                        break;
                    }
                }
                match fallback {
                    Some(index) => {
                        tracing::warn!(
                            preferred = preferred.as_str(),
                            fallback = adapters[index].kind().as_str(),
                            "preferred model backend unavailable, falling back"
                        );
                        index
                    }
                    None => return Err(ModelError::NoAdapterAvailable),
                }
            }
        };

        Ok(Self {
            adapters,
            active: RwLock::new(active),
            store,
        })
    }

    pub async fn active_kind(&self) -> BackendKind {
        let index = *self.active.read().await;
        self.adapters[index].kind()
    }

    /// Switch the active adapter; fails without changing state if the
    /// target kind is unavailable or unconfigured.
    pub async fn switch(&self, kind: BackendKind) -> bool {
        let Some(index) = self.adapters.iter().position(|adapter| adapter.kind() == kind) else {
            return false;
        };
        if !self.adapters[index].is_available().await {
            return false;
        }
        *self.active.write().await = index;
        true
    }

    pub async fn generate(&self, prompt: &str, task_id: &str) -> Result<GenerationOutcome> {
        let index = *self.active.read().await;
        let adapter = Arc::clone(&self.adapters[index]);
        let outcome = adapter.generate(prompt, task_id).await?;

        let stat = NewModelCallStat {
            task_id: task_id.to_string(),
            backend_kind: outcome.backend_kind.as_str().to_string(),
            backend_model: outcome.backend_model.clone(),
            prompt_tokens: outcome.prompt_tokens,
            completion_tokens: outcome.completion_tokens,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            ok: outcome.ok,
            error: outcome.error.clone(),
        };
        if let Err(err) = self.store.append_model_stat(stat).await {
            tracing::warn!(error = %err, "failed to record model call stat");
        }

        Ok(outcome)
    }
}
