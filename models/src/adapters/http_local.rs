use crate::adapter::BackendKind;
use crate::adapter::GenerationOutcome;
use crate::adapter::ModelAdapter;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use std::time::Instant;

/// Talks to a locally-hosted HTTP generation endpoint (an Ollama-style
/// server). Availability is a cheap GET against the base URL.
pub struct HttpLocalAdapter {
    client: reqwest::Client,
    base_url: String,
    model_name: String,
}

impl HttpLocalAdapter {
    pub fn new(base_url: String, model_name: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model_name,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[async_trait]
impl ModelAdapter for HttpLocalAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::HttpLocal
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(&self.base_url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn generate(&self, prompt: &str, _task_id: &str) -> Result<GenerationOutcome> {
        let started = Instant::now();
        let request = GenerateRequest {
            model: &self.model_name,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')))
            .json(&request)
            .send()
            .await;

        let elapsed = started.elapsed();

        match response {
            Ok(response) if response.status().is_success() => {
                match response.json::<GenerateResponse>().await {
                    Ok(body) => Ok(GenerationOutcome {
                        code_text: body.response,
                        backend_kind: BackendKind::HttpLocal,
                        backend_model: self.model_name.clone(),
                        prompt_tokens: body.prompt_eval_count,
                        completion_tokens: body.eval_count,
                        elapsed,
                        ok: true,
                        error: None,
                    }),
                    Err(err) => Ok(failed_outcome(&self.model_name, elapsed, err.to_string())),
                }
            }
            Ok(response) => Ok(failed_outcome(
                &self.model_name,
                elapsed,
                format!("generation endpoint returned {}", response.status()),
            )),
            Err(err) => Ok(failed_outcome(&self.model_name, elapsed, err.to_string())),
        }
    }
}

fn failed_outcome(model_name: &str, elapsed: Duration, error: String) -> GenerationOutcome {
    GenerationOutcome {
        code_text: String::new(),
        backend_kind: BackendKind::HttpLocal,
        backend_model: model_name.to_string(),
        prompt_tokens: 0,
        completion_tokens: 0,
        elapsed,
        ok: false,
        error: Some(error),
    }
}
