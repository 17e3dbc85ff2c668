use crate::adapter::BackendKind;
use crate::adapter::GenerationOutcome;
use crate::adapter::ModelAdapter;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use std::time::Instant;

/// Talks to a hosted LLM API authenticated with a bearer API key.
pub struct HostedApiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model_name: String,
}

impl HostedApiAdapter {
    pub fn new(base_url: String, api_key: String, model_name: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model_name,
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[async_trait]
impl ModelAdapter for HostedApiAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Hosted
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, prompt: &str, _task_id: &str) -> Result<GenerationOutcome> {
        let started = Instant::now();
        let request = ChatRequest {
            model: &self.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(60))
            .json(&request)
            .send()
            .await;

        let elapsed = started.elapsed();

        match response {
            Ok(response) if response.status().is_success() => {
                match response.json::<ChatResponse>().await {
                    Ok(mut body) if !body.choices.is_empty() => {
                        let choice = body.choices.remove(0);
                        let usage = body.usage.unwrap_or(ChatUsage {
                            prompt_tokens: 0,
                            completion_tokens: 0,
                        });
                        Ok(GenerationOutcome {
                            code_text: choice.message.content,
                            backend_kind: BackendKind::Hosted,
                            backend_model: self.model_name.clone(),
                            prompt_tokens: usage.prompt_tokens,
                            completion_tokens: usage.completion_tokens,
                            elapsed,
                            ok: true,
                            error: None,
                        })
                    }
                    Ok(_) => Ok(failed_outcome(
                        &self.model_name,
                        elapsed,
                        "hosted API returned no choices".to_string(),
                    )),
                    Err(err) => Ok(failed_outcome(&self.model_name, elapsed, err.to_string())),
                }
            }
            Ok(response) => Ok(failed_outcome(
                &self.model_name,
                elapsed,
                format!("hosted API returned {}", response.status()),
            )),
            Err(err) => Ok(failed_outcome(&self.model_name, elapsed, err.to_string())),
        }
    }
}

fn failed_outcome(model_name: &str, elapsed: Duration, error: String) -> GenerationOutcome {
    GenerationOutcome {
        code_text: String::new(),
        backend_kind: BackendKind::Hosted,
        backend_model: model_name.to_string(),
        prompt_tokens: 0,
        completion_tokens: 0,
        elapsed,
        ok: false,
        error: Some(error),
    }
}
