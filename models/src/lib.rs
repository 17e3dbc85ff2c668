mod adapter;
mod adapters;
mod error;
mod registry;

pub use adapter::BackendKind;
pub use adapter::GenerationOutcome;
pub use adapter::ModelAdapter;
pub use adapters::FileBackedAdapter;
pub use adapters::HostedApiAdapter;
pub use adapters::HttpLocalAdapter;
pub use error::ModelError;
pub use error::Result;
pub use registry::ModelRegistry;

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_store::EventStore;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    async fn store() -> EventStore {
        EventStore::open_in_memory().await.expect("open store")
    }

    #[tokio::test]
    async fn file_backed_adapter_reads_fixture_contents() {
        let mut fixture = NamedTempFile::new().unwrap();
        writeln!(fixture, "# File: main.rs\nfn main() {{}}").unwrap();

        let adapter = FileBackedAdapter::new(fixture.path().to_path_buf(), "fixture".into());
        assert!(adapter.is_available().await);

        let outcome = adapter.generate("write a main fn", "t1").await.unwrap();
        assert!(outcome.ok);
        assert!(outcome.code_text.contains("fn main"));
    }

    #[tokio::test]
    async fn http_local_adapter_generates_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "fn main() {}",
                "prompt_eval_count": 12,
                "eval_count": 4
            })))
            .mount(&server)
            .await;

        let adapter = HttpLocalAdapter::new(server.uri(), "codellama".into());
        assert!(adapter.is_available().await);

        let outcome = adapter.generate("write a main fn", "t1").await.unwrap();
        assert!(outcome.ok);
        assert_eq!(outcome.code_text, "fn main() {}");
        assert_eq!(outcome.prompt_tokens, 12);
        assert_eq!(outcome.completion_tokens, 4);
    }

    #[tokio::test]
    async fn hosted_api_adapter_is_unavailable_without_a_key() {
        let adapter = HostedApiAdapter::new(
            "https://example.invalid".into(),
            String::new(),
            "gpt".into(),
        );
        assert!(!adapter.is_available().await);
    }

    #[tokio::test]
    async fn registry_falls_back_when_preferred_backend_is_unavailable() {
        let fixture = NamedTempFile::new().unwrap();
        let unavailable = Arc::new(HostedApiAdapter::new(
            "https://example.invalid".into(),
            String::new(),
            "gpt".into(),
        ));
        let available = Arc::new(FileBackedAdapter::new(
            fixture.path().to_path_buf(),
            "fixture".into(),
        ));

        let registry = ModelRegistry::new(
            vec![unavailable, available],
            BackendKind::Hosted,
            store().await,
        )
        .await
        .unwrap();

        assert_eq!(registry.active_kind().await, BackendKind::FileBacked);
    }

    #[tokio::test]
    async fn generate_records_a_model_call_stat() {
        let fixture = NamedTempFile::new().unwrap();
        std::fs::write(fixture.path(), "fn main() {}").unwrap();
        let adapter = Arc::new(FileBackedAdapter::new(
            fixture.path().to_path_buf(),
            "fixture".into(),
        ));
        let store = store().await;
        let registry = ModelRegistry::new(vec![adapter], BackendKind::FileBacked, store.clone())
            .await
            .unwrap();

        registry.generate("do a thing", "t1").await.unwrap();

        let rates = store.backend_success_rates().await.unwrap();
        assert_eq!(rates.len(), 1);
    }
}
