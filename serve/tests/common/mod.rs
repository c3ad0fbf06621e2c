//! Shared e2e harness: spawns a real server on a random port backed by a
//! temporary sqlite file and a `wiremock` stand-in for the OpenAI-compatible
//! provider endpoint.

use std::path::PathBuf;

use config::AppConfig;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::MockServer;

pub struct TestServer {
    pub base_url: String,
    pub provider_base_url: String,
    pub client: reqwest::Client,
    _db_dir: tempfile::TempDir,
    _resource_dir: tempfile::TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>,
    pub mock_provider: MockServer,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let mock_provider = MockServer::start().await;

        let db_dir = tempfile::tempdir().unwrap();
        let resource_dir = tempfile::tempdir().unwrap();
        let db_path: PathBuf = db_dir.path().join("chatcore.db");

        let config = AppConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            db_path,
            resource_dir: resource_dir.path().to_path_buf(),
            env: "dev".to_string(),
            approval_timeout_secs: 5,
            provider_timeout_secs: 10,
            tool_loop_limit: 16,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let (tx, rx) = oneshot::channel();
        let shutdown = async move {
            let _ = rx.await;
        };
        let handle = tokio::spawn(serve::run_serve_on_listener(listener, config, shutdown));

        // Give the listener a moment to start accepting.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        TestServer {
            base_url,
            provider_base_url: mock_provider.uri(),
            client: reqwest::Client::new(),
            _db_dir: db_dir,
            _resource_dir: resource_dir,
            shutdown: Some(tx),
            handle,
            mock_provider,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

/// Registers a provider + enabled model against the running server, returning
/// the fully-qualified model id (`"<providerId>/<modelName>"`).
pub async fn seed_provider_and_model(server: &TestServer, user: &str, model_name: &str) -> String {
    let provider: serde_json::Value = server
        .client
        .post(server.url("/api/providers"))
        .header("x-user-id", user)
        .json(&serde_json::json!({ "baseUrl": server.provider_base_url, "apiKey": "test-key" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let provider_id = provider["id"].as_str().unwrap().to_string();

    let model: serde_json::Value = server
        .client
        .post(server.url("/api/models"))
        .header("x-user-id", user)
        .json(&serde_json::json!({ "providerId": provider_id, "name": model_name, "isEnabled": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    model["id"].as_str().unwrap().to_string()
}

/// A minimal OpenAI-compatible streaming chat completion body: one content delta
/// then `[DONE]`, matching what `async-openai`'s stream parser expects.
pub fn sse_completion_body(content: &str) -> String {
    let delta = serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "created": 0,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "delta": { "role": "assistant", "content": content },
            "finish_reason": null,
        }],
    });
    let done_chunk = serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "created": 0,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "delta": {},
            "finish_reason": "stop",
        }],
    });
    format!("data: {delta}\n\ndata: {done_chunk}\n\ndata: [DONE]\n\n")
}
