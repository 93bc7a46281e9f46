//! LLM client (spec §4.2): `generate`/`embed`/`vision` over Ollama, each
//! wrapped in retry + circuit breaker, with a process-lifetime embedding
//! cache.

pub mod breaker;
pub mod cache;
pub mod error;
pub mod ollama;
pub mod retry;
pub mod types;

use std::time::Duration;

use tracing::debug;

pub use error::{LlmError, Result};
pub use types::{EmbedOptions, GenerateOptions, VisionOptions};

use breaker::CircuitBreaker;
use cache::EmbeddingCache;
use ollama::OllamaClient;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(2);
const RETRY_CAP: Duration = Duration::from_secs(8);
const BREAKER_FAILURE_THRESHOLD: u32 = 5;
const BREAKER_OPEN_DURATION: Duration = Duration::from_secs(60);

pub struct LlmClient {
    ollama: OllamaClient,
    generate_breaker: CircuitBreaker,
    embed_breaker: CircuitBreaker,
    vision_breaker: CircuitBreaker,
    embedding_cache: EmbeddingCache,
}

impl LlmClient {
    pub fn new(base_url: String) -> Self {
        Self {
            ollama: OllamaClient::new(base_url),
            generate_breaker: CircuitBreaker::new(BREAKER_FAILURE_THRESHOLD, BREAKER_OPEN_DURATION),
            embed_breaker: CircuitBreaker::new(BREAKER_FAILURE_THRESHOLD, BREAKER_OPEN_DURATION),
            vision_breaker: CircuitBreaker::new(BREAKER_FAILURE_THRESHOLD, BREAKER_OPEN_DURATION),
            embedding_cache: EmbeddingCache::new(),
        }
    }

    pub async fn generate(&self, prompt: &str, opts: &GenerateOptions) -> Result<String> {
        self.generate_breaker.check().map_err(|retry_after_secs| LlmError::ServiceUnavailable {
            provider: "ollama",
            retry_after_secs,
        })?;

        let result = retry::with_retry(RETRY_ATTEMPTS, RETRY_BASE, RETRY_CAP, || self.ollama.generate(prompt, opts)).await;
        match &result {
            Ok(_) => self.generate_breaker.record_success(),
            Err(_) => self.generate_breaker.record_failure(),
        }
        result
    }

    pub async fn embed(&self, text: &str, opts: &EmbedOptions) -> Result<Vec<f32>> {
        if let Some(cached) = self.embedding_cache.get(&opts.model, text) {
            debug!(model = %opts.model, "embedding cache hit");
            return Ok(cached);
        }

        self.embed_breaker.check().map_err(|retry_after_secs| LlmError::ServiceUnavailable {
            provider: "ollama",
            retry_after_secs,
        })?;

        let result = retry::with_retry(RETRY_ATTEMPTS, RETRY_BASE, RETRY_CAP, || self.ollama.embed(text, opts)).await;
        match &result {
            Ok(embedding) => {
                self.embed_breaker.record_success();
                self.embedding_cache.insert(&opts.model, text, embedding.clone());
            }
            Err(_) => self.embed_breaker.record_failure(),
        }
        result
    }

    pub async fn vision(&self, image_bytes: &[u8], prompt: &str, opts: &VisionOptions) -> Result<String> {
        self.vision_breaker.check().map_err(|retry_after_secs| LlmError::ServiceUnavailable {
            provider: "ollama",
            retry_after_secs,
        })?;

        let result =
            retry::with_retry(RETRY_ATTEMPTS, RETRY_BASE, RETRY_CAP, || self.ollama.vision(image_bytes, prompt, opts)).await;
        match &result {
            Ok(_) => self.vision_breaker.record_success(),
            Err(_) => self.vision_breaker.record_failure(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_returns_response_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "hello there"})))
            .mount(&server)
            .await;

        let client = LlmClient::new(server.uri());
        let opts = GenerateOptions { model: "llama3.1".into(), ..Default::default() };
        let text = client.generate("hi", &opts).await.unwrap();
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn embed_caches_across_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [0.1, 0.2]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::new(server.uri());
        let opts = EmbedOptions { model: "nomic-embed-text".into(), ..Default::default() };
        let a = client.embed("hello world", &opts).await.unwrap();
        let b = client.embed("hello world", &opts).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn breaker_opens_after_repeated_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = LlmClient::new(server.uri());
        let opts = GenerateOptions { model: "llama3.1".into(), ..Default::default() };
        for _ in 0..BREAKER_FAILURE_THRESHOLD {
            let _ = client.generate("hi", &opts).await;
        }
        let err = client.generate("hi", &opts).await.unwrap_err();
        assert!(matches!(err, LlmError::ServiceUnavailable { .. }));
    }
}
