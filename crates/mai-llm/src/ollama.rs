use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{EmbedOptions, GenerateOptions, VisionOptions};

const PROVIDER: &str = "ollama";

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: String) -> Self {
        Self { http: reqwest::Client::new(), base_url }
    }

    pub async fn generate(&self, prompt: &str, opts: &GenerateOptions) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &opts.model,
            prompt,
            stream: false,
            images: None,
            options: RequestOptions {
                temperature: opts.temperature,
                num_predict: opts.max_tokens.map(|n| n as i64),
                stop: &opts.stop_sequences,
            },
        };
        let text = self.post_generate(&body, opts.timeout).await?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text)
    }

    pub async fn vision(&self, image_bytes: &[u8], prompt: &str, opts: &VisionOptions) -> Result<String, LlmError> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let body = GenerateRequest {
            model: &opts.model,
            prompt,
            stream: false,
            images: Some(vec![image_b64]),
            options: RequestOptions { temperature: 0.2, num_predict: None, stop: &[] },
        };
        let text = self.post_generate(&body, opts.timeout).await?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text)
    }

    async fn post_generate(&self, body: &GenerateRequest<'_>, timeout: std::time::Duration) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = body.model, "calling ollama generate");

        let resp = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| http_error(&body.model.to_string(), e))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let message = resp.text().await.unwrap_or_default();
            warn!(status, message = %message, "ollama generate returned an error");
            return Err(LlmError::Api { provider: PROVIDER, status, message });
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse { provider: PROVIDER, message: e.to_string() })?;
        Ok(parsed.response)
    }

    pub async fn embed(&self, text: &str, opts: &EmbedOptions) -> Result<Vec<f32>, LlmError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = EmbedRequest { model: &opts.model, prompt: text };

        let resp = self
            .http
            .post(&url)
            .timeout(opts.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(&opts.model, e))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { provider: PROVIDER, status, message });
        }

        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse { provider: PROVIDER, message: e.to_string() })?;
        if parsed.embedding.is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }
        Ok(parsed.embedding)
    }
}

fn http_error(model: &str, e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout { provider: PROVIDER, timeout_secs: 300 }
    } else {
        LlmError::Http { model: model.to_string(), source: e }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    options: RequestOptions<'a>,
}

#[derive(Serialize)]
struct RequestOptions<'a> {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i64>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    stop: &'a [String],
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}
