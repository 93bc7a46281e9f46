//! Transcription service client (spec §6 "Transcription service"): `POST
//! /transcribe` multipart, WAV in, text out.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::SpeechError;

const PROVIDER: &str = "whisper";

pub struct WhisperClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub language_probability: Option<f32>,
}

impl WhisperClient {
    pub fn new(base_url: String) -> Self {
        Self { http: reqwest::Client::new(), base_url }
    }

    /// Send one WAV clip for transcription. `language` follows the
    /// service's own code (`"auto"` lets it detect).
    pub async fn transcribe(&self, wav_bytes: Vec<u8>, language: &str) -> Result<Transcription, SpeechError> {
        let url = format!("{}/transcribe", self.base_url);
        let part = reqwest::multipart::Part::bytes(wav_bytes).file_name("audio.wav").mime_str("audio/wav").map_err(
            |e| SpeechError::Parse { provider: PROVIDER, message: e.to_string() },
        )?;
        let form = reqwest::multipart::Form::new().part("audio", part).text("language", language.to_string());

        debug!(language, "calling whisper /transcribe");
        let resp = self.http.post(&url).multipart(form).send().await.map_err(http_error)?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let message = resp.text().await.unwrap_or_default();
            warn!(status, message = %message, "whisper returned an error");
            return Err(SpeechError::Api { provider: PROVIDER, status, message });
        }

        let parsed: Transcription =
            resp.json().await.map_err(|e| SpeechError::Parse { provider: PROVIDER, message: e.to_string() })?;
        Ok(parsed)
    }

    pub async fn health(&self) -> Result<(), SpeechError> {
        health_check(&self.http, &self.base_url, PROVIDER).await
    }
}

fn http_error(e: reqwest::Error) -> SpeechError {
    if e.is_timeout() {
        SpeechError::Timeout { provider: PROVIDER, timeout_secs: 30 }
    } else {
        SpeechError::Http { provider: PROVIDER, source: e }
    }
}

pub(crate) async fn health_check(http: &reqwest::Client, base_url: &str, provider: &'static str) -> Result<(), SpeechError> {
    let url = format!("{base_url}/health");
    let resp = http
        .get(&url)
        .send()
        .await
        .map_err(|e| if e.is_timeout() { SpeechError::Timeout { provider, timeout_secs: 5 } } else { SpeechError::Http { provider, source: e } })?;
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(SpeechError::Api { provider, status: resp.status().as_u16(), message: String::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn transcribe_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "hello there",
                "language": "en",
                "language_probability": 0.98
            })))
            .mount(&server)
            .await;

        let client = WhisperClient::new(server.uri());
        let result = client.transcribe(vec![1, 2, 3], "auto").await.unwrap();
        assert_eq!(result.text, "hello there");
        assert_eq!(result.language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn health_ok_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/health")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

        let client = WhisperClient::new(server.uri());
        assert!(client.health().await.is_ok());
    }
}
