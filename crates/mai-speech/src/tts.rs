//! TTS service client (spec §6 "TTS services"): `POST /synthesize {text[,
//! voice]} → audio/wav`. Piper/Silero/Chatterbox are interchangeable,
//! stateless endpoints selected by config (spec §4.1 `tts_engine`).

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SpeechError;
use crate::whisper::health_check;

const PROVIDER: &str = "tts";

pub struct TtsClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
}

impl TtsClient {
    pub fn new(base_url: String) -> Self {
        Self { http: reqwest::Client::new(), base_url }
    }

    /// Synthesize `text` to a WAV clip. `voice` is the engine-specific voice
    /// id (`piper_voice`/`silero_voice`), omitted for engines without one.
    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, SpeechError> {
        let url = format!("{}/synthesize", self.base_url);
        let body = SynthesizeRequest { text, voice };

        debug!(chars = text.len(), "calling tts /synthesize");
        let resp = self.http.post(&url).json(&body).send().await.map_err(http_error)?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let message = resp.text().await.unwrap_or_default();
            warn!(status, message = %message, "tts returned an error");
            return Err(SpeechError::Api { provider: PROVIDER, status, message });
        }

        let bytes = resp.bytes().await.map_err(http_error)?.to_vec();
        if bytes.is_empty() {
            return Err(SpeechError::EmptyResponse { provider: PROVIDER });
        }
        Ok(bytes)
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn synthesize_returns_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF....WAVEfmt ".to_vec()))
            .mount(&server)
            .await;

        let client = TtsClient::new(server.uri());
        let wav = client.synthesize("hello", Some("en_US-amy")).await.unwrap();
        assert!(wav.starts_with(b"RIFF"));
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::<u8>::new()))
            .mount(&server)
            .await;

        let client = TtsClient::new(server.uri());
        let err = client.synthesize("hello", None).await.unwrap_err();
        assert!(matches!(err, SpeechError::EmptyResponse { .. }));
    }
}
