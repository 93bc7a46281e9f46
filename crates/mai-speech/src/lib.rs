//! Speech service clients (spec §4.11/§4.12): Whisper transcription and the
//! interchangeable Piper/Silero/Chatterbox TTS endpoints, each wrapped in
//! the same retry + circuit breaker shape `mai_llm::LlmClient` uses for
//! Ollama (spec §7: "one breaker per external service").

pub mod breaker;
pub mod error;
pub mod hallucination;
pub mod retry;
pub mod tts;
pub mod whisper;

use std::time::Duration;

pub use error::{Result, SpeechError};
pub use hallucination::is_known_hallucination;
pub use tts::TtsClient;
pub use whisper::{Transcription, WhisperClient};

use breaker::CircuitBreaker;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_CAP: Duration = Duration::from_secs(8);
const BREAKER_FAILURE_THRESHOLD: u32 = 5;
const BREAKER_OPEN_DURATION: Duration = Duration::from_secs(60);

/// Bundles both speech services with their own breakers so a Whisper outage
/// doesn't trip the TTS breaker or vice versa.
pub struct SpeechClient {
    whisper: WhisperClient,
    tts: TtsClient,
    whisper_breaker: CircuitBreaker,
    tts_breaker: CircuitBreaker,
}

impl SpeechClient {
    pub fn new(whisper_url: String, tts_url: String) -> Self {
        Self {
            whisper: WhisperClient::new(whisper_url),
            tts: TtsClient::new(tts_url),
            whisper_breaker: CircuitBreaker::new(BREAKER_FAILURE_THRESHOLD, BREAKER_OPEN_DURATION),
            tts_breaker: CircuitBreaker::new(BREAKER_FAILURE_THRESHOLD, BREAKER_OPEN_DURATION),
        }
    }

    pub async fn transcribe(&self, wav_bytes: Vec<u8>, language: &str) -> Result<Transcription> {
        self.whisper_breaker.check().map_err(|retry_after_secs| SpeechError::ServiceUnavailable {
            provider: "whisper",
            retry_after_secs,
        })?;

        let result =
            retry::with_retry(RETRY_ATTEMPTS, RETRY_BASE, RETRY_CAP, || self.whisper.transcribe(wav_bytes.clone(), language))
                .await;
        match &result {
            Ok(_) => self.whisper_breaker.record_success(),
            Err(_) => self.whisper_breaker.record_failure(),
        }
        result
    }

    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>> {
        self.tts_breaker.check().map_err(|retry_after_secs| SpeechError::ServiceUnavailable {
            provider: "tts",
            retry_after_secs,
        })?;

        let result = retry::with_retry(RETRY_ATTEMPTS, RETRY_BASE, RETRY_CAP, || self.tts.synthesize(text, voice)).await;
        match &result {
            Ok(_) => self.tts_breaker.record_success(),
            Err(_) => self.tts_breaker.record_failure(),
        }
        result
    }

    pub async fn whisper_health(&self) -> Result<()> {
        self.whisper.health().await
    }

    pub async fn tts_health(&self) -> Result<()> {
        self.tts.health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn transcribe_breaker_opens_after_repeated_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/transcribe")).respond_with(ResponseTemplate::new(500)).mount(&server).await;

        let client = SpeechClient::new(server.uri(), server.uri());
        for _ in 0..BREAKER_FAILURE_THRESHOLD {
            let _ = client.transcribe(vec![0; 10], "auto").await;
        }
        let err = client.transcribe(vec![0; 10], "auto").await.unwrap_err();
        assert!(matches!(err, SpeechError::ServiceUnavailable { provider: "whisper", .. }));
    }

    #[tokio::test]
    async fn tts_failures_do_not_affect_whisper_breaker() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/synthesize")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "hi"})))
            .mount(&server)
            .await;

        let client = SpeechClient::new(server.uri(), server.uri());
        for _ in 0..BREAKER_FAILURE_THRESHOLD {
            let _ = client.synthesize("hi", None).await;
        }
        assert!(client.synthesize("hi", None).await.is_err());
        assert!(client.transcribe(vec![0; 4], "auto").await.is_ok());
    }
}
