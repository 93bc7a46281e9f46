use thiserror::Error;

/// Error surface for STT/TTS calls (spec §4.11/§4.12, §7 error kind 1).
/// Mirrors `mai_llm::LlmError`'s shape — each external service gets its own
/// breaker and the same retry contract.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("http error calling {provider}: {source}")]
    Http { provider: &'static str, #[source] source: reqwest::Error },

    #[error("{provider} returned {status}: {message}")]
    Api { provider: &'static str, status: u16, message: String },

    #[error("could not parse {provider} response: {message}")]
    Parse { provider: &'static str, message: String },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },

    #[error("request to {provider} timed out after {timeout_secs}s")]
    Timeout { provider: &'static str, timeout_secs: u64 },

    #[error("{provider} is unavailable: circuit breaker open, retry after {retry_after_secs}s")]
    ServiceUnavailable { provider: &'static str, retry_after_secs: u64 },
}

impl SpeechError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, SpeechError::ServiceUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, SpeechError>;
