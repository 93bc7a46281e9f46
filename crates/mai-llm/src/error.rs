use thiserror::Error;

/// Error surface for every C2 operation (spec §4.2, §7 error kind 1). Upstream
/// components match on `ServiceUnavailable` to produce a channel-appropriate
/// fallback instead of crashing.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error calling {model}: {source}")]
    Http { model: String, #[source] source: reqwest::Error },

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

impl LlmError {
    /// Whether a retry is worth attempting (spec §4.2 retry contract).
    /// `ServiceUnavailable` (the breaker itself is open) is not retried.
    pub fn is_transient(&self) -> bool {
        !matches!(self, LlmError::ServiceUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
